//! Mock HTTP server setup for integration tests

use medassist::inference::OpenAiCompatBackend;
use medassist::ledger::{CostLedger, FileLedgerStore};
use medassist::stt::SttClient;
use medassist::tokens::RateTable;
use medassist::ResponseGenerator;
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const API_KEY: &str = "dpais";

/// Test fixture that manages a mock inference server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    pub fn backend(&self) -> OpenAiCompatBackend {
        OpenAiCompatBackend::builder()
            .base_url(&self.base_url)
            .api_key(API_KEY)
            .build()
            .expect("backend")
    }

    pub fn stt_client(&self) -> SttClient {
        SttClient::builder()
            .base_url(&self.base_url)
            .api_key(API_KEY)
            .build()
            .expect("stt client")
    }

    /// Generator against the mock server, with its ledger in `ledger_path`.
    pub fn generator(&self, ledger_path: &Path, rates: RateTable) -> ResponseGenerator {
        let store = FileLedgerStore::new(ledger_path);
        ResponseGenerator::builder(Arc::new(self.backend()))
            .rates(rates)
            .ledger(Arc::new(CostLedger::new(Arc::new(store))))
            .build()
    }

    /// Chat completion answering with `content`
    pub async fn mock_completion(&self, content: &str) -> Mock {
        let body = serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        });
        self.mock_json_response("/chat/completions", 200, &body.to_string())
            .await
    }

    /// Create a mock for a JSON response, requiring the bearer key
    pub async fn mock_json_response(&self, path: &str, status: u16, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", path)
            .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
            .with_status(status as usize)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Chat completion whose request body must contain `fragment`
    pub async fn mock_completion_matching(
        &self,
        fragment: serde_json::Value,
        content: &str,
    ) -> Mock {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        });
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(fragment))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }
}
