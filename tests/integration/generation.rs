//! End-to-end generation against a mock inference server.

use crate::mock_server::MockServerFixture;
use medassist::inference::OpenAiCompatBackend;
use medassist::tokens::{ModelRate, RateTable};
use medassist::{Error, ResponseGenerator};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn free_local_model_round_trip() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let mock = fixture
        .mock_completion_matching(
            serde_json::json!({
                "model": "qwen2.5",
                "stream": false,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hello"}
                ]
            }),
            "world",
        )
        .await;
    let generator =
        fixture.generator(&dir.path().join("cost_log.json"), RateTable::local_defaults());

    let result = generator.generate("sys", "hello", None).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.content, "world");
    assert_eq!(result.token_usage.input_tokens, 2);
    assert_eq!(result.token_usage.output_tokens, 1);
    assert_eq!(result.token_usage.total_tokens, 3);
    assert_eq!(result.cost_data.request_cost, 0.0);

    let state = generator.ledger().load().await;
    assert_eq!(state.total_requests, 1);
    assert_eq!(state.total_tokens, 3);
    assert_eq!(state.total_cost, 0.0);
}

#[tokio::test]
async fn sequential_generations_sum_in_ledger() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let _mock = fixture.mock_completion("world").await;
    let rates = RateTable::new().with_rate("qwen2.5", ModelRate::new(0.5, 1.0));
    let generator = fixture.generator(&dir.path().join("cost_log.json"), rates);

    let mut expected_cost = 0.0;
    let mut expected_tokens = 0u64;
    let mut last_cumulative = 0.0;
    for _ in 0..5 {
        let result = generator.generate("sys", "hello", None).await.unwrap();
        expected_cost += result.cost_data.request_cost;
        expected_tokens += result.token_usage.total_tokens as u64;
        assert!(result.cumulative_cost >= last_cumulative);
        last_cumulative = result.cumulative_cost;
    }

    let state = generator.ledger().load().await;
    assert_eq!(state.total_requests, 5);
    assert_eq!(state.total_tokens, expected_tokens);
    assert!((state.total_cost - expected_cost).abs() < 1e-9);
}

#[tokio::test]
async fn concurrent_generations_lose_no_updates() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let _mock = fixture.mock_completion("world").await;
    let rates = RateTable::new().with_rate("qwen2.5", ModelRate::new(1.0, 1.0));
    let generator = fixture.generator(&dir.path().join("cost_log.json"), rates);

    let results = futures::future::join_all(
        (0..20).map(|_| generator.generate("sys", "hello", None)),
    )
    .await;
    assert!(results.iter().all(|r| r.is_ok()));

    let state = generator.ledger().load().await;
    assert_eq!(state.total_requests, 20);
    assert_eq!(state.total_tokens, 60);
    assert!((state.total_cost - 0.06).abs() < 1e-9);
}

#[tokio::test]
async fn server_error_is_inference_error_and_skips_ledger() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let _mock = fixture
        .mock_json_response(
            "/chat/completions",
            500,
            r#"{"error":{"message":"model not loaded"}}"#,
        )
        .await;
    let ledger_path = dir.path().join("cost_log.json");
    let generator = fixture.generator(&ledger_path, RateTable::local_defaults());

    let err = generator.generate("sys", "hello", None).await.unwrap_err();
    assert!(err.is_inference(), "unexpected error: {err}");
    assert!(err.to_string().contains("500"));
    assert!(!ledger_path.exists());
}

#[tokio::test]
async fn missing_content_is_inference_error() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let _mock = fixture
        .mock_json_response("/chat/completions", 200, r#"{"choices":[]}"#)
        .await;
    let generator =
        fixture.generator(&dir.path().join("cost_log.json"), RateTable::local_defaults());

    let err = generator.generate("sys", "hello", None).await.unwrap_err();
    assert!(matches!(err, Error::Inference { .. }));
}

#[tokio::test]
async fn malformed_body_is_inference_error() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let _mock = fixture
        .mock_json_response("/chat/completions", 200, "<html>gateway</html>")
        .await;
    let generator =
        fixture.generator(&dir.path().join("cost_log.json"), RateTable::local_defaults());

    assert!(generator
        .generate("sys", "hello", None)
        .await
        .unwrap_err()
        .is_inference());
}

#[tokio::test]
async fn unresponsive_backend_times_out_as_inference_error() {
    // Accepts connections into the backlog but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let backend = OpenAiCompatBackend::builder()
        .base_url(format!("http://{}", addr))
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let generator = ResponseGenerator::builder(Arc::new(backend)).build();

    let err = generator.generate("sys", "hello", None).await.unwrap_err();
    assert!(err.is_inference());
    assert_eq!(generator.ledger().load().await.total_requests, 0);
    drop(listener);
}

#[tokio::test]
async fn unknown_commercial_model_reports_default() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let _mock = fixture.mock_completion("world").await;
    let generator = ResponseGenerator::builder(Arc::new(fixture.backend()))
        .commercial_models(vec!["gpt-9".into()])
        .ledger(Arc::new(medassist::CostLedger::new(Arc::new(
            medassist::ledger::FileLedgerStore::new(dir.path().join("cost_log.json")),
        ))))
        .build();

    let result = generator.generate("sys", "hello", None).await.unwrap();
    let cost = &result.commercial_costs["gpt-9"];
    assert_eq!(cost.model, "gpt-4o");
    assert_eq!(cost.rate, 0.005);
}

#[tokio::test]
async fn assistant_prompt_reaches_backend() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let mock = fixture
        .mock_completion_matching(
            serde_json::json!({"messages": [
                {
                    "role": "system",
                    "content": medassist::Assistant::MeetingMinutes.system_prompt()
                },
                {"role": "user", "content": "Alice: ship on Friday."}
            ]}),
            "## Meeting Overview",
        )
        .await;
    let generator =
        fixture.generator(&dir.path().join("cost_log.json"), RateTable::local_defaults());

    let result = generator
        .meeting_minutes("Alice: ship on Friday.")
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(result.content, "## Meeting Overview");
}

#[tokio::test]
async fn markdown_answer_is_rendered_to_html() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let answer = "## Action Items\n\n| Task | Owner |\n|------|-------|\n| Send notes | Bob |\n";
    let _mock = fixture.mock_completion(answer).await;
    let generator =
        fixture.generator(&dir.path().join("cost_log.json"), RateTable::local_defaults());

    let result = generator.meeting_minutes("Bob: I'll send notes.").await.unwrap();

    assert_eq!(result.content, answer);
    assert!(result.content_html.contains("<h2>Action Items</h2>"));
    assert!(result.content_html.contains("<table>"));
    assert!(result.content_html.contains("<td>Send notes</td>"));
    let json = serde_json::to_value(&result).unwrap();
    assert!(json["content_html"].as_str().unwrap().contains("<table>"));
}
