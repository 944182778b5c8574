//! Settings wiring into live clients.

use crate::mock_server::MockServerFixture;
use medassist::{ResponseGenerator, Settings};
use mockito::Matcher;
use std::collections::HashMap;

fn lookup(vars: HashMap<&'static str, String>) -> impl Fn(&str) -> Option<String> {
    move |key| vars.get(key).cloned()
}

#[tokio::test]
async fn generator_from_settings_uses_configured_server_and_ledger() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("logs").join("cost_log.json");
    let _mock = fixture.mock_completion("world").await;

    let settings = Settings::from_lookup(lookup(HashMap::from([
        ("MEDASSIST_BASE_URL", fixture.base_url.clone()),
        ("MEDASSIST_LEDGER_PATH", ledger_path.display().to_string()),
        ("MEDASSIST_INPUT_COST_PER_1K", "1.0".to_string()),
        ("MEDASSIST_OUTPUT_COST_PER_1K", "2.0".to_string()),
    ])))
    .unwrap();
    let generator = ResponseGenerator::from_settings(&settings).unwrap();

    let result = generator.chat("hello").await.unwrap();
    assert_eq!(result.content, "world");
    assert!(result.cost_data.request_cost > 0.0);
    assert_eq!(result.cost_data.output_cost, 0.002);
    assert!(ledger_path.exists());
    assert_eq!(settings.ledger().load().await.total_requests, 1);
}

#[tokio::test]
async fn empty_api_key_sends_no_authorization_header() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let body = serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": "world"}}]
    });
    let mock = fixture
        .server
        .lock()
        .await
        .mock("POST", "/chat/completions")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let settings = Settings::from_lookup(lookup(HashMap::from([
        ("MEDASSIST_BASE_URL", fixture.base_url.clone()),
        ("MEDASSIST_API_KEY", String::new()),
        (
            "MEDASSIST_LEDGER_PATH",
            dir.path().join("cost_log.json").display().to_string(),
        ),
    ])))
    .unwrap();
    assert!(settings.api_key.is_none());
    let generator = ResponseGenerator::from_settings(&settings).unwrap();

    let result = generator.chat("hello").await.unwrap();
    mock.assert_async().await;
    assert_eq!(result.content, "world");
}

#[test]
fn rate_file_with_negative_rate_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rates.yaml");
    std::fs::write(
        &path,
        "models:\n  qwen2.5: { cost_per_1k_input_tokens: -1.0, cost_per_1k_output_tokens: 0.0 }\n",
    )
    .unwrap();
    let err = Settings::from_lookup(lookup(HashMap::from([(
        "MEDASSIST_RATE_FILE",
        path.display().to_string(),
    )])))
    .unwrap_err();
    assert!(matches!(err, medassist::Error::Configuration { .. }));
}

#[test]
fn commercial_section_requires_default_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rates.yaml");
    std::fs::write(
        &path,
        concat!(
            "commercial:\n",
            "  default_model: gpt-5\n",
            "  models:\n",
            "    gpt-4o: { cost_per_1k_tokens: 0.005 }\n",
        ),
    )
    .unwrap();
    assert!(Settings::from_lookup(lookup(HashMap::from([(
        "MEDASSIST_RATE_FILE",
        path.display().to_string(),
    )])))
    .is_err());
}
