//! Speech-to-text client and audio minutes against a mock server.

use crate::mock_server::{MockServerFixture, API_KEY};
use medassist::stt::SttOptions;
use medassist::tokens::{ModelRate, RateTable};
use medassist::Error;
use mockito::Matcher;

#[tokio::test]
async fn transcribe_reads_verbose_json() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(
            "/audio/transcriptions",
            200,
            r#"{"text":" Patient reports mild headaches. ","language":"english","duration":42.5}"#,
        )
        .await;
    let stt = fixture.stt_client();

    let t = stt
        .transcribe(b"RIFF....WAVE", &SttOptions::default().file_name("visit.wav"))
        .await
        .unwrap();

    assert_eq!(t.text, "Patient reports mild headaches.");
    assert_eq!(t.language.as_deref(), Some("english"));
    assert_eq!(t.duration_secs, Some(42.5));
}

#[tokio::test]
async fn transcribe_sends_model_as_multipart_field() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/audio/transcriptions")
            .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"model\"".into()),
                Matcher::Regex("whisper".into()),
                Matcher::Regex("verbose_json".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"text":"hello"}"#)
            .create_async()
            .await
    };

    let t = fixture
        .stt_client()
        .transcribe(b"audio", &SttOptions::default())
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(t.text, "hello");
    assert_eq!(t.audio_minutes(), None);
}

#[tokio::test]
async fn empty_audio_is_validation_error() {
    let fixture = MockServerFixture::new().await;
    let err = fixture
        .stt_client()
        .transcribe(b"", &SttOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

#[tokio::test]
async fn empty_transcript_is_transcription_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response("/audio/transcriptions", 200, r#"{"text":"   "}"#)
        .await;
    let err = fixture
        .stt_client()
        .transcribe(b"audio", &SttOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transcription { .. }));
}

#[tokio::test]
async fn server_error_is_transcription_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response("/audio/transcriptions", 503, r#"{"error":"busy"}"#)
        .await;
    let err = fixture
        .stt_client()
        .transcribe(b"audio", &SttOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transcription { .. }));
}

#[tokio::test]
async fn minutes_from_audio_charges_recording_length() {
    let fixture = MockServerFixture::new().await;
    let dir = tempfile::tempdir().unwrap();
    let _stt = fixture
        .mock_json_response(
            "/audio/transcriptions",
            200,
            r#"{"text":"Bob: budget approved.","duration":120.0}"#,
        )
        .await;
    let _chat = fixture.mock_completion("## Action Items").await;
    let rates = RateTable::new()
        .with_rate("qwen2.5", ModelRate::new(0.0, 0.0).with_cost_per_minute(0.006));
    let generator = fixture.generator(&dir.path().join("cost_log.json"), rates);

    let minutes = generator
        .meeting_minutes_from_audio(&fixture.stt_client(), b"audio", &SttOptions::default())
        .await
        .unwrap();

    assert_eq!(minutes.transcription.text, "Bob: budget approved.");
    assert_eq!(minutes.result.content, "## Action Items");
    assert_eq!(minutes.result.cost_data.audio_cost, 0.012);
    assert!((minutes.result.cumulative_cost - 0.012).abs() < 1e-12);
}
