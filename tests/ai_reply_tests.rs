// AI contact: provider-backed replies, session handling and the Gemini client over HTTP

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    ai_and_human, fake_gemini, settle, setup_logging, FailingProvider, FixedProvider, ScriptedBackend, SlowProvider,
};
use nexuschat::ai::{
    AiReplyProvider, ApiError, CompletionBackend, CompletionRequest, GeminiClient, GeminiSettings, ReplyProvider,
    Turn, EMPTY_REPLY, INTERRUPTED_REPLY, UNAVAILABLE_REPLY,
};
use nexuschat::models::{ContactStatus, DeliveryStatus};

fn server_error() -> ApiError {
    ApiError::ServerError {
        provider: "scripted".to_string(),
        status_code: 503,
        details: "overloaded".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_provider_leaves_contact_online_without_reply() {
    setup_logging();
    let (mut convo, mut rx) = ai_and_human(Arc::new(FailingProvider));
    convo.select_contact("ai");
    convo.send_outbound("Are you there?").unwrap();

    settle(&mut convo, &mut rx, Duration::from_secs(3)).await;

    let session = convo.session("ai").unwrap();
    assert_eq!(session.messages.len(), 1);
    assert_eq!(session.messages[0].status, DeliveryStatus::Read);
    assert_eq!(convo.contact("ai").unwrap().status, ContactStatus::Online);
}

#[tokio::test(start_paused = true)]
async fn test_ai_contact_types_while_provider_works() {
    setup_logging();
    let provider = SlowProvider::answering(Duration::from_secs(5), "late");
    let (mut convo, mut rx) = ai_and_human(Arc::new(provider));
    convo.select_contact("ai");
    convo.send_outbound("q").unwrap();
    assert!(convo.contact("ai").unwrap().is_typing());
    convo.select_contact("human");

    settle(&mut convo, &mut rx, Duration::from_secs(1)).await;
    assert!(convo.contact("ai").unwrap().is_typing());
    assert_eq!(convo.session("ai").unwrap().messages.len(), 1);

    settle(&mut convo, &mut rx, Duration::from_secs(5)).await;
    assert_eq!(convo.contact("ai").unwrap().status, ContactStatus::Online);
    let session = convo.session("ai").unwrap();
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.unread_count, 1);
    assert_eq!(convo.last_message("ai").unwrap().text, "late");
    assert!(convo.session("human").unwrap().messages.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ai_contact_stops_typing_when_slow_provider_fails() {
    setup_logging();
    let (mut convo, mut rx) = ai_and_human(Arc::new(SlowProvider::failing(Duration::from_secs(5))));
    convo.select_contact("ai");
    convo.send_outbound("q").unwrap();

    settle(&mut convo, &mut rx, Duration::from_secs(1)).await;
    assert!(convo.contact("ai").unwrap().is_typing());

    settle(&mut convo, &mut rx, Duration::from_secs(5)).await;
    assert_eq!(convo.contact("ai").unwrap().status, ContactStatus::Online);
    assert_eq!(convo.session("ai").unwrap().messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_provider_reply_is_appended_as_read_from_contact() {
    setup_logging();
    let (mut convo, mut rx) = ai_and_human(Arc::new(FixedProvider("OK")));
    convo.select_contact("ai");
    convo.send_outbound("Summarize my day").unwrap();

    settle(&mut convo, &mut rx, Duration::from_secs(3)).await;

    let reply = convo.last_message("ai").unwrap();
    assert_eq!(reply.sender_id, "ai");
    assert_eq!(reply.text, "OK");
    assert_eq!(reply.status, DeliveryStatus::Read);
    assert_eq!(convo.contact("ai").unwrap().status, ContactStatus::Online);
    assert_eq!(convo.unread_count("ai"), 0);

    // The human contact still uses the canned reply, not the provider
    convo.select_contact("human");
    convo.send_outbound("hi").unwrap();
    settle(&mut convo, &mut rx, Duration::from_secs(5)).await;
    assert_ne!(convo.last_message("human").unwrap().text, "OK");
}

#[tokio::test]
async fn test_session_opens_lazily_and_keeps_history() {
    setup_logging();
    let backend = Arc::new(ScriptedBackend::new(vec![Ok("first".to_string()), Ok("second".to_string())]));
    let provider = AiReplyProvider::with_backend(backend.clone());

    assert_eq!(backend.calls(), 0);

    assert_eq!(provider.exchange_message("one").await, "first");
    assert_eq!(provider.exchange_message("two").await, "second");
    assert_eq!(provider.exchange_message("three").await, "scripted default");
    // Each request carries the earlier user and model turns
    assert_eq!(backend.turn_counts(), vec![1, 3, 5]);
}

#[tokio::test]
async fn test_failure_resets_session() {
    setup_logging();
    let backend = Arc::new(ScriptedBackend::new(vec![
        Ok("first".to_string()),
        Err(server_error()),
        Ok("fresh".to_string()),
    ]));
    let provider = AiReplyProvider::with_backend(backend.clone());

    assert_eq!(provider.exchange_message("one").await, "first");
    assert_eq!(provider.exchange_message("two").await, INTERRUPTED_REPLY);

    assert_eq!(provider.exchange_message("three").await, "fresh");
    assert_eq!(provider.exchange_message("four").await, "scripted default");
    // The third call starts over with only its own turn, the failed one is not kept
    assert_eq!(backend.turn_counts(), vec![1, 3, 1, 3]);
}

#[tokio::test]
async fn test_blank_reply_becomes_placeholder() {
    setup_logging();
    let backend = Arc::new(ScriptedBackend::new(vec![Ok("   ".to_string())]));
    let provider = AiReplyProvider::with_backend(backend);
    assert_eq!(provider.exchange_message("hello").await, EMPTY_REPLY);
}

#[tokio::test]
async fn test_missing_api_key_reports_unavailable() {
    setup_logging();
    let provider = AiReplyProvider::gemini(GeminiSettings::default(), 0.7);

    assert_eq!(provider.exchange_message("hello").await, UNAVAILABLE_REPLY);
    // Still unavailable on retry, and never an error through the trait
    assert_eq!(provider.reply("again").await.unwrap(), UNAVAILABLE_REPLY);
}

fn settings_for(base: &str) -> GeminiSettings {
    GeminiSettings {
        api_key: Some("test-key".to_string()),
        api_base: base.to_string(),
        timeout: Duration::from_secs(5),
        ..GeminiSettings::default()
    }
}

#[tokio::test]
async fn test_gemini_client_round_trip() {
    setup_logging();
    let (base, requests) = fake_gemini(
        200,
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"from Nexus"}]}}]}"#,
    )
    .await;
    let client = GeminiClient::new(&settings_for(&base)).unwrap();

    let turns = vec![Turn::user("hi")];
    let reply = client
        .generate(CompletionRequest {
            system: "be brief",
            temperature: 0.7,
            turns: &turns,
        })
        .await
        .unwrap();
    assert_eq!(reply, "Hello from Nexus");

    let seen = requests.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("POST /models/gemini-2.5-flash:generateContent?key=test-key"));
    assert!(seen[0].contains("\"systemInstruction\""));
    assert!(seen[0].contains("\"generationConfig\""));
}

#[tokio::test]
async fn test_gemini_client_maps_http_errors() {
    setup_logging();
    let (base, _) = fake_gemini(429, r#"{"error":{"message":"quota"}}"#).await;
    let client = GeminiClient::new(&settings_for(&base)).unwrap();
    let turns = vec![Turn::user("hi")];
    let err = client
        .generate(CompletionRequest {
            system: "",
            temperature: 0.7,
            turns: &turns,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::RateLimited { .. }), "got {:?}", err);

    let (base, _) = fake_gemini(200, "not json").await;
    let client = GeminiClient::new(&settings_for(&base)).unwrap();
    let err = client
        .generate(CompletionRequest {
            system: "",
            temperature: 0.7,
            turns: &turns,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ResponseParsingError { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_provider_over_failing_endpoint_falls_back() {
    setup_logging();
    let (base, requests) = fake_gemini(500, "boom").await;
    let provider = AiReplyProvider::gemini(settings_for(&base), 0.7);

    assert_eq!(provider.exchange_message("hello").await, INTERRUPTED_REPLY);
    assert_eq!(provider.exchange_message("hello again").await, INTERRUPTED_REPLY);
    assert_eq!(requests.lock().unwrap().len(), 2);
}
