// Common test utilities for integration tests
// Stub reply sources, small conversation fixtures and a fake Gemini endpoint.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, LevelFilter};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use nexuschat::ai::{ApiError, CompletionBackend, CompletionRequest, ReplyProvider};
use nexuschat::chat::EventReceiver;
use nexuschat::models::Contact;
use nexuschat::{Conversations, Timing};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Reply source that always fails.
pub struct FailingProvider;

#[async_trait]
impl ReplyProvider for FailingProvider {
    async fn reply(&self, _text: &str) -> Result<String, ApiError> {
        Err(ApiError::Unknown {
            provider: "stub".to_string(),
            details: "network down".to_string(),
        })
    }
}

/// Reply source that answers every message with the same text.
pub struct FixedProvider(pub &'static str);

#[async_trait]
impl ReplyProvider for FixedProvider {
    async fn reply(&self, _text: &str) -> Result<String, ApiError> {
        Ok(self.0.to_string())
    }
}

/// Reply source that takes `delay` before answering, or failing when `reply` is `None`.
pub struct SlowProvider {
    delay: Duration,
    reply: Option<&'static str>,
}

impl SlowProvider {
    pub fn answering(delay: Duration, reply: &'static str) -> Self {
        SlowProvider {
            delay,
            reply: Some(reply),
        }
    }

    pub fn failing(delay: Duration) -> Self {
        SlowProvider { delay, reply: None }
    }
}

#[async_trait]
impl ReplyProvider for SlowProvider {
    async fn reply(&self, _text: &str) -> Result<String, ApiError> {
        tokio::time::sleep(self.delay).await;
        self.reply.map(str::to_string).ok_or_else(|| ApiError::Timeout {
            provider: "stub".to_string(),
        })
    }
}

/// Backend that plays back queued results and records what it was sent.
#[derive(Default)]
pub struct ScriptedBackend {
    results: Mutex<Vec<Result<String, ApiError>>>,
    pub seen_turns: Mutex<Vec<usize>>,
    pub calls: AtomicUsize,
}

impl ScriptedBackend {
    /// Results are handed out in the order given.
    pub fn new(mut results: Vec<Result<String, ApiError>>) -> Self {
        results.reverse();
        ScriptedBackend {
            results: Mutex::new(results),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of turns in each request, in call order.
    pub fn turn_counts(&self) -> Vec<usize> {
        self.seen_turns.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, request: CompletionRequest<'_>) -> Result<String, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_turns.lock().unwrap().push(request.turns.len());
        self.results
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok("scripted default".to_string()))
    }
}

/// Conversations over plain human contacts with no history.
pub fn conversations_with(
    ids: &[&str],
    provider: Arc<dyn ReplyProvider>,
    timing: Timing,
) -> (Conversations, EventReceiver) {
    let contacts = ids.iter().map(|id| Contact::new(id, &format!("Contact {}", id))).collect();
    Conversations::new(contacts, HashMap::new(), provider, timing)
}

/// An AI contact plus a human one.
pub fn ai_and_human(provider: Arc<dyn ReplyProvider>) -> (Conversations, EventReceiver) {
    let mut ai = Contact::new("ai", "Assistant");
    ai.is_ai = true;
    let human = Contact::new("human", "Human");
    Conversations::new(vec![ai, human], HashMap::new(), provider, Timing::default())
}

/// Let `duration` of (paused) time pass, then apply every pending event.
pub async fn settle(convo: &mut Conversations, event_rx: &mut EventReceiver, duration: Duration) {
    tokio::time::sleep(duration).await;
    // Let tasks woken at the very end of the window post their events
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    while let Ok(event) = event_rx.try_recv() {
        debug!("settle: applying {:?}", event);
        convo.apply(event);
    }
}

/// Minimal HTTP server that answers every request with `status` and `body`.
/// Returns the base URL and a log of received request heads and bodies.
pub async fn fake_gemini(status: u16, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = requests.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let log = log.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                // Read the head, then as much body as Content-Length says
                loop {
                    let n = match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);
                    let text = String::from_utf8_lossy(&buf).to_string();
                    if let Some(head_end) = text.find("\r\n\r\n") {
                        let length = text[..head_end]
                            .lines()
                            .find_map(|l| {
                                let (name, value) = l.split_once(':')?;
                                name.eq_ignore_ascii_case("content-length")
                                    .then(|| value.trim().parse::<usize>().ok())
                                    .flatten()
                            })
                            .unwrap_or(0);
                        if buf.len() >= head_end + 4 + length {
                            log.lock().unwrap().push(text);
                            break;
                        }
                    }
                }

                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), requests)
}
