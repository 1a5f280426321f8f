// AI reply provider
// Exchanges outbound text for a reply from a conversational model. Failures
// never leave this module: callers always get a line of text back.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

pub mod error;
pub mod gemini;

pub use error::ApiError;
pub use gemini::{GeminiClient, GeminiSettings};

pub const SYSTEM_PROMPT: &str = "You are Nexus, an advanced AI assistant integrated into a futuristic chat application. \
Keep your responses concise, helpful, and friendly. \
You can simulate human-like conversation but acknowledge you are an AI if asked. \
Limit responses to under 150 words unless asked for a long explanation.";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Reply when no session could be opened (usually a missing API key).
pub const UNAVAILABLE_REPLY: &str = "Error: Unable to connect to Nexus AI network.";
/// Reply when a call on an open session failed. The session is dropped.
pub const INTERRUPTED_REPLY: &str = "Connection interrupted. Retrying uplink...";
/// Reply when the model answered with no text.
pub const EMPTY_REPLY: &str = "No response received.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One entry of a conversation's history.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: &str) -> Self {
        Turn { role: Role::User, text: text.to_string() }
    }

    pub fn model(text: &str) -> Self {
        Turn { role: Role::Model, text: text.to_string() }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub temperature: f32,
    pub turns: &'a [Turn],
}

/// A model endpoint that turns a conversation into the next reply.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: CompletionRequest<'_>) -> Result<String, ApiError>;
}

/// What the conversation layer sees of a reply source.
#[async_trait]
pub trait ReplyProvider: Send + Sync {
    async fn reply(&self, text: &str) -> Result<String, ApiError>;
}

type Connector = Box<dyn Fn() -> Result<Arc<dyn CompletionBackend>, ApiError> + Send + Sync>;

/// Open conversation with the backend. History only grows on successful turns.
struct AiSession {
    backend: Arc<dyn CompletionBackend>,
    history: Vec<Turn>,
}

impl AiSession {
    async fn send(&mut self, text: &str, temperature: f32) -> Result<String, ApiError> {
        let mut turns = self.history.clone();
        turns.push(Turn::user(text));

        let reply = self
            .backend
            .generate(CompletionRequest {
                system: SYSTEM_PROMPT,
                temperature,
                turns: &turns,
            })
            .await?;

        turns.push(Turn::model(&reply));
        self.history = turns;
        Ok(reply)
    }
}

pub struct AiReplyProvider {
    connect: Connector,
    temperature: f32,
    session: TokioMutex<Option<AiSession>>,
}

impl AiReplyProvider {
    /// Provider backed by Gemini. Without an API key every call yields
    /// [`UNAVAILABLE_REPLY`].
    pub fn gemini(settings: GeminiSettings, temperature: f32) -> Self {
        Self::with_connector(
            Box::new(move || {
                let client = GeminiClient::new(&settings)?;
                Ok(Arc::new(client) as Arc<dyn CompletionBackend>)
            }),
            temperature,
        )
    }

    /// Provider that opens its sessions on an existing backend.
    pub fn with_backend(backend: Arc<dyn CompletionBackend>) -> Self {
        Self::with_connector(Box::new(move || Ok(backend.clone())), DEFAULT_TEMPERATURE)
    }

    fn with_connector(connect: Connector, temperature: f32) -> Self {
        Self {
            connect,
            temperature,
            session: TokioMutex::new(None),
        }
    }

    fn open_session(&self) -> Option<AiSession> {
        match (self.connect)() {
            Ok(backend) => {
                info!("Opened AI chat session on {}", backend.name());
                Some(AiSession {
                    backend,
                    history: Vec::new(),
                })
            }
            Err(e) => {
                error!("Failed to initialize AI chat session: {}", e);
                None
            }
        }
    }

    pub async fn exchange_message(&self, text: &str) -> String {
        // Held across the call so turns from overlapping sends stay ordered.
        let mut guard = self.session.lock().await;

        if guard.is_none() {
            *guard = self.open_session();
        }

        let Some(session) = guard.as_mut() else {
            return UNAVAILABLE_REPLY.to_string();
        };

        let outcome = session.send(text, self.temperature).await;
        match outcome {
            Ok(reply) if reply.trim().is_empty() => {
                warn!("AI backend returned an empty reply");
                EMPTY_REPLY.to_string()
            }
            Ok(reply) => {
                debug!("AI reply received ({} chars)", reply.len());
                reply
            }
            Err(e) => {
                error!("AI API error: {}", e);
                // Drop the session so the next call starts a fresh one.
                *guard = None;
                INTERRUPTED_REPLY.to_string()
            }
        }
    }
}

#[async_trait]
impl ReplyProvider for AiReplyProvider {
    async fn reply(&self, text: &str) -> Result<String, ApiError> {
        Ok(self.exchange_message(text).await)
    }
}
