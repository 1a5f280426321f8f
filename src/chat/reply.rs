// How each contact answers an outbound message.

use async_trait::async_trait;
use log::{debug, error, info};
use std::sync::Arc;

use super::{post, ChatEvent, EventSender, Timing};
use crate::ai::ReplyProvider;
use crate::models::{Contact, ContactStatus};

/// Characters of the outbound text quoted back by the canned reply.
const CANNED_QUOTE_CHARS: usize = 10;

/// Reply behaviour of one contact. `respond` runs as a spawned task and talks
/// back to the conversation only through `events`, addressed to `contact_id`.
#[async_trait]
pub trait ReplyStrategy: Send + Sync {
    async fn respond(&self, contact_id: String, text: String, events: EventSender);

    /// Whether the contact shows as typing as soon as the message is sent.
    fn types_immediately(&self) -> bool {
        false
    }
}

/// Pick the strategy for a contact: provider-backed for AI contacts, canned otherwise.
pub fn strategy_for(
    contact: &Contact,
    provider: &Arc<dyn ReplyProvider>,
    timing: Timing,
) -> Arc<dyn ReplyStrategy> {
    if contact.is_ai {
        Arc::new(ProviderReply::new(provider.clone()))
    } else {
        Arc::new(CannedReply::new(timing))
    }
}

pub fn canned_reply_text(text: &str) -> String {
    let quoted: String = text.chars().take(CANNED_QUOTE_CHARS).collect();
    format!("That sounds interesting! Tell me more about \"{}...\"", quoted)
}

async fn set_presence(events: &EventSender, contact_id: &str, status: ContactStatus) {
    post(
        events,
        ChatEvent::PresenceChanged {
            contact_id: contact_id.to_string(),
            status,
        },
    )
    .await;
}

/// Forwards the text to a [`ReplyProvider`] and posts whatever it answers.
pub struct ProviderReply {
    provider: Arc<dyn ReplyProvider>,
}

impl ProviderReply {
    pub fn new(provider: Arc<dyn ReplyProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ReplyStrategy for ProviderReply {
    async fn respond(&self, contact_id: String, text: String, events: EventSender) {
        // The controller also sets Typing at send time.
        set_presence(&events, &contact_id, ContactStatus::Typing).await;

        let outcome = self.provider.reply(&text).await;

        // Typing ends whether or not the provider answered.
        set_presence(&events, &contact_id, ContactStatus::Online).await;

        match outcome {
            Ok(reply) => {
                info!("Provider replied for {}", contact_id);
                post(&events, ChatEvent::ReplyReceived { contact_id, text: reply }).await;
            }
            Err(e) => error!("Reply provider failed for {}: {}", contact_id, e),
        }
    }

    fn types_immediately(&self) -> bool {
        true
    }
}

/// Simulated human: starts typing after one tick, answers three ticks later.
pub struct CannedReply {
    timing: Timing,
}

impl CannedReply {
    pub fn new(timing: Timing) -> Self {
        Self { timing }
    }
}

#[async_trait]
impl ReplyStrategy for CannedReply {
    async fn respond(&self, contact_id: String, text: String, events: EventSender) {
        tokio::time::sleep(self.timing.ticks(1)).await;
        set_presence(&events, &contact_id, ContactStatus::Typing).await;

        tokio::time::sleep(self.timing.ticks(3)).await;
        set_presence(&events, &contact_id, ContactStatus::Online).await;

        debug!("Posting canned reply for {}", contact_id);
        post(
            &events,
            ChatEvent::ReplyReceived {
                contact_id,
                text: canned_reply_text(&text),
            },
        )
        .await;
    }
}
