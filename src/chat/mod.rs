// Conversation state for the chat client
// Owns contacts, sessions and the active pointer. Everything that changes them
// goes through `Conversations`, including the effects of simulated timers, which
// arrive as `ChatEvent`s on the channel returned by `Conversations::new`.

use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub mod delivery;
pub mod reply;

pub use reply::{canned_reply_text, CannedReply, ProviderReply, ReplyStrategy};

use crate::ai::ReplyProvider;
use crate::models::{ChatSession, Contact, ContactStatus, DeliveryStatus, Message};
use crate::store;

/// Capacity of the deferred event channel.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// State change produced by a deferred task, addressed by the ids captured
/// when the task was scheduled.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    StatusAdvanced {
        contact_id: String,
        message_id: String,
        status: DeliveryStatus,
    },
    PresenceChanged {
        contact_id: String,
        status: ContactStatus,
    },
    ReplyReceived {
        contact_id: String,
        text: String,
    },
}

pub type EventSender = mpsc::Sender<ChatEvent>;
pub type EventReceiver = mpsc::Receiver<ChatEvent>;

pub(crate) async fn post(events: &EventSender, event: ChatEvent) {
    if let Err(e) = events.send(event).await {
        error!("Failed to post chat event, receiver is gone: {}", e);
    }
}

/// Base delay of every simulated timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub tick: Duration,
}

impl Timing {
    pub fn new(tick: Duration) -> Self {
        Timing { tick }
    }

    pub fn ticks(&self, n: u32) -> Duration {
        self.tick * n
    }
}

impl Default for Timing {
    fn default() -> Self {
        Timing::new(Duration::from_secs(1))
    }
}

pub struct Conversations {
    contacts: Vec<Contact>,
    sessions: HashMap<String, ChatSession>,
    active: Option<String>,
    strategies: HashMap<String, Arc<dyn ReplyStrategy>>,
    timing: Timing,
    events: EventSender,
}

impl Conversations {
    pub fn new(
        contacts: Vec<Contact>,
        sessions: HashMap<String, ChatSession>,
        provider: Arc<dyn ReplyProvider>,
        timing: Timing,
    ) -> (Self, EventReceiver) {
        let (events, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let strategies = contacts
            .iter()
            .map(|c| (c.id.clone(), reply::strategy_for(c, &provider, timing)))
            .collect();

        (
            Self {
                contacts,
                sessions,
                active: None,
                strategies,
                timing,
                events,
            },
            event_rx,
        )
    }

    /// Conversations over the built-in seed data.
    pub fn from_seed(provider: Arc<dyn ReplyProvider>, timing: Timing) -> (Self, EventReceiver) {
        Self::new(store::seed_contacts(), store::seed_sessions(), provider, timing)
    }

    pub fn select_contact(&mut self, id: &str) {
        self.active = Some(id.to_string());
        let session = self
            .sessions
            .entry(id.to_string())
            .or_insert_with(|| ChatSession::empty(id));
        session.unread_count = 0;
        debug!("Active conversation is now {}", id);
    }

    /// Leave the current conversation ("back" navigation).
    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn append_message(&mut self, contact_id: &str, message: Message) {
        let is_viewing = self.active.as_deref() == Some(contact_id);
        let session = self
            .sessions
            .entry(contact_id.to_string())
            .or_insert_with(|| ChatSession::empty(contact_id));
        session.messages.push(message);
        session.unread_count = if is_viewing { 0 } else { session.unread_count + 1 };

        // Most recently active first.
        if let Some(pos) = self.contacts.iter().position(|c| c.id == contact_id) {
            let contact = self.contacts.remove(pos);
            self.contacts.insert(0, contact);
        }
    }

    /// Send `text` to the active contact. Returns the appended message right
    /// away; receipts and the reply follow as [`ChatEvent`]s. Must be called
    /// inside a tokio runtime.
    pub fn send_outbound(&mut self, text: &str) -> Option<Message> {
        let contact_id = self.active.clone()?;
        let message = Message::outbound(text);
        self.append_message(&contact_id, message.clone());
        info!("Sent message {} to {}", message.id, contact_id);

        delivery::schedule_receipts(
            self.events.clone(),
            self.timing,
            contact_id.clone(),
            message.id.clone(),
        );

        if let Some(strategy) = self.strategies.get(&contact_id).cloned() {
            if strategy.types_immediately() {
                self.set_presence(&contact_id, ContactStatus::Typing);
            }
            let events = self.events.clone();
            let text = text.to_string();
            tokio::spawn(async move {
                strategy.respond(contact_id, text, events).await;
            });
        } else {
            debug!("No reply strategy for {}, no reply will come", contact_id);
        }

        Some(message)
    }

    pub fn apply(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::StatusAdvanced {
                contact_id,
                message_id,
                status,
            } => {
                self.advance_status(&contact_id, &message_id, status);
            }
            ChatEvent::PresenceChanged { contact_id, status } => {
                self.set_presence(&contact_id, status);
            }
            ChatEvent::ReplyReceived { contact_id, text } => {
                let message = Message::inbound(&contact_id, &text);
                self.append_message(&contact_id, message);
            }
        }
    }

    /// Move a message forward in the delivery chain. Returns false when the
    /// message is gone or `status` would not be a step forward.
    pub fn advance_status(&mut self, contact_id: &str, message_id: &str, status: DeliveryStatus) -> bool {
        let Some(message) = self
            .sessions
            .get_mut(contact_id)
            .and_then(|s| s.message_mut(message_id))
        else {
            debug!("Status update for unknown message {} in {}", message_id, contact_id);
            return false;
        };

        if status <= message.status {
            return false;
        }
        debug!("Message {} status {:?} -> {:?}", message_id, message.status, status);
        message.status = status;
        true
    }

    pub fn set_presence(&mut self, contact_id: &str, status: ContactStatus) {
        if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == contact_id) {
            contact.status = status;
        }
    }

    /// Keep unsent composer text for a conversation. Blank text clears it.
    pub fn set_draft(&mut self, contact_id: &str, text: &str) {
        let session = self
            .sessions
            .entry(contact_id.to_string())
            .or_insert_with(|| ChatSession::empty(contact_id));
        session.draft = if text.trim().is_empty() { None } else { Some(text.to_string()) };
    }

    pub fn draft(&self, contact_id: &str) -> Option<&str> {
        self.sessions.get(contact_id).and_then(|s| s.draft.as_deref())
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn contact(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.get(id)
    }

    pub fn active_contact_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_contact(&self) -> Option<&Contact> {
        self.active.as_deref().and_then(|id| self.contact(id))
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        self.active.as_deref().and_then(|id| self.session(id))
    }

    pub fn last_message(&self, contact_id: &str) -> Option<&Message> {
        self.session(contact_id).and_then(ChatSession::last_message)
    }

    pub fn unread_count(&self, contact_id: &str) -> u32 {
        self.session(contact_id).map_or(0, |s| s.unread_count)
    }

    /// Contacts whose display name contains `term`, ignoring case, in list order.
    pub fn filter_contacts(&self, term: &str) -> Vec<&Contact> {
        let term = term.trim().to_lowercase();
        self.contacts
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&term))
            .collect()
    }
}
