use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Sender id used for messages written by the local user.
pub const LOCAL_USER_ID: &str = "me";

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub status: ContactStatus,
    pub last_seen: Option<String>,
    pub is_ai: bool,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
}

impl Contact {
    pub fn new(id: &str, name: &str) -> Self {
        Contact {
            id: id.to_string(),
            name: name.to_string(),
            avatar: String::new(),
            status: ContactStatus::Online,
            last_seen: None,
            is_ai: false,
            bio: None,
            phone_number: None,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.status == ContactStatus::Typing
    }

    /// Label shown under the contact name in the conversation header.
    pub fn presence_label(&self) -> String {
        match self.status {
            ContactStatus::Typing => "typing...".to_string(),
            ContactStatus::Online => "online".to_string(),
            ContactStatus::Offline => format!(
                "last seen {}",
                self.last_seen.as_deref().unwrap_or("recently")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactStatus {
    Online,
    Offline,
    Typing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub kind: ContentType,
}

impl Message {
    /// A message typed by the local user, not yet delivered.
    pub fn outbound(text: &str) -> Self {
        Message {
            id: Uuid::new_v4().to_string(),
            sender_id: LOCAL_USER_ID.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            status: DeliveryStatus::Sent,
            kind: ContentType::Text,
        }
    }

    /// A reply from a contact. Replies land already read.
    pub fn inbound(contact_id: &str, text: &str) -> Self {
        Message {
            id: Uuid::new_v4().to_string(),
            sender_id: contact_id.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            status: DeliveryStatus::Read,
            kind: ContentType::Text,
        }
    }

    pub fn is_from_me(&self) -> bool {
        self.sender_id == LOCAL_USER_ID
    }
}

/// Ordering follows the delivery chain, so `a < b` means `b` is further along.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum DeliveryStatus {
    Sent = 0,      // Accepted locally
    Delivered = 1, // Reached the peer
    Read = 2,      // Seen by the peer
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Text,
    Image,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatSession {
    pub contact_id: String,
    pub messages: Vec<Message>,
    pub unread_count: u32,
    pub draft: Option<String>,
}

impl ChatSession {
    pub fn empty(contact_id: &str) -> Self {
        ChatSession {
            contact_id: contact_id.to_string(),
            ..Default::default()
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }
}

/// Which pane the front end is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    ChatList,
    ChatWindow,
    Profile,
}
