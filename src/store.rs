// Seed data the client starts from. Nothing here is persisted.

use chrono::{Duration, Utc};
use std::collections::HashMap;

use crate::models::{ChatSession, Contact, ContactStatus, ContentType, DeliveryStatus, Message, LOCAL_USER_ID};

pub const AI_CONTACT_ID: &str = "ai-nexus";

pub fn seed_contacts() -> Vec<Contact> {
    vec![
        Contact {
            id: AI_CONTACT_ID.to_string(),
            name: "Nexus AI".to_string(),
            avatar: "https://picsum.photos/id/1/200/200".to_string(),
            status: ContactStatus::Online,
            last_seen: None,
            is_ai: true,
            bio: Some("Advanced Data Assistant v2.5".to_string()),
            phone_number: Some("+1 (555) 000-AI01".to_string()),
        },
        Contact {
            id: "u-alice".to_string(),
            name: "Alice Chen".to_string(),
            avatar: "https://picsum.photos/id/64/200/200".to_string(),
            status: ContactStatus::Online,
            last_seen: None,
            is_ai: false,
            bio: Some("Frontend Engineer @ TechCorp".to_string()),
            phone_number: Some("+1 (555) 123-4567".to_string()),
        },
        Contact {
            id: "u-bob".to_string(),
            name: "Bob Smith".to_string(),
            avatar: "https://picsum.photos/id/91/200/200".to_string(),
            status: ContactStatus::Offline,
            last_seen: Some("Today at 10:30 AM".to_string()),
            is_ai: false,
            bio: Some("Hiking enthusiast 🏔️".to_string()),
            phone_number: Some("+1 (555) 987-6543".to_string()),
        },
        Contact {
            id: "u-charlie".to_string(),
            name: "Charlie Davis".to_string(),
            avatar: "https://picsum.photos/id/177/200/200".to_string(),
            status: ContactStatus::Online,
            last_seen: None,
            is_ai: false,
            bio: Some("Available for freelance".to_string()),
            phone_number: Some("+1 (555) 246-8135".to_string()),
        },
    ]
}

/// Historical message, already read, `age` before startup.
fn seeded(id: &str, sender_id: &str, text: &str, age: Duration) -> Message {
    Message {
        id: id.to_string(),
        sender_id: sender_id.to_string(),
        text: text.to_string(),
        timestamp: Utc::now() - age,
        status: DeliveryStatus::Read,
        kind: ContentType::Text,
    }
}

pub fn seed_sessions() -> HashMap<String, ChatSession> {
    let mut sessions = HashMap::new();

    sessions.insert(
        AI_CONTACT_ID.to_string(),
        ChatSession {
            contact_id: AI_CONTACT_ID.to_string(),
            messages: vec![seeded(
                "m-1",
                AI_CONTACT_ID,
                "Hello! I am Nexus. How can I assist you with your data today?",
                Duration::minutes(60),
            )],
            unread_count: 0,
            draft: None,
        },
    );

    sessions.insert(
        "u-alice".to_string(),
        ChatSession {
            contact_id: "u-alice".to_string(),
            messages: vec![seeded(
                "m-2",
                "u-alice",
                "Hey! Did you see the new design specs?",
                Duration::minutes(30),
            )],
            unread_count: 1,
            draft: None,
        },
    );

    sessions.insert(
        "u-bob".to_string(),
        ChatSession {
            contact_id: "u-bob".to_string(),
            messages: vec![
                seeded("m-3", LOCAL_USER_ID, "Are we still on for lunch?", Duration::hours(24)),
                seeded("m-4", "u-bob", "Yes! 12:30 at the usual place.", Duration::hours(23)),
            ],
            unread_count: 0,
            draft: None,
        },
    );

    // Charlie has no session until first selected.
    sessions
}
