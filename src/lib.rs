// Re-export needed modules for testing
pub mod ai; // AI reply provider (Gemini)
pub mod chat; // Conversation state and simulated delivery
pub mod config;
pub mod models;
pub mod store; // Seed contacts and history

// Re-export main types for convenience
pub use chat::{ChatEvent, Conversations, Timing};
pub use models::*;
