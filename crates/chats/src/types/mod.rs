//! Shared types and interfaces for the chat system.
//!
//! This module contains common types, error definitions, and the change
//! event bus used across the crate.

pub mod errors;
pub mod events;

// Re-export common types
pub use errors::{ChatError, ChatResult};
pub use events::{ChatEvent, EventBus, EventEnvelope, Subscription, SubscriptionId};
