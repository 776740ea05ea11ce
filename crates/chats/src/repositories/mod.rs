//! Data access layer for the chat system.
//!
//! The directory is the single source of truth for membership. This crate
//! only reads it; mutation happens in whatever backs the directory.

pub mod directory;

pub use directory::{ActiveChatQuery, Department, InMemoryDirectory, MemberDirectory};
