//! Business logic services for the chat system.

pub mod committers;

pub use committers::{CommitterPolicyModel, WhitelistCandidate};
