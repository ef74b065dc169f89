//! Shared domain types for Chatline.
//!
//! This crate contains the core domain types used across the Chat API:
//! conversations, messages, generation history, configuration, and the
//! error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
