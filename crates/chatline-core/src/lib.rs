//! Chat orchestration and trait definitions for Chatline.
//!
//! This crate defines the "ports" (the conversation store and reply generator
//! traits) that the infrastructure layer implements, plus the `ChatService`
//! that drives a chat exchange. It depends only on `chatline-types` -- never
//! on `chatline-infra` or any database/HTTP crate.

pub mod chat;
pub mod generation;
