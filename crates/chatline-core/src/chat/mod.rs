//! Conversation persistence abstractions and the chat service.

pub mod memory_store;
pub mod repository;
pub mod service;
