//! Infrastructure layer for Chatline.
//!
//! Contains implementations of the traits defined in `chatline-core`:
//! the SQLite conversation store, the OpenAI-compatible reply generator,
//! and the `config.toml` loader.

pub mod config;
pub mod generation;
pub mod sqlite;
pub mod store;
