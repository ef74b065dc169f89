//! HTTP/REST API layer for Chatline.
//!
//! Axum-based JSON API under `/api/` with permissive CORS for the browser UI.

pub mod error;
pub mod handlers;
pub mod router;
