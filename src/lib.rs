//! gemini-relay: streaming HTTP front-end for Gemini text generation
//!
//! Two endpoints, JSON in and plain text out:
//! - `POST /api/summary` streams a short summary of an article excerpt
//! - `POST /api/chat` streams the next reply for a resent conversation
//!
//! The server is stateless across requests; each call initiates one fresh
//! upstream generation stream and copies its fragments to the client as
//! they arrive.

pub mod config;
pub mod prompt;
pub mod relay;
pub mod upstream;

pub use config::AppConfig;
pub use relay::{build_router, run_server, RelayState};
