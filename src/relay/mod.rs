//! HTTP relay: endpoints, history translation, and fragment streaming

pub mod chat;
mod error;
mod handlers;
pub mod server;
pub mod streaming;

pub use error::{ErrorBody, RelayError};
pub use server::{build_router, run_server, RelayState};
