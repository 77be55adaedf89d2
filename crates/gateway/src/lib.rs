//! Webhook Ingress: the HTTP surface in front of the command interpreter.

pub mod error;
pub mod server;
pub mod state;
pub mod webhook;

pub use {
    error::IngressError,
    server::{LIVENESS_TEXT, build_app, serve},
    state::AppState,
    webhook::BatchSummary,
};
