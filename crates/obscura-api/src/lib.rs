//! HTTP layer: routing, handlers, identity, and server setup.

pub mod auth;
pub mod error;
pub mod fingerprint;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
