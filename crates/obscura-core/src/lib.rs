//! Core domain types for the Obscura upload service.
//!
//! Everything here is shared by the storage, processing, persistence, and API
//! crates: the uploaded-file record and its status machine, processing
//! options, the error taxonomy, and environment-driven configuration.

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, FieldError};
