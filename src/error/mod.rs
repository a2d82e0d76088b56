//! Error handling
//!
//! Defines the storage error taxonomy and its mapping to response payloads.

pub mod handlers;
pub mod types;

pub use handlers::{ErrorDetail, ErrorPayload, error_payload, error_status, log_failure};
pub use types::*;
