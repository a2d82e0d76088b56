//! Sandboxed file storage service.
//!
//! Write, read, list, delete and move files below a fixed root, served
//! identically over HTTP and over NATS request/reply.

pub mod bus;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod storage;

pub use crate::config::ServiceConfig;
pub use crate::error::StorageError;
pub use crate::server::Server;
pub use crate::storage::FileStore;
