//! Asynchronous adapter
//!
//! Serves the storage operations over NATS request/reply.

pub mod subscriber;

pub use subscriber::BusAdapter;
