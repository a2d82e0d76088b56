//! Server core functionality
//!
//! Process wiring: the shared store, the HTTP adapter, the bus adapter and
//! their common shutdown.

pub mod core;
pub mod http;

pub use self::core::Server;
