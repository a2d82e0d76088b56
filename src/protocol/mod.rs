//! Wire protocol
//!
//! Request decoding, dispatch to the store, and response encoding shared by
//! every transport.

pub mod handlers;
pub mod requests;
pub mod responses;

pub use handlers::{dispatch, execute, execute_blocking};
pub use requests::Operation;
pub use responses::{Reply, health_body};
