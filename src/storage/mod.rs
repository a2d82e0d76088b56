//! File system storage
//!
//! Path confinement, per-path locking and the file operations built on them.

pub mod filesystem;
pub mod locks;
pub mod operations;
pub mod results;
pub mod sandbox;

pub use operations::FileStore;
pub use results::{DeleteResult, FileContent, FileRecord, FileType, ListResult};
pub use sandbox::{PathSandbox, SandboxPath};
