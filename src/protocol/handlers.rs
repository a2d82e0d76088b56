//! Request dispatch
//!
//! Decode → call → encode, shared verbatim by the HTTP and bus adapters so
//! their behavior cannot drift apart.

use log::debug;
use serde_json::Value;
use std::io;
use std::sync::Arc;

use crate::error::{StorageError, StorageResult, log_failure};
use crate::protocol::requests::{
    DeleteRequest, ListRequest, MoveRequest, Operation, ReadRequest, WriteRequest, decode,
    require_path,
};
use crate::protocol::responses::{Reply, to_body};
use crate::storage::FileStore;

/// Run one operation against the store from a raw JSON body.
pub fn dispatch(store: &FileStore, op: Operation, body: &[u8]) -> StorageResult<Value> {
    match op {
        Operation::Write => {
            let req: WriteRequest = decode(body)?;
            let path = require_path("path", &req.path)?;
            to_body(&store.write(path, req.content.as_bytes(), req.file_type, req.overwrite)?)
        }
        Operation::Read => {
            let req: ReadRequest = decode(body)?;
            to_body(&store.read(require_path("path", &req.path)?)?)
        }
        Operation::List => {
            let req: ListRequest = decode(body)?;
            to_body(&store.list(&req.path)?)
        }
        Operation::Delete => {
            let req: DeleteRequest = decode(body)?;
            to_body(&store.delete(require_path("path", &req.path)?, req.force)?)
        }
        Operation::Move => {
            let req: MoveRequest = decode(body)?;
            let source = require_path("source", &req.source)?;
            let dest = require_path("dest", &req.dest)?;
            to_body(&store.move_entry(source, dest, req.overwrite)?)
        }
    }
}

/// Encode a dispatch result, logging failures under the transport's name.
pub fn execute(store: &FileStore, op: Operation, body: &[u8], transport: &str) -> Reply {
    match dispatch(store, op, body) {
        Ok(value) => {
            debug!("{transport} {} ok", op.name());
            Reply::ok(value)
        }
        Err(err) => {
            log_failure(transport, op.name(), &err);
            Reply::from_error(&err)
        }
    }
}

/// [`execute`] on the blocking pool. Filesystem calls never run on the
/// async workers.
pub async fn execute_blocking(
    store: Arc<FileStore>,
    op: Operation,
    body: bytes::Bytes,
    transport: &'static str,
) -> Reply {
    let joined = tokio::task::spawn_blocking(move || execute(&store, op, &body, transport)).await;
    joined.unwrap_or_else(|join_err| {
        let err = StorageError::Io {
            context: op.name(),
            path: String::new(),
            source: io::Error::other(join_err.to_string()),
        };
        log_failure(transport, op.name(), &err);
        Reply::from_error(&err)
    })
}
