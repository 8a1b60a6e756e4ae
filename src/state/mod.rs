//! State management module for the domain deployment system.
//!
//! This module persists the identifiers of the deployed domain between
//! invocations, together with the lock that serializes concurrent runs.

mod store;
mod local;
mod s3;
mod lock;
mod types;

pub use store::StateStore;
pub use local::{LocalStateStore, STATE_DIR};
pub use s3::S3StateStore;
pub use lock::{generate_holder_id, LockInfo, LockOperation, LOCK_EXPIRY_SECS};
pub use types::{ComponentState, NameInput, STATE_VERSION};
