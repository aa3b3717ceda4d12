//! The hosted backend as consumed by this crate: a row store with
//! PostgREST-style queries, a GoTrue-style auth API and public object storage.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::BackendError;

#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod query;
pub mod rest;

#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryBackend;
pub use query::{Direction, Filter, Operation, OperationKind, Query};
pub use rest::RestBackend;

/// `{data, error}` pair of a single round trip. `Ok(None)` is a null payload.
pub type BackendResult = Result<Option<Value>, BackendError>;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Run a table query. Single-row queries yield an object, others an array.
    async fn execute(&self, query: Query) -> BackendResult;

    /// User bound to the ambient session, `Ok(None)` when nobody is signed in.
    async fn current_user(&self) -> BackendResult;

    /// Password sign-in; stores the session and yields the user object.
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult;

    async fn sign_out(&self) -> BackendResult;

    /// Registers a user with `metadata` stored as its user metadata.
    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> BackendResult;

    /// Merges `metadata` into the signed-in user's metadata.
    async fn update_user(&self, metadata: Value) -> BackendResult;

    async fn reset_password(&self, email: &str) -> BackendResult;

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Value, BackendError> {
    serde_json::to_value(value).map_err(BackendError::encode)
}

/// Reads the `id` column off a row returned by the backend.
pub fn row_id(row: &Value) -> Result<String, BackendError> {
    row.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BackendError::new(crate::error::DECODE_CODE, "row has no id column"))
}
