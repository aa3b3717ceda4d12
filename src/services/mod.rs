//! Stateless CRUD wrappers over the backend, one module per table family.
//!
//! Every function takes the [`Gateway`](crate::gateway::Gateway) explicitly and
//! leaves failure notification to it.

pub mod activities;
pub mod auth;
pub mod clients;
pub mod measurements;
pub mod nutrition;
pub mod workouts;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::backend::{to_row, Backend, BackendResult, Query};

/// Inserts `row` into `table` and returns the stored row.
pub(crate) async fn insert_row<T: Serialize>(
    backend: &dyn Backend,
    table: &str,
    row: &T,
) -> BackendResult {
    let row = to_row(row)?;
    backend
        .execute(Query::table(table).insert(row).select("*").single())
        .await
}

/// Applies `patch` to the row with `id` and returns the updated row.
pub(crate) async fn update_row<T: Serialize>(
    backend: &dyn Backend,
    table: &str,
    id: Uuid,
    patch: &T,
) -> BackendResult {
    let patch = to_row(patch)?;
    backend
        .execute(
            Query::table(table)
                .update(patch)
                .eq("id", id)
                .select("*")
                .single(),
        )
        .await
}

pub(crate) fn delete_row(table: &str, id: Uuid) -> Query {
    Query::table(table).delete().eq("id", id)
}

/// Sets `column` on a serialized row, e.g. the parent key of a child row.
pub(crate) fn with_column(mut row: Value, column: &str, value: impl Into<Value>) -> Value {
    if let Value::Object(fields) = &mut row {
        fields.insert(column.to_string(), value.into());
    }
    row
}
