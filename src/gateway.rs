//! Single choke point between services and the backend.
//!
//! Every call goes through one of the entry points below, which normalize the
//! backend's error into an [`ApiError`] exactly once and fire exactly one
//! notification per failure (none for the quiet and optional variants).
//! Services never re-map or re-notify.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{Backend, BackendResult, Query};
use crate::error::{ApiError, ApiResult, BackendError};
use crate::notify::Notifier;

#[derive(Clone)]
pub struct Gateway {
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Notify,
    Quiet,
}

impl Gateway {
    pub fn new(backend: Arc<dyn Backend>, notifier: Arc<dyn Notifier>) -> Self {
        Self { backend, notifier }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Runs `operation`; null data and backend errors both fail.
    pub async fn request<T, F>(&self, operation: F) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: Future<Output = BackendResult>,
    {
        match operation.await {
            Ok(Some(data)) => self.decode(data, Delivery::Notify),
            Ok(None) => Err(self.reject_with(&BackendError::null_result(), Delivery::Notify)),
            Err(err) => Err(self.reject_with(&err, Delivery::Notify)),
        }
    }

    pub async fn query<T: DeserializeOwned>(&self, query: Query) -> ApiResult<T> {
        self.request(self.backend.execute(query)).await
    }

    /// For writes without a representation; null data is success.
    pub async fn execute<F>(&self, operation: F) -> ApiResult<()>
    where
        F: Future<Output = BackendResult>,
    {
        operation
            .await
            .map(|_| ())
            .map_err(|err| self.reject_with(&err, Delivery::Notify))
    }

    /// Not-found and null data resolve to `None` without a notification.
    pub async fn request_optional<T, F>(&self, operation: F) -> ApiResult<Option<T>>
    where
        T: DeserializeOwned,
        F: Future<Output = BackendResult>,
    {
        match operation.await {
            Ok(Some(data)) => self.decode(data, Delivery::Notify).map(Some),
            Ok(None) => Ok(None),
            Err(err) if ApiError::from_backend(&err).is_not_found() => {
                debug!(details = ?err.details, "treating not-found as empty result");
                Ok(None)
            }
            Err(err) => Err(self.reject_with(&err, Delivery::Notify)),
        }
    }

    /// Like [`Gateway::query`] but failures are only logged.
    pub async fn fetch_quiet<T: DeserializeOwned>(&self, query: Query) -> ApiResult<T> {
        match self.backend.execute(query).await {
            Ok(Some(data)) => self.decode(data, Delivery::Quiet),
            Ok(None) => Err(self.reject_with(&BackendError::null_result(), Delivery::Quiet)),
            Err(err) => Err(self.reject_with(&err, Delivery::Quiet)),
        }
    }

    /// Normalizes a failure raised outside a backend call and notifies once.
    pub fn reject(&self, err: &BackendError) -> ApiError {
        self.reject_with(err, Delivery::Notify)
    }

    fn decode<T: DeserializeOwned>(&self, data: Value, delivery: Delivery) -> ApiResult<T> {
        serde_json::from_value(data).map_err(|err| {
            let normalized = ApiError::decode(err);
            self.deliver(&normalized, delivery);
            normalized
        })
    }

    fn reject_with(&self, err: &BackendError, delivery: Delivery) -> ApiError {
        let normalized = ApiError::from_backend(err);
        self.deliver(&normalized, delivery);
        normalized
    }

    fn deliver(&self, err: &ApiError, delivery: Delivery) {
        warn!(
            kind = ?err.kind,
            code = %err.code,
            details = err.details.as_deref().unwrap_or(""),
            "backend request failed"
        );
        if delivery == Delivery::Notify {
            self.notifier.notify(&err.message);
        }
    }
}
