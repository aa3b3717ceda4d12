//! Fixtures shared by the service tests.

use std::sync::Arc;

use crate::backend::MemoryBackend;
use crate::gateway::Gateway;
use crate::notify::RecordingNotifier;

/// Gateway over `backend`; the returned handles share its state.
pub fn memory_gateway(backend: MemoryBackend) -> (Gateway, MemoryBackend, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let gateway = Gateway::new(Arc::new(backend.clone()), notifier.clone());
    (gateway, backend, notifier)
}
