/// Fire-and-forget, user-facing failure notice (the UI's toast).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Sends notices to the log; used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::error!(target: "fitcoach::notify", "{message}");
    }
}

#[cfg(any(test, feature = "testing"))]
pub use recording::RecordingNotifier;

#[cfg(any(test, feature = "testing"))]
mod recording {
    use std::sync::{Mutex, PoisonError};

    use super::Notifier;

    /// Keeps every notice so tests can count them.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        pub fn messages(&self) -> Vec<String> {
            self.messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str) {
            self.messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message.to_string());
        }
    }
}
