//! Pure reductions from one client's records to summary metrics.
//!
//! Reducers never fail: an empty slice yields the zero-valued summary. The
//! fetch-and-reduce wrappers in `services` report through [`StatsOutcome`]
//! whether the summary was computed or is a fallback.

pub mod activity;
pub mod measurement;
pub mod nutrition;
pub mod workout;

use serde::Serialize;
use tracing::warn;

use crate::error::{ApiError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    Empty,
    Failed(ErrorKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatsOutcome<T> {
    Computed(T),
    Fallback { summary: T, reason: FallbackReason },
}

impl<T> StatsOutcome<T> {
    pub fn summary(&self) -> &T {
        match self {
            Self::Computed(summary) | Self::Fallback { summary, .. } => summary,
        }
    }

    pub fn into_summary(self) -> T {
        match self {
            Self::Computed(summary) | Self::Fallback { summary, .. } => summary,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            Self::Computed(_) => None,
            Self::Fallback { reason, .. } => Some(*reason),
        }
    }
}

/// Turns a fetch result into an outcome; errors degrade to `empty()`.
pub(crate) fn settle<R, T>(
    label: &str,
    fetched: Result<Vec<R>, ApiError>,
    empty: impl FnOnce() -> T,
    reduce: impl FnOnce(&[R]) -> T,
) -> StatsOutcome<T> {
    match fetched {
        Ok(records) if records.is_empty() => StatsOutcome::Fallback {
            summary: empty(),
            reason: FallbackReason::Empty,
        },
        Ok(records) => StatsOutcome::Computed(reduce(&records)),
        Err(err) => {
            warn!(stats = label, kind = ?err.kind, code = %err.code, "stats fell back to defaults");
            StatsOutcome::Fallback {
                summary: empty(),
                reason: FallbackReason::Failed(err.kind),
            }
        }
    }
}
