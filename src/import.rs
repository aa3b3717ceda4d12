//! Bulk activity import from CSV exports of fitness trackers.
//!
//! Expected header: `date,activity_type,duration,calories_burned,distance,notes`.
//! The last three columns may be empty.

use std::io::Read;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::models::NewActivity;
use crate::services::activities;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("row on line {line} was rejected: {source}")]
    Rejected {
        line: u64,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    activity_type: String,
    duration: i64,
    calories_burned: Option<f64>,
    distance: Option<f64>,
    notes: Option<String>,
}

/// Parses every row up front, then writes the valid ones in file order.
/// Rows with an empty type or date, or a negative duration, are skipped.
pub async fn import_activities<R: Read>(
    gateway: &Gateway,
    client_id: Uuid,
    source: R,
) -> Result<ImportSummary, ImportError> {
    let rows = parse_rows(source)?;
    let mut summary = ImportSummary::default();

    for (line, row) in rows {
        let Some(activity) = to_activity(client_id, row) else {
            warn!(line, "skipping invalid activity row");
            summary.skipped += 1;
            continue;
        };
        activities::create(gateway, &activity)
            .await
            .map_err(|source| ImportError::Rejected { line, source })?;
        summary.inserted += 1;
    }

    info!(
        %client_id,
        inserted = summary.inserted,
        skipped = summary.skipped,
        "activity import finished"
    );
    Ok(summary)
}

/// Rows paired with the file line they start on. Quoted fields may span
/// several lines.
fn parse_rows<R: Read>(source: R) -> Result<Vec<(u64, CsvRow)>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(csv::Position::line).unwrap_or_default();
        rows.push((line, record.deserialize(Some(&headers))?));
    }
    Ok(rows)
}

fn to_activity(client_id: Uuid, row: CsvRow) -> Option<NewActivity> {
    if row.date.is_empty() || row.activity_type.is_empty() || row.duration < 0 {
        return None;
    }
    Some(NewActivity {
        client_id,
        date: row.date,
        activity_type: row.activity_type.to_lowercase(),
        duration: row.duration,
        calories_burned: row.calories_burned,
        distance: row.distance,
        notes: row.notes.filter(|notes| !notes.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, OperationKind};
    use crate::error::BackendError;
    use crate::testing::memory_gateway;

    const EXPORT: &str = "\
date,activity_type,duration,calories_burned,distance,notes
2026-05-01,Run,30,310,5.1,easy pace
2026-05-01,walk,15,,,
,swim,20,,,
2026-05-02,cycling,-5,,,
2026-05-03, Yoga ,40,90,,
";

    #[tokio::test]
    async fn imports_valid_rows_and_skips_the_rest() {
        let (gateway, _backend, _notifier) = memory_gateway(MemoryBackend::new());
        let client_id = Uuid::new_v4();

        let summary = import_activities(&gateway, client_id, EXPORT.as_bytes())
            .await
            .unwrap();
        assert_eq!(summary, ImportSummary { inserted: 3, skipped: 2 });

        let stored = activities::for_client(&gateway, client_id).await.unwrap();
        let types: Vec<&str> = stored.iter().map(|a| a.activity_type.as_str()).collect();
        assert_eq!(types.len(), 3);
        assert!(types.contains(&"run"));
        assert!(types.contains(&"yoga"));

        let walk = stored.iter().find(|a| a.activity_type == "walk").unwrap();
        assert_eq!(walk.calories_burned, None);
        assert_eq!(walk.notes, None);
    }

    #[tokio::test]
    async fn malformed_file_writes_nothing() {
        let (gateway, backend, _notifier) = memory_gateway(MemoryBackend::new());
        let broken = "date,activity_type,duration\n2026-05-01,run,thirty\n";

        let err = import_activities(&gateway, Uuid::new_v4(), broken.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Csv(_)));
        assert!(backend.rows("client_activities").is_empty());
    }

    #[tokio::test]
    async fn rejected_row_reports_its_line() {
        let (gateway, backend, _notifier) = memory_gateway(MemoryBackend::new());
        backend.fail_next(
            "client_activities",
            OperationKind::Insert,
            BackendError::new("23503", "client does not exist"),
        );

        let err = import_activities(&gateway, Uuid::new_v4(), EXPORT.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Rejected { line: 2, .. }));
    }

    #[tokio::test]
    async fn rejected_row_after_multiline_notes_reports_its_own_line() {
        let (gateway, backend, _notifier) = memory_gateway(MemoryBackend::new());
        let export = "\
date,activity_type,duration,calories_burned,distance,notes
2026-05-01,run,-1,310,5.1,\"felt heavy
calf tight
stopped early\"
2026-05-02,walk,20,,,
";
        let rows = parse_rows(export.as_bytes()).unwrap();
        let lines: Vec<u64> = rows.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![2, 5]);
        assert_eq!(rows[0].1.notes.as_deref(), Some("felt heavy\ncalf tight\nstopped early"));

        backend.fail_next(
            "client_activities",
            OperationKind::Insert,
            BackendError::new("23514", "check constraint violated"),
        );
        let err = import_activities(&gateway, Uuid::new_v4(), export.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Rejected { line: 5, .. }));
    }
}
