use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::backend::{row_id, to_row, Backend, BackendResult, Direction, Query};
use crate::error::{ApiError, ApiResult, BackendError};
use crate::gateway::Gateway;
use crate::models::{
    BodyMeasurementValues, Measurement, MeasurementPatch, MeasurementPhoto, MeasurementStats,
    NewMeasurement, PhotoType, PhotoUpload,
};
use crate::services::{clients, delete_row, insert_row, with_column};
use crate::stats::{self, settle, StatsOutcome};

const MEASUREMENTS: &str = "measurements";
const BODY_MEASUREMENTS: &str = "body_measurements";
const PHOTOS: &str = "measurement_photos";

const MEASUREMENT_COLUMNS: &str = "*, body_measurements (*)";
const PHOTO_FOLDER: &str = "measurement_photos";

/// Newest first, with body rows.
pub async fn for_client(gateway: &Gateway, client_id: Uuid) -> ApiResult<Vec<Measurement>> {
    gateway
        .query(
            Query::table(MEASUREMENTS)
                .select(MEASUREMENT_COLUMNS)
                .eq("client_id", client_id)
                .order("date", Direction::Descending),
        )
        .await
}

pub async fn for_current_client(gateway: &Gateway) -> ApiResult<Vec<Measurement>> {
    match clients::current(gateway).await {
        Some(client) => for_client(gateway, client.id).await,
        None => Ok(Vec::new()),
    }
}

pub async fn by_id(gateway: &Gateway, measurement_id: Uuid) -> ApiResult<Measurement> {
    gateway
        .query(joined(&measurement_id.to_string()))
        .await
}

/// Writes the measurement, then its body row when given, and returns the
/// joined record.
///
/// The writes are not transactional: if the body row fails the measurement
/// row stays stored and the error is returned.
pub async fn create(
    gateway: &Gateway,
    measurement: &NewMeasurement,
    body: Option<&BodyMeasurementValues>,
) -> ApiResult<Measurement> {
    gateway
        .request(insert_measurement(gateway.backend(), measurement, body))
        .await
}

async fn insert_measurement(
    backend: &dyn Backend,
    measurement: &NewMeasurement,
    body: Option<&BodyMeasurementValues>,
) -> BackendResult {
    let stored = insert_row(backend, MEASUREMENTS, measurement)
        .await?
        .ok_or_else(BackendError::null_result)?;
    let measurement_id = row_id(&stored)?;

    if let Some(body) = body {
        let row = with_column(to_row(body)?, "measurement_id", measurement_id.as_str());
        backend
            .execute(Query::table(BODY_MEASUREMENTS).insert(row))
            .await?;
    }

    backend.execute(joined(&measurement_id)).await
}

/// Patches the measurement and, when given, its latest body row (inserting
/// one if there is none yet). Returns the joined record.
pub async fn update(
    gateway: &Gateway,
    measurement_id: Uuid,
    patch: &MeasurementPatch,
    body: Option<&BodyMeasurementValues>,
) -> ApiResult<Measurement> {
    gateway
        .request(apply_update(gateway.backend(), measurement_id, patch, body))
        .await
}

async fn apply_update(
    backend: &dyn Backend,
    measurement_id: Uuid,
    patch: &MeasurementPatch,
    body: Option<&BodyMeasurementValues>,
) -> BackendResult {
    backend
        .execute(
            Query::table(MEASUREMENTS)
                .update(to_row(patch)?)
                .eq("id", measurement_id),
        )
        .await?;

    if let Some(body) = body {
        let values = to_row(body)?;
        match latest_body_id(backend, measurement_id).await? {
            Some(body_id) => {
                debug!(%measurement_id, %body_id, "updating body measurements");
                backend
                    .execute(Query::table(BODY_MEASUREMENTS).update(values).eq("id", body_id))
                    .await?;
            }
            None => {
                debug!(%measurement_id, "adding body measurements");
                let row = with_column(values, "measurement_id", measurement_id.to_string());
                backend
                    .execute(Query::table(BODY_MEASUREMENTS).insert(row))
                    .await?;
            }
        }
    }

    backend.execute(joined(&measurement_id.to_string())).await
}

async fn latest_body_id(
    backend: &dyn Backend,
    measurement_id: Uuid,
) -> Result<Option<String>, BackendError> {
    let lookup = Query::table(BODY_MEASUREMENTS)
        .select("id")
        .eq("measurement_id", measurement_id)
        .order("created_at", Direction::Descending)
        .limit(1)
        .single();
    match backend.execute(lookup).await {
        Ok(Some(row)) => row_id(&row).map(Some),
        Ok(None) => Ok(None),
        Err(err) if ApiError::from_backend(&err).is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

pub async fn delete(gateway: &Gateway, measurement_id: Uuid) -> ApiResult<()> {
    gateway
        .execute(gateway.backend().execute(delete_row(MEASUREMENTS, measurement_id)))
        .await
}

/// Newest first.
pub async fn photos_for_client(
    gateway: &Gateway,
    client_id: Uuid,
) -> ApiResult<Vec<MeasurementPhoto>> {
    gateway
        .query(
            Query::table(PHOTOS)
                .select("*")
                .eq("client_id", client_id)
                .order("date", Direction::Descending),
        )
        .await
}

/// Stores the file in `bucket`, then records its public URL as a progress photo.
pub async fn upload_photo(
    gateway: &Gateway,
    bucket: &str,
    upload: &PhotoUpload,
) -> ApiResult<MeasurementPhoto> {
    let path = photo_path(upload.client_id, &upload.file_name, Utc::now());
    gateway
        .request(store_photo(gateway.backend(), bucket, &path, upload))
        .await
}

#[derive(Serialize)]
struct PhotoRow<'a> {
    client_id: Uuid,
    photo_url: String,
    date: &'a str,
    #[serde(rename = "type")]
    photo_type: PhotoType,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

async fn store_photo(
    backend: &dyn Backend,
    bucket: &str,
    path: &str,
    upload: &PhotoUpload,
) -> BackendResult {
    backend
        .upload(bucket, path, upload.bytes.clone(), content_type(path))
        .await?;
    debug!(bucket, path, bytes = upload.bytes.len(), "photo uploaded");

    let row = PhotoRow {
        client_id: upload.client_id,
        photo_url: backend.public_url(bucket, path),
        date: &upload.date,
        photo_type: upload.photo_type,
        notes: upload.notes.as_deref(),
    };
    insert_row(backend, PHOTOS, &row).await
}

/// Object path of a photo: `measurement_photos/{client}/{millis}.{ext}`.
pub fn photo_path(client_id: Uuid, file_name: &str, at: DateTime<Utc>) -> String {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("bin");
    format!(
        "{PHOTO_FOLDER}/{client_id}/{}.{extension}",
        at.timestamp_millis()
    )
}

fn content_type(path: &str) -> &'static str {
    let extension = path.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Weight and girth trends, oldest record first.
pub async fn client_stats(gateway: &Gateway, client_id: Uuid) -> StatsOutcome<MeasurementStats> {
    let fetched: ApiResult<Vec<Measurement>> = gateway
        .fetch_quiet(
            Query::table(MEASUREMENTS)
                .select(MEASUREMENT_COLUMNS)
                .eq("client_id", client_id)
                .order("date", Direction::Ascending),
        )
        .await;
    settle(
        "measurements",
        fetched,
        MeasurementStats::default,
        stats::measurement::summarize,
    )
}

fn joined(measurement_id: &str) -> Query {
    Query::table(MEASUREMENTS)
        .select(MEASUREMENT_COLUMNS)
        .eq("id", measurement_id)
        .single()
}
