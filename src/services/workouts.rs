use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::backend::{row_id, to_row, Backend, BackendResult, Direction, Query};
use crate::error::{ApiResult, BackendError};
use crate::gateway::Gateway;
use crate::models::{NewProgram, NewWorkout, Program, Workout, WorkoutPatch, WorkoutStats};
use crate::services::{clients, delete_row, insert_row, update_row, with_column};
use crate::stats::{self, settle, StatsOutcome};

const WORKOUTS: &str = "workouts";
const PROGRAMS: &str = "training_programs";
const EXERCISES: &str = "program_exercises";

const WORKOUT_COLUMNS: &str = "*, program:training_program_id (*)";
const PROGRAM_COLUMNS: &str = "*, exercises:program_exercises (*)";
const STATS_COLUMNS: &str = r#"
    *,
    program:training_program_id (
        *,
        exercises:program_exercises (*)
    )
"#;

pub async fn by_id(gateway: &Gateway, workout_id: Uuid) -> ApiResult<Workout> {
    gateway
        .query(
            Query::table(WORKOUTS)
                .select(WORKOUT_COLUMNS)
                .eq("id", workout_id)
                .single(),
        )
        .await
}

/// Newest first.
pub async fn for_client(gateway: &Gateway, client_id: Uuid) -> ApiResult<Vec<Workout>> {
    gateway
        .query(
            Query::table(WORKOUTS)
                .select(WORKOUT_COLUMNS)
                .eq("client_id", client_id)
                .order("start_time", Direction::Descending),
        )
        .await
}

pub async fn for_current_client(gateway: &Gateway) -> ApiResult<Vec<Workout>> {
    match clients::current(gateway).await {
        Some(client) => for_client(gateway, client.id).await,
        None => Ok(Vec::new()),
    }
}

/// Earliest workout starting now or later; `None` when nothing is scheduled.
pub async fn next_for_client(gateway: &Gateway, client_id: Uuid) -> ApiResult<Option<Workout>> {
    next_after(gateway, client_id, Utc::now()).await
}

pub async fn next_after(
    gateway: &Gateway,
    client_id: Uuid,
    now: DateTime<Utc>,
) -> ApiResult<Option<Workout>> {
    let query = Query::table(WORKOUTS)
        .select(WORKOUT_COLUMNS)
        .eq("client_id", client_id)
        .gte("start_time", now.to_rfc3339_opts(SecondsFormat::Millis, true))
        .order("start_time", Direction::Ascending)
        .limit(1)
        .single();
    gateway
        .request_optional(gateway.backend().execute(query))
        .await
}

pub async fn create(gateway: &Gateway, workout: &NewWorkout) -> ApiResult<Workout> {
    gateway
        .request(insert_row(gateway.backend(), WORKOUTS, workout))
        .await
}

pub async fn update(gateway: &Gateway, workout_id: Uuid, patch: &WorkoutPatch) -> ApiResult<Workout> {
    gateway
        .request(update_row(gateway.backend(), WORKOUTS, workout_id, patch))
        .await
}

pub async fn delete(gateway: &Gateway, workout_id: Uuid) -> ApiResult<()> {
    gateway
        .execute(gateway.backend().execute(delete_row(WORKOUTS, workout_id)))
        .await
}

pub async fn program_by_id(gateway: &Gateway, program_id: Uuid) -> ApiResult<Program> {
    gateway
        .query(
            Query::table(PROGRAMS)
                .select(PROGRAM_COLUMNS)
                .eq("id", program_id)
                .single(),
        )
        .await
}

/// Newest first, with exercises.
pub async fn programs_for_client(gateway: &Gateway, client_id: Uuid) -> ApiResult<Vec<Program>> {
    gateway
        .query(
            Query::table(PROGRAMS)
                .select(PROGRAM_COLUMNS)
                .eq("client_id", client_id)
                .order("created_at", Direction::Descending),
        )
        .await
}

/// Writes the program row, then its exercises, and returns the joined program.
pub async fn create_program(gateway: &Gateway, program: &NewProgram) -> ApiResult<Program> {
    gateway
        .request(insert_program(gateway.backend(), program))
        .await
}

async fn insert_program(backend: &dyn Backend, program: &NewProgram) -> BackendResult {
    let stored = insert_row(backend, PROGRAMS, program)
        .await?
        .ok_or_else(BackendError::null_result)?;
    let program_id = row_id(&stored)?;

    if !program.exercises.is_empty() {
        let rows = program
            .exercises
            .iter()
            .map(|exercise| -> Result<Value, BackendError> {
                Ok(with_column(to_row(exercise)?, "program_id", program_id.as_str()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(program_id = %program_id, exercises = rows.len(), "writing program exercises");
        backend
            .execute(Query::table(EXERCISES).insert(Value::Array(rows)))
            .await?;
    }

    backend
        .execute(
            Query::table(PROGRAMS)
                .select(PROGRAM_COLUMNS)
                .eq("id", &program_id)
                .single(),
        )
        .await
}

/// Workout totals over every workout of the client, programs included.
pub async fn client_stats(gateway: &Gateway, client_id: Uuid) -> StatsOutcome<WorkoutStats> {
    let fetched: ApiResult<Vec<Workout>> = gateway
        .fetch_quiet(
            Query::table(WORKOUTS)
                .select(STATS_COLUMNS)
                .eq("client_id", client_id),
        )
        .await;
    settle("workouts", fetched, WorkoutStats::default, stats::workout::summarize)
}
