use uuid::Uuid;

use crate::backend::{Direction, Query};
use crate::error::ApiResult;
use crate::gateway::Gateway;
use crate::models::{ActivityEntry, ActivityPatch, ActivityStats, DailyStats, NewActivity};
use crate::services::{clients, delete_row, insert_row, update_row};
use crate::stats::{self, settle, StatsOutcome};

const ACTIVITIES: &str = "client_activities";

/// Newest first.
pub async fn for_client(gateway: &Gateway, client_id: Uuid) -> ApiResult<Vec<ActivityEntry>> {
    gateway
        .query(
            Query::table(ACTIVITIES)
                .select("*")
                .eq("client_id", client_id)
                .order("date", Direction::Descending),
        )
        .await
}

pub async fn for_current_client(gateway: &Gateway) -> ApiResult<Vec<ActivityEntry>> {
    match clients::current(gateway).await {
        Some(client) => for_client(gateway, client.id).await,
        None => Ok(Vec::new()),
    }
}

pub async fn create(gateway: &Gateway, activity: &NewActivity) -> ApiResult<ActivityEntry> {
    gateway
        .request(insert_row(gateway.backend(), ACTIVITIES, activity))
        .await
}

pub async fn update(
    gateway: &Gateway,
    activity_id: Uuid,
    patch: &ActivityPatch,
) -> ApiResult<ActivityEntry> {
    gateway
        .request(update_row(gateway.backend(), ACTIVITIES, activity_id, patch))
        .await
}

pub async fn delete(gateway: &Gateway, activity_id: Uuid) -> ApiResult<()> {
    gateway
        .execute(gateway.backend().execute(delete_row(ACTIVITIES, activity_id)))
        .await
}

/// Totals over every activity of the client.
pub async fn client_stats(gateway: &Gateway, client_id: Uuid) -> StatsOutcome<ActivityStats> {
    let fetched: ApiResult<Vec<ActivityEntry>> = gateway
        .fetch_quiet(
            Query::table(ACTIVITIES)
                .select("*")
                .eq("client_id", client_id)
                .order("date", Direction::Ascending),
        )
        .await;
    settle("activities", fetched, ActivityStats::default, stats::activity::summarize)
}

/// Per-type breakdown of one day, `date` as `YYYY-MM-DD`.
pub async fn daily_stats(gateway: &Gateway, client_id: Uuid, date: &str) -> StatsOutcome<DailyStats> {
    let fetched: ApiResult<Vec<ActivityEntry>> = gateway
        .fetch_quiet(
            Query::table(ACTIVITIES)
                .select("*")
                .eq("client_id", client_id)
                .eq("date", date),
        )
        .await;
    settle(
        "daily activities",
        fetched,
        || DailyStats::empty(date),
        |activities| stats::activity::daily(activities, date),
    )
}
