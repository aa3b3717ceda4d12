use tracing::warn;
use uuid::Uuid;

use crate::backend::{Direction, Query};
use crate::error::{ApiResult, BackendError};
use crate::gateway::Gateway;
use crate::models::{Client, ClientPatch, ClientProfile, NewClient};
use crate::services::{auth, insert_row, update_row};

const CLIENTS: &str = "clients";
const PROFILE_COLUMNS: &str = r#"
    *,
    measurements (*, body_measurements (*)),
    workouts (*),
    progress_photos:measurement_photos (*)
"#;

pub async fn by_user_id(gateway: &Gateway, user_id: Uuid) -> ApiResult<Client> {
    gateway
        .query(Query::table(CLIENTS).select("*").eq("user_id", user_id).single())
        .await
}

pub async fn by_id(gateway: &Gateway, client_id: Uuid) -> ApiResult<Client> {
    gateway
        .query(Query::table(CLIENTS).select("*").eq("id", client_id).single())
        .await
}

/// Client profile of the signed-in user, if there is one.
pub async fn current(gateway: &Gateway) -> Option<Client> {
    let user = auth::current_user(gateway).await?;
    let lookup = Query::table(CLIENTS).select("*").eq("user_id", user.id).single();
    match gateway
        .request_optional(gateway.backend().execute(lookup))
        .await
    {
        Ok(client) => client,
        Err(err) => {
            warn!(user_id = %user.id, kind = ?err.kind, "no client profile for current user");
            None
        }
    }
}

/// Clients coached by the signed-in trainer, by last name.
pub async fn trainer_clients(gateway: &Gateway) -> ApiResult<Vec<Client>> {
    let Some(trainer) = auth::current_user(gateway).await else {
        return Err(gateway.reject(&BackendError::session_missing()));
    };

    gateway
        .query(
            Query::table(CLIENTS)
                .select("*")
                .eq("trainer_id", trainer.id)
                .order("last_name", Direction::Ascending),
        )
        .await
}

pub async fn create(gateway: &Gateway, client: &NewClient) -> ApiResult<Client> {
    gateway
        .request(insert_row(gateway.backend(), CLIENTS, client))
        .await
}

pub async fn update(gateway: &Gateway, client_id: Uuid, patch: &ClientPatch) -> ApiResult<Client> {
    gateway
        .request(update_row(gateway.backend(), CLIENTS, client_id, patch))
        .await
}

/// Client with measurements, workouts and progress photos embedded.
pub async fn profile(gateway: &Gateway, client_id: Uuid) -> ApiResult<ClientProfile> {
    gateway
        .query(
            Query::table(CLIENTS)
                .select(PROFILE_COLUMNS)
                .eq("id", client_id)
                .single(),
        )
        .await
}
