use uuid::Uuid;

use crate::backend::{Direction, Query};
use crate::error::ApiResult;
use crate::gateway::Gateway;
use crate::models::{NewNutritionEntry, NutritionEntry, NutritionPatch, NutritionStats};
use crate::services::{clients, delete_row, insert_row, update_row};
use crate::stats::{self, settle, StatsOutcome};

const ENTRIES: &str = "nutrition_entries";

/// Newest first.
pub async fn for_client(gateway: &Gateway, client_id: Uuid) -> ApiResult<Vec<NutritionEntry>> {
    gateway
        .query(
            Query::table(ENTRIES)
                .select("*")
                .eq("client_id", client_id)
                .order("date", Direction::Descending),
        )
        .await
}

pub async fn for_current_client(gateway: &Gateway) -> ApiResult<Vec<NutritionEntry>> {
    match clients::current(gateway).await {
        Some(client) => for_client(gateway, client.id).await,
        None => Ok(Vec::new()),
    }
}

pub async fn by_id(gateway: &Gateway, entry_id: Uuid) -> ApiResult<NutritionEntry> {
    gateway
        .query(Query::table(ENTRIES).select("*").eq("id", entry_id).single())
        .await
}

pub async fn create(gateway: &Gateway, entry: &NewNutritionEntry) -> ApiResult<NutritionEntry> {
    gateway
        .request(insert_row(gateway.backend(), ENTRIES, entry))
        .await
}

pub async fn update(
    gateway: &Gateway,
    entry_id: Uuid,
    patch: &NutritionPatch,
) -> ApiResult<NutritionEntry> {
    gateway
        .request(update_row(gateway.backend(), ENTRIES, entry_id, patch))
        .await
}

pub async fn delete(gateway: &Gateway, entry_id: Uuid) -> ApiResult<()> {
    gateway
        .execute(gateway.backend().execute(delete_row(ENTRIES, entry_id)))
        .await
}

pub async fn client_stats(gateway: &Gateway, client_id: Uuid) -> StatsOutcome<NutritionStats> {
    let fetched: ApiResult<Vec<NutritionEntry>> = gateway
        .fetch_quiet(
            Query::table(ENTRIES)
                .select("*")
                .eq("client_id", client_id)
                .order("date", Direction::Ascending),
        )
        .await;
    settle("nutrition", fetched, NutritionStats::default, stats::nutrition::summarize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::models::MealType;
    use crate::testing::memory_gateway;
    use serde_json::json;

    fn meal(client_id: Uuid, date: &str, meal_type: MealType, calories: f64) -> NewNutritionEntry {
        NewNutritionEntry {
            client_id,
            date: date.to_string(),
            meal_type,
            food_items: "rice, chicken".to_string(),
            calories: Some(calories),
            protein: Some(calories / 20.0),
            carbs: None,
            fats: None,
            photo_url: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn logged_meals_feed_the_daily_averages() {
        let (gateway, _backend, _notifier) = memory_gateway(MemoryBackend::new());
        let client_id = Uuid::new_v4();
        for entry in [
            meal(client_id, "2026-06-01", MealType::Breakfast, 400.0),
            meal(client_id, "2026-06-01", MealType::Dinner, 800.0),
            meal(client_id, "2026-06-02", MealType::Lunch, 600.0),
        ] {
            create(&gateway, &entry).await.unwrap();
        }

        let listed = for_client(&gateway, client_id).await.unwrap();
        assert_eq!(listed[0].date, "2026-06-02");

        let stats = client_stats(&gateway, client_id).await.into_summary();
        assert_eq!(stats.average_calories, 900.0);
        assert_eq!(stats.average_protein, 45.0);
        assert_eq!(stats.meal_frequency.get(&MealType::Lunch), Some(&1));
    }

    #[tokio::test]
    async fn current_client_sees_own_entries() {
        let (gateway, backend, _notifier) = memory_gateway(MemoryBackend::new());
        let user_id = backend.sign_in_as("sam@example.com", json!({"role": "client"}));
        let client_id = Uuid::new_v4();
        backend.seed(
            "clients",
            vec![json!({"id": client_id, "user_id": user_id, "first_name": "Sam", "last_name": "Lee"})],
        );
        create(&gateway, &meal(client_id, "2026-06-01", MealType::Snack, 150.0))
            .await
            .unwrap();
        create(&gateway, &meal(Uuid::new_v4(), "2026-06-01", MealType::Snack, 250.0))
            .await
            .unwrap();

        let mine = for_current_client(&gateway).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].calories, Some(150.0));
    }

    #[tokio::test]
    async fn edit_then_remove_an_entry() {
        let (gateway, _backend, _notifier) = memory_gateway(MemoryBackend::new());
        let created = create(&gateway, &meal(Uuid::new_v4(), "2026-06-01", MealType::Lunch, 500.0))
            .await
            .unwrap();

        let edited = update(
            &gateway,
            created.id,
            &NutritionPatch {
                meal_type: Some(MealType::Dinner),
                fats: Some(12.0),
                ..NutritionPatch::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(edited.meal_type, MealType::Dinner);
        assert_eq!(by_id(&gateway, created.id).await.unwrap().fats, Some(12.0));

        delete(&gateway, created.id).await.unwrap();
        assert!(by_id(&gateway, created.id).await.unwrap_err().is_not_found());
    }
}
