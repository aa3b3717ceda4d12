use std::collections::BTreeSet;

use crate::models::{NutritionEntry, NutritionStats};

pub fn summarize(entries: &[NutritionEntry]) -> NutritionStats {
    let mut stats = NutritionStats::default();
    let days: BTreeSet<&str> = entries.iter().map(NutritionEntry::day).collect();
    if days.is_empty() {
        return stats;
    }

    let (mut protein, mut carbs, mut fats, mut calories) = (0.0, 0.0, 0.0, 0.0);
    for entry in entries {
        let entry_calories = entry.calories.unwrap_or(0.0);
        calories += entry_calories;
        protein += entry.protein.unwrap_or(0.0);
        carbs += entry.carbs.unwrap_or(0.0);
        fats += entry.fats.unwrap_or(0.0);

        *stats.meal_frequency.entry(entry.meal_type).or_insert(0) += 1;
        *stats
            .calories_by_date
            .entry(entry.day().to_string())
            .or_insert(0.0) += entry_calories;
    }

    let logged_days = days.len() as f64;
    stats.average_calories = calories / logged_days;
    stats.average_protein = protein / logged_days;
    stats.average_carbs = carbs / logged_days;
    stats.average_fats = fats / logged_days;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealType;
    use uuid::Uuid;

    fn entry(date: &str, meal_type: MealType, calories: Option<f64>, protein: Option<f64>) -> NutritionEntry {
        NutritionEntry {
            id: Uuid::new_v4(),
            client_id: Uuid::nil(),
            date: date.to_string(),
            meal_type,
            food_items: "oats".to_string(),
            calories,
            protein,
            carbs: None,
            fats: None,
            photo_url: None,
            notes: None,
            created_at: None,
        }
    }

    #[test]
    fn averages_are_per_logged_day() {
        let entries = vec![
            entry("2026-04-01", MealType::Breakfast, Some(500.0), Some(30.0)),
            entry("2026-04-01", MealType::Dinner, Some(900.0), Some(50.0)),
            entry("2026-04-02", MealType::Breakfast, Some(600.0), None),
        ];

        let stats = summarize(&entries);
        assert!((stats.average_calories - 1000.0).abs() < 1e-9);
        assert!((stats.average_protein - 40.0).abs() < 1e-9);
        assert_eq!(stats.meal_frequency.get(&MealType::Breakfast), Some(&2));
        assert_eq!(stats.calories_by_date.get("2026-04-01"), Some(&1400.0));
    }

    #[test]
    fn empty_input_yields_zero_summary() {
        assert_eq!(summarize(&[]), NutritionStats::default());
    }
}
