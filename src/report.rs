use std::fmt::Write;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::gateway::Gateway;
use crate::models::{
    ActivityEntry, ActivityStats, BodyPart, Client, MeasurementStats, NutritionStats, Workout,
    WorkoutStats,
};
use crate::services::{activities, measurements, nutrition, workouts};
use crate::stats::{FallbackReason, StatsOutcome};

/// Everything the progress report aggregates for one client.
#[derive(Debug, Clone)]
pub struct ProgressSummary {
    pub workouts: StatsOutcome<WorkoutStats>,
    pub activities: StatsOutcome<ActivityStats>,
    pub measurements: StatsOutcome<MeasurementStats>,
    pub nutrition: StatsOutcome<NutritionStats>,
}

impl ProgressSummary {
    pub async fn gather(gateway: &Gateway, client_id: Uuid) -> Self {
        Self {
            workouts: workouts::client_stats(gateway, client_id).await,
            activities: activities::client_stats(gateway, client_id).await,
            measurements: measurements::client_stats(gateway, client_id).await,
            nutrition: nutrition::client_stats(gateway, client_id).await,
        }
    }
}

/// Exercise names by how often they were programmed, most frequent first.
pub fn top_exercises(stats: &WorkoutStats, limit: usize) -> Vec<(&str, usize)> {
    let mut exercises: Vec<(&str, usize)> = stats
        .exercise_frequency
        .iter()
        .map(|(name, count)| (name.as_str(), *count))
        .collect();
    exercises.sort_by(|a, b| b.1.cmp(&a.1));
    exercises.truncate(limit);
    exercises
}

pub fn build_report(
    client: &Client,
    generated_on: NaiveDate,
    summary: &ProgressSummary,
    next_workout: Option<&Workout>,
    recent: &[ActivityEntry],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Progress Report: {}", client.full_name());
    let _ = writeln!(output, "Generated on {generated_on}");
    if let Some(goals) = client.goals.as_deref() {
        let _ = writeln!(output, "Goals: {goals}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Workouts");
    match unavailable(&summary.workouts, "workouts") {
        Some(line) => {
            let _ = writeln!(output, "{line}");
        }
        None => {
            let stats = summary.workouts.summary();
            let _ = writeln!(
                output,
                "- {} of {} workouts completed",
                stats.completed_count, stats.total_count
            );
            let _ = writeln!(output, "- Total volume {:.0} kg", stats.total_volume);
            for (name, count) in top_exercises(stats, 5) {
                let _ = writeln!(output, "- {name}: programmed {count} times");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Activity");
    match unavailable(&summary.activities, "activities") {
        Some(line) => {
            let _ = writeln!(output, "{line}");
        }
        None => {
            let stats = summary.activities.summary();
            let _ = writeln!(
                output,
                "- {} active minutes, {:.0} kcal burned",
                stats.total_minutes, stats.calories_burned
            );
            if let Some(favourite) = stats.most_frequent_activity.as_deref() {
                let _ = writeln!(output, "- Most time spent on {favourite}");
            }
            for total in &stats.types {
                let _ = writeln!(output, "- {}: {} min", total.activity_type, total.minutes);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Body Measurements");
    match unavailable(&summary.measurements, "measurements") {
        Some(line) => {
            let _ = writeln!(output, "{line}");
        }
        None => {
            let stats = summary.measurements.summary();
            match (stats.initial_weight, stats.current_weight) {
                (Some(initial), Some(current)) => {
                    let _ = writeln!(
                        output,
                        "- Weight {initial:.1} kg -> {current:.1} kg ({:+.1} kg)",
                        stats.weight_change.unwrap_or(current - initial)
                    );
                }
                (_, Some(current)) => {
                    let _ = writeln!(output, "- Current weight {current:.1} kg");
                }
                _ => {
                    let _ = writeln!(output, "- Weight not recorded");
                }
            }
            if let Some(body_fat) = stats.body_fat_percentage {
                let _ = writeln!(output, "- Body fat {body_fat:.1}%");
            }
            for part in BodyPart::ALL {
                let series = stats.body_measurements.series(part);
                if let (Some(first), Some(last)) = (series.first(), series.last()) {
                    let _ = writeln!(
                        output,
                        "- {}: {first:.1} cm -> {last:.1} cm",
                        part.as_str()
                    );
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Nutrition");
    match unavailable(&summary.nutrition, "meals") {
        Some(line) => {
            let _ = writeln!(output, "{line}");
        }
        None => {
            let stats = summary.nutrition.summary();
            let _ = writeln!(
                output,
                "- Daily average {:.0} kcal (protein {:.0} g, carbs {:.0} g, fats {:.0} g)",
                stats.average_calories,
                stats.average_protein,
                stats.average_carbs,
                stats.average_fats
            );
            let _ = writeln!(output, "- {} days logged", stats.calories_by_date.len());
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Next Session");
    match next_workout {
        Some(workout) => {
            let _ = writeln!(
                output,
                "- {} on {}",
                workout.title,
                workout.start_time.format("%Y-%m-%d %H:%M UTC")
            );
        }
        None => {
            let _ = writeln!(output, "No upcoming workouts scheduled.");
        }
    }

    let mut recent = recent.to_vec();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");

    if recent.is_empty() {
        let _ = writeln!(output, "No activities recorded.");
    } else {
        for activity in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} on {}: {} min",
                activity.activity_type,
                activity.day(),
                activity.duration
            );
        }
    }

    output
}

fn unavailable<T>(outcome: &StatsOutcome<T>, noun: &str) -> Option<String> {
    match outcome.fallback_reason()? {
        FallbackReason::Empty => Some(format!("No {noun} recorded yet.")),
        FallbackReason::Failed(kind) => Some(format!(
            "Could not load {noun}: {}",
            kind.user_message()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::ActivityTypeTotal;

    fn client() -> Client {
        Client {
            id: Uuid::nil(),
            user_id: None,
            trainer_id: None,
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            email: None,
            phone: None,
            birth_date: None,
            goals: Some("Run a half marathon".to_string()),
            notes: None,
            avatar_url: None,
            created_at: None,
        }
    }

    fn empty<T: Default>() -> StatsOutcome<T> {
        StatsOutcome::Fallback {
            summary: T::default(),
            reason: FallbackReason::Empty,
        }
    }

    fn activity(date: &str, kind: &str, minutes: i64) -> ActivityEntry {
        ActivityEntry {
            id: Uuid::new_v4(),
            client_id: Uuid::nil(),
            date: date.to_string(),
            activity_type: kind.to_string(),
            duration: minutes,
            calories_burned: None,
            distance: None,
            notes: None,
            created_at: None,
        }
    }

    #[test]
    fn report_renders_computed_sections() {
        let mut workout_stats = WorkoutStats {
            total_count: 4,
            completed_count: 3,
            total_volume: 12_500.0,
            ..WorkoutStats::default()
        };
        workout_stats.exercise_frequency.insert("Squat".to_string(), 4);
        workout_stats.exercise_frequency.insert("Row".to_string(), 2);

        let summary = ProgressSummary {
            workouts: StatsOutcome::Computed(workout_stats),
            activities: StatsOutcome::Computed(ActivityStats {
                total_minutes: 60,
                types: vec![
                    ActivityTypeTotal {
                        activity_type: "run".to_string(),
                        minutes: 50,
                    },
                    ActivityTypeTotal {
                        activity_type: "walk".to_string(),
                        minutes: 10,
                    },
                ],
                most_frequent_activity: Some("run".to_string()),
                ..ActivityStats::default()
            }),
            measurements: StatsOutcome::Computed(MeasurementStats {
                initial_weight: Some(80.0),
                current_weight: Some(75.0),
                weight_change: Some(-5.0),
                ..MeasurementStats::default()
            }),
            nutrition: empty(),
        };
        let recent = vec![
            activity("2026-05-01", "walk", 10),
            activity("2026-05-03T07:00:00Z", "run", 30),
        ];

        let report = build_report(
            &client(),
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            &summary,
            None,
            &recent,
        );

        assert!(report.starts_with("# Progress Report: Ana Ruiz\n"));
        assert!(report.contains("Goals: Run a half marathon"));
        assert!(report.contains("- 3 of 4 workouts completed"));
        assert!(report.contains("- Squat: programmed 4 times\n- Row: programmed 2 times"));
        assert!(report.contains("- Most time spent on run"));
        assert!(report.contains("- Weight 80.0 kg -> 75.0 kg (-5.0 kg)"));
        assert!(report.contains("No meals recorded yet."));
        assert!(report.contains("No upcoming workouts scheduled."));
        assert!(report.contains("## Recent Activity\n- run on 2026-05-03: 30 min\n- walk on 2026-05-01: 10 min"));
    }

    #[test]
    fn failed_sections_say_why() {
        let summary = ProgressSummary {
            workouts: StatsOutcome::Fallback {
                summary: WorkoutStats::default(),
                reason: FallbackReason::Failed(ErrorKind::Forbidden),
            },
            activities: empty(),
            measurements: empty(),
            nutrition: empty(),
        };

        let report = build_report(
            &client(),
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            &summary,
            None,
            &[],
        );
        assert!(report.contains(
            "Could not load workouts: You do not have permission to perform this action"
        ));
        assert!(report.contains("No activities recorded."));
    }

    #[test]
    fn top_exercises_are_ordered_by_count() {
        let mut stats = WorkoutStats::default();
        stats.exercise_frequency.insert("Bench".to_string(), 1);
        stats.exercise_frequency.insert("Deadlift".to_string(), 3);
        stats.exercise_frequency.insert("Squat".to_string(), 2);

        assert_eq!(top_exercises(&stats, 2), vec![("Deadlift", 3), ("Squat", 2)]);
    }
}
