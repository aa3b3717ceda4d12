use crate::models::{Workout, WorkoutStats};

pub fn summarize(workouts: &[Workout]) -> WorkoutStats {
    let mut stats = WorkoutStats {
        total_count: workouts.len(),
        completed_count: workouts.iter().filter(|w| w.is_completed()).count(),
        ..WorkoutStats::default()
    };

    let exercises = workouts
        .iter()
        .filter_map(|workout| workout.program.as_ref())
        .flat_map(|program| program.exercises.iter());

    for exercise in exercises {
        let volume = exercise.volume();
        stats.total_volume += volume;
        *stats
            .exercise_frequency
            .entry(exercise.name.clone())
            .or_insert(0) += 1;
        if let Some(group) = exercise.muscle_group.as_deref() {
            *stats
                .volume_by_muscle_group
                .entry(group.to_string())
                .or_insert(0.0) += volume;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exercise, ExerciseSet, NumericText, Program};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn set(weight: &str, reps: &str) -> ExerciseSet {
        ExerciseSet {
            set_number: 1,
            reps: NumericText::Text(reps.to_string()),
            weight: NumericText::Text(weight.to_string()),
            completed: None,
        }
    }

    fn exercise(name: &str, muscle_group: Option<&str>, sets: Vec<ExerciseSet>) -> Exercise {
        Exercise {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            video_url: None,
            sets,
            notes: None,
            category: None,
            muscle_group: muscle_group.map(str::to_string),
            equipment: None,
            difficulty: None,
        }
    }

    fn workout(completed: Option<bool>, exercises: Vec<Exercise>) -> Workout {
        let start = Utc::now();
        Workout {
            id: Uuid::new_v4(),
            client_id: Uuid::nil(),
            trainer_id: Uuid::nil(),
            start_time: start,
            end_time: start + Duration::hours(1),
            title: "Session".to_string(),
            notes: None,
            created_at: None,
            training_program_id: None,
            program: (!exercises.is_empty()).then(|| Program {
                id: Uuid::new_v4(),
                title: "Block".to_string(),
                description: None,
                exercises,
                created_at: None,
                trainer_id: None,
                client_id: None,
            }),
            completed,
            completion_date: None,
            feedback: None,
            rating: None,
        }
    }

    #[test]
    fn non_numeric_sets_contribute_nothing() {
        let workouts = vec![workout(
            Some(true),
            vec![exercise("Bench", Some("chest"), vec![set("50", "10"), set("abc", "5")])],
        )];

        let stats = summarize(&workouts);
        assert_eq!(stats.total_volume, 500.0);
        assert_eq!(stats.volume_by_muscle_group.get("chest"), Some(&500.0));
    }

    #[test]
    fn counts_total_and_completed() {
        let workouts = vec![
            workout(Some(true), Vec::new()),
            workout(Some(false), Vec::new()),
            workout(None, Vec::new()),
        ];

        let stats = summarize(&workouts);
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.completed_count, 1);
        assert_eq!(stats.total_volume, 0.0);
    }

    #[test]
    fn empty_input_yields_zero_summary() {
        assert_eq!(summarize(&[]), WorkoutStats::default());
    }

    #[test]
    fn exercise_frequency_spans_workouts() {
        let workouts = vec![
            workout(None, vec![exercise("Squat", Some("legs"), vec![set("100", "5")])]),
            workout(
                None,
                vec![
                    exercise("Squat", Some("legs"), vec![set("105", "5")]),
                    exercise("Plank", None, vec![set("0", "60")]),
                ],
            ),
        ];

        let stats = summarize(&workouts);
        assert_eq!(stats.exercise_frequency.get("Squat"), Some(&2));
        assert_eq!(stats.exercise_frequency.get("Plank"), Some(&1));
        assert_eq!(stats.volume_by_muscle_group.get("legs"), Some(&1025.0));
        assert_eq!(stats.total_volume, 1025.0);
    }
}
