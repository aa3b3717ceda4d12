use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub const DEMO_TRAINER_ID: &str = "6a1f3c2e-8d44-4b7a-9f0e-2c5b7d9e1a30";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Demo clients with a program, workouts, measurements, activities and meals.
/// Rows carry fixed ids so reseeding leaves existing data alone.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let trainer_id = Uuid::parse_str(DEMO_TRAINER_ID)?;
    let clients = vec![
        (
            Uuid::parse_str("0f6f4d52-3d2a-4a57-9a0b-7d2f1c6e8b11")?,
            "Marta",
            "Silva",
            "marta.silva@example.com",
            "Run a half marathon under 2 hours",
        ),
        (
            Uuid::parse_str("7b3e9a10-5c61-4f0d-8e2a-91d4b6c3f722")?,
            "Theo",
            "Nakamura",
            "theo.nakamura@example.com",
            "Lose 6 kg and deadlift 140 kg",
        ),
    ];

    for (id, first_name, last_name, email, goals) in clients.iter().copied() {
        sqlx::query(
            r#"
            INSERT INTO clients (id, trainer_id, first_name, last_name, email, goals)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                goals = EXCLUDED.goals
            "#,
        )
        .bind(id)
        .bind(trainer_id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(goals)
        .execute(pool)
        .await?;
    }

    let (theo_id, ..) = clients[1];
    let program_id = Uuid::parse_str("c41d7e9b-2f38-4a6c-b5e1-0d9a8f7c6b53")?;
    sqlx::query(
        r#"
        INSERT INTO training_programs (id, title, description, trainer_id, client_id)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(program_id)
    .bind("Strength block A")
    .bind("Squat, deadlift and core work")
    .bind(trainer_id)
    .bind(theo_id)
    .execute(pool)
    .await?;

    let exercises = vec![
        (
            "d2a4c6e8-1b3d-4f5a-8c7e-9a0b1c2d3e41",
            "Back squat",
            "legs",
            r#"[{"set_number":1,"reps":"5","weight":"100"},{"set_number":2,"reps":"5","weight":"105"}]"#,
        ),
        (
            "d2a4c6e8-1b3d-4f5a-8c7e-9a0b1c2d3e42",
            "Deadlift",
            "back",
            r#"[{"set_number":1,"reps":"5","weight":"120"},{"set_number":2,"reps":"3","weight":"130"}]"#,
        ),
        (
            "d2a4c6e8-1b3d-4f5a-8c7e-9a0b1c2d3e43",
            "Plank",
            "core",
            r#"[{"set_number":1,"reps":"60s","weight":"bodyweight"}]"#,
        ),
    ];

    for (id, name, muscle_group, sets) in exercises {
        sqlx::query(
            r#"
            INSERT INTO program_exercises (id, program_id, name, muscle_group, sets)
            VALUES ($1, $2, $3, $4, $5::jsonb)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::parse_str(id)?)
        .bind(program_id)
        .bind(name)
        .bind(muscle_group)
        .bind(sets)
        .execute(pool)
        .await?;
    }

    let now = Utc::now();
    let workouts = vec![
        (
            "a9e1b2c3-4d5e-4f60-8a71-b2c3d4e5f601",
            "Strength A, week 1",
            now - Duration::days(7),
            true,
        ),
        (
            "a9e1b2c3-4d5e-4f60-8a71-b2c3d4e5f602",
            "Strength A, week 2",
            now + Duration::days(2),
            false,
        ),
    ];

    for (id, title, start, completed) in workouts {
        sqlx::query(
            r#"
            INSERT INTO workouts
            (id, client_id, trainer_id, start_time, end_time, title, training_program_id, completed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::parse_str(id)?)
        .bind(theo_id)
        .bind(trainer_id)
        .bind(start)
        .bind(start + Duration::hours(1))
        .bind(title)
        .bind(program_id)
        .bind(completed)
        .execute(pool)
        .await
        .with_context(|| format!("failed to seed workout {title}"))?;
    }

    let measurements = vec![
        ("e5f60718-293a-4b4c-8d5e-6f708192a3b1", 2026, 1, 5, 92.4, 101.0),
        ("e5f60718-293a-4b4c-8d5e-6f708192a3b2", 2026, 2, 2, 90.1, 98.5),
        ("e5f60718-293a-4b4c-8d5e-6f708192a3b3", 2026, 3, 2, 88.7, 96.0),
    ];

    for (id, year, month, day, weight, waist) in measurements {
        let measurement_id = Uuid::parse_str(id)?;
        let date = NaiveDate::from_ymd_opt(year, month, day).context("invalid date")?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO measurements (id, client_id, date, weight, height)
            VALUES ($1, $2, $3, $4, 182.0)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(measurement_id)
        .bind(theo_id)
        .bind(date)
        .bind(weight)
        .execute(pool)
        .await?;

        if inserted.rows_affected() > 0 {
            sqlx::query("INSERT INTO body_measurements (measurement_id, waist) VALUES ($1, $2)")
                .bind(measurement_id)
                .bind(waist)
                .execute(pool)
                .await?;
        }
    }

    let (marta_id, ..) = clients[0];
    let activities = vec![
        ("b7c8d9e0-f1a2-4b3c-9d4e-5f6a7b8c9d01", 2026, 3, 1, "run", 45, Some(480.0), Some(8.2)),
        ("b7c8d9e0-f1a2-4b3c-9d4e-5f6a7b8c9d02", 2026, 3, 2, "walk", 30, Some(120.0), Some(2.5)),
        ("b7c8d9e0-f1a2-4b3c-9d4e-5f6a7b8c9d03", 2026, 3, 3, "run", 60, Some(650.0), Some(11.0)),
        ("b7c8d9e0-f1a2-4b3c-9d4e-5f6a7b8c9d04", 2026, 3, 3, "yoga", 25, None, None),
    ];

    for (id, year, month, day, activity_type, duration, calories, distance) in activities {
        sqlx::query(
            r#"
            INSERT INTO client_activities
            (id, client_id, date, activity_type, duration, calories_burned, distance)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::parse_str(id)?)
        .bind(marta_id)
        .bind(NaiveDate::from_ymd_opt(year, month, day).context("invalid date")?)
        .bind(activity_type)
        .bind(duration)
        .bind(calories)
        .bind(distance)
        .execute(pool)
        .await?;
    }

    let meals = vec![
        ("f1e2d3c4-b5a6-4978-8a9b-0c1d2e3f4a01", 3, "breakfast", "Oats, banana, whey", 520.0, 35.0),
        ("f1e2d3c4-b5a6-4978-8a9b-0c1d2e3f4a02", 3, "lunch", "Rice, chicken, greens", 710.0, 48.0),
        ("f1e2d3c4-b5a6-4978-8a9b-0c1d2e3f4a03", 4, "dinner", "Salmon, potatoes", 680.0, 42.0),
    ];

    for (id, day, meal_type, food_items, calories, protein) in meals {
        sqlx::query(
            r#"
            INSERT INTO nutrition_entries
            (id, client_id, date, meal_type, food_items, calories, protein)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::parse_str(id)?)
        .bind(marta_id)
        .bind(NaiveDate::from_ymd_opt(2026, 3, day).context("invalid date")?)
        .bind(meal_type)
        .bind(food_items)
        .bind(calories)
        .bind(protein)
        .execute(pool)
        .await?;
    }

    Ok(())
}
