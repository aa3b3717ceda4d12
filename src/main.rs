use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use fitcoach::backend::RestBackend;
use fitcoach::guard::{GuardState, RouteGuard, LOGIN_ROUTE};
use fitcoach::models::{PhotoType, PhotoUpload, Role};
use fitcoach::notify::LogNotifier;
use fitcoach::report::{self, ProgressSummary};
use fitcoach::services::{activities, auth, clients, measurements, workouts};
use fitcoach::stats::{FallbackReason, StatsOutcome};
use fitcoach::{import, Config, Gateway};

mod db;

#[derive(Parser)]
#[command(name = "fitcoach")]
#[command(about = "Coaching workflows for trainers and their clients", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo clients, programs and logs
    Seed,
    /// List the signed-in trainer's clients
    Clients,
    /// Import activities from a CSV export
    ImportActivities {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        client_id: Uuid,
    },
    /// Summarize workouts, activity, measurements and nutrition
    Stats {
        #[arg(long)]
        client_id: Uuid,
    },
    /// Activity breakdown for one day
    Daily {
        #[arg(long)]
        client_id: Uuid,
        /// Defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the next scheduled workout
    NextWorkout {
        #[arg(long)]
        client_id: Uuid,
    },
    /// Generate a markdown progress report
    Report {
        #[arg(long)]
        client_id: Uuid,
        #[arg(long, default_value = "progress.md")]
        out: PathBuf,
    },
    /// Check whether the signed-in user may open a role's screens
    Access {
        #[arg(long)]
        role: Role,
    },
    /// Upload a progress photo
    UploadPhoto {
        #[arg(long)]
        client_id: Uuid,
        #[arg(long)]
        file: PathBuf,
        #[arg(long = "type", default_value = "front")]
        photo_type: PhotoType,
        /// Defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    match cli.command {
        Commands::InitDb => {
            let pool = connect_db().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect_db().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted (trainer {}).", db::DEMO_TRAINER_ID);
        }
        command => {
            let config = Config::from_env().context("invalid configuration")?;
            let gateway = connect_api(&config).await?;
            run(command, &gateway, &config).await?;
        }
    }

    Ok(())
}

async fn connect_db() -> anyhow::Result<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the project's Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn connect_api(config: &Config) -> anyhow::Result<Gateway> {
    let gateway = Gateway::new(
        Arc::new(RestBackend::from_config(config)),
        Arc::new(LogNotifier),
    );

    if let Some((email, password)) = config.credentials() {
        let user = auth::sign_in(&gateway, email, password)
            .await
            .with_context(|| format!("sign-in failed for {email}"))?;
        info!(user = %user.display_name(), role = ?user.role(), "signed in");
    }

    Ok(gateway)
}

async fn run(command: Commands, gateway: &Gateway, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::InitDb | Commands::Seed => {
            anyhow::bail!("schema commands run against Postgres, not the API")
        }
        Commands::Clients => {
            let roster = clients::trainer_clients(gateway).await?;
            if roster.is_empty() {
                println!("No clients assigned.");
                return Ok(());
            }
            for client in roster {
                println!(
                    "- {} ({}) {}",
                    client.full_name(),
                    client.id,
                    client.email.as_deref().unwrap_or("no email")
                );
            }
        }
        Commands::ImportActivities { csv, client_id } => {
            let file = File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let summary = import::import_activities(gateway, client_id, file).await?;
            println!(
                "Inserted {} activities from {} ({} skipped).",
                summary.inserted,
                csv.display(),
                summary.skipped
            );
        }
        Commands::Stats { client_id } => {
            let summary = ProgressSummary::gather(gateway, client_id).await;

            let stats = summary.workouts.summary();
            println!(
                "Workouts: {}/{} completed, volume {:.0} kg{}",
                stats.completed_count,
                stats.total_count,
                stats.total_volume,
                note(&summary.workouts)
            );

            let stats = summary.activities.summary();
            println!(
                "Activity: {} min, {:.0} kcal, most time on {}{}",
                stats.total_minutes,
                stats.calories_burned,
                stats.most_frequent_activity.as_deref().unwrap_or("-"),
                note(&summary.activities)
            );

            let stats = summary.measurements.summary();
            println!(
                "Measurements: current {}, change {}{}",
                kilograms(stats.current_weight),
                kilograms(stats.weight_change),
                note(&summary.measurements)
            );

            let stats = summary.nutrition.summary();
            println!(
                "Nutrition: {:.0} kcal/day, {:.0} g protein/day{}",
                stats.average_calories,
                stats.average_protein,
                note(&summary.nutrition)
            );
        }
        Commands::Daily { client_id, date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive()).to_string();
            let outcome = activities::daily_stats(gateway, client_id, &date).await;
            let day = outcome.summary();
            println!(
                "{}: {} min, {:.0} kcal{}",
                day.date,
                day.total_duration,
                day.total_calories,
                note(&outcome)
            );
            for breakdown in &day.activities {
                println!(
                    "- {}: {} min over {} sessions, {:.0} kcal",
                    breakdown.activity_type, breakdown.duration, breakdown.count, breakdown.calories
                );
            }
        }
        Commands::NextWorkout { client_id } => {
            match workouts::next_for_client(gateway, client_id).await? {
                Some(workout) => println!(
                    "Next: {} on {}{}",
                    workout.title,
                    workout.start_time.format("%Y-%m-%d %H:%M UTC"),
                    workout
                        .program
                        .as_ref()
                        .map(|program| format!(" ({})", program.title))
                        .unwrap_or_default()
                ),
                None => println!("No upcoming workouts."),
            }
        }
        Commands::Report { client_id, out } => {
            let client = clients::by_id(gateway, client_id).await?;
            let summary = ProgressSummary::gather(gateway, client_id).await;
            let next = workouts::next_for_client(gateway, client_id).await?;
            let recent = activities::for_client(gateway, client_id).await?;
            let report = report::build_report(
                &client,
                Utc::now().date_naive(),
                &summary,
                next.as_ref(),
                &recent,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Access { role } => {
            let mut guard = RouteGuard::new(role);
            match guard.resolve(gateway).await {
                GuardState::Authorized => println!("Access to {role} screens granted."),
                state => println!(
                    "Access denied, redirecting to {}.",
                    state.route().unwrap_or(LOGIN_ROUTE)
                ),
            }
        }
        Commands::UploadPhoto {
            client_id,
            file,
            photo_type,
            date,
            notes,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let upload = PhotoUpload {
                client_id,
                file_name,
                bytes,
                photo_type,
                date: date.unwrap_or_else(|| Utc::now().date_naive()).to_string(),
                notes,
            };
            let photo = measurements::upload_photo(gateway, &config.photo_bucket, &upload).await?;
            println!("Photo stored at {}.", photo.photo_url);
        }
    }

    Ok(())
}

fn note<T>(outcome: &StatsOutcome<T>) -> String {
    match outcome.fallback_reason() {
        None => String::new(),
        Some(FallbackReason::Empty) => " (no data yet)".to_string(),
        Some(FallbackReason::Failed(kind)) => format!(" (unavailable: {})", kind.user_message()),
    }
}

fn kilograms(value: Option<f64>) -> String {
    value
        .map(|kg| format!("{kg:.1} kg"))
        .unwrap_or_else(|| "-".to_string())
}
