#[macro_use]
extern crate rocket;

mod api;
mod db;
mod debounce;
mod env;
mod error;
mod models;
mod questionnaire;
mod report;
mod seed;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use std::str::FromStr;
use std::sync::Arc;

use api::{
    SharedSubmissionGuard, api_get_questionnaire, api_get_report, api_submit_assessment, health,
};
use db::load_questionnaire;
use debounce::InMemorySubmissionGuard;
use env::{Settings, load_environment};
use error::AppError;
use questionnaire::Questionnaire;
use rocket::{Build, Rocket};
use seed::seed_questionnaire;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use telemetry::{TelemetryFairing, init_telemetry};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("{0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

/// Connects, migrates, seeds, and loads the questionnaire into memory.
pub async fn prepare_database(database_url: &str) -> Result<(SqlitePool, Questionnaire), Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed successfully");

    if seed_questionnaire(&pool).await? {
        info!("Questionnaire seeded");
    }

    let questionnaire = load_questionnaire(&pool).await?;
    if questionnaire.is_empty() {
        warn!("Questionnaire is empty");
    }

    Ok((pool, questionnaire))
}

#[launch]
async fn rocket() -> _ {
    if let Err(e) = load_environment() {
        eprintln!("Failed to load environment files: {}", e);
    }

    let settings = Settings::from_env();
    let telemetry = init_telemetry(&settings);
    info!(
        telemetry_export = settings.telemetry_enabled(),
        environment = %settings.deployment_environment,
        "Telemetry initialised"
    );

    let (pool, questionnaire) = match prepare_database(&settings.database_url).await {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("Failed to prepare database: {}", e);
            panic!("Database initialisation failed: {}", e);
        }
    };

    let guard: SharedSubmissionGuard = Arc::new(InMemorySubmissionGuard::new());

    init_rocket(pool, questionnaire, guard)
        .await
        .manage(telemetry)
        .attach(TelemetryFairing)
}

pub async fn init_rocket(
    pool: SqlitePool,
    questionnaire: Questionnaire,
    guard: SharedSubmissionGuard,
) -> Rocket<Build> {
    info!("Starting risk survey service");

    rocket::build()
        .manage(pool)
        .manage(questionnaire)
        .manage(guard)
        .mount(
            "/api",
            routes![
                api_get_questionnaire,
                api_submit_assessment,
                api_get_report,
                health,
            ],
        )
}
