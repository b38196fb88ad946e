use std::path::Path;

use tracing::{info, warn};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://risk_survey.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub deployment_environment: String,
    pub otlp_endpoint: Option<String>,
    pub otlp_api_key: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        fn optional(name: &str) -> Option<String> {
            dotenvy::var(name).ok().filter(|value| !value.trim().is_empty())
        }

        Self {
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            deployment_environment: optional("DEPLOYMENT_ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),
            otlp_endpoint: optional("OTEL_EXPORTER_OTLP_ENDPOINT"),
            otlp_api_key: optional("OTEL_API_KEY"),
        }
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.otlp_api_key.is_some()
    }
}

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
