#[cfg(test)]
mod tests {
    use serial_test::serial;

    use crate::env::{DEFAULT_DATABASE_URL, Settings};

    #[test]
    #[serial]
    fn test_settings_defaults() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", None::<&str>),
                ("DEPLOYMENT_ENVIRONMENT", None),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", None),
                ("OTEL_API_KEY", None),
            ],
            || {
                let settings = Settings::from_env();

                assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
                assert_eq!(settings.deployment_environment, "development");
                assert_eq!(settings.otlp_endpoint, None);
                assert!(!settings.telemetry_enabled());
            },
        );
    }

    #[test]
    #[serial]
    fn test_settings_from_environment() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("sqlite://other.db")),
                ("DEPLOYMENT_ENVIRONMENT", Some("production")),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", Some("https://collector:4317")),
                ("OTEL_API_KEY", Some("secret")),
            ],
            || {
                let settings = Settings::from_env();

                assert_eq!(settings.database_url, "sqlite://other.db");
                assert_eq!(settings.deployment_environment, "production");
                assert_eq!(
                    settings.otlp_endpoint.as_deref(),
                    Some("https://collector:4317")
                );
                assert!(settings.telemetry_enabled());
            },
        );
    }

    #[test]
    #[serial]
    fn test_blank_values_fall_back_to_defaults() {
        temp_env::with_vars(
            [("DATABASE_URL", Some("  ")), ("OTEL_API_KEY", Some(""))],
            || {
                let settings = Settings::from_env();

                assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
                assert!(!settings.telemetry_enabled());
            },
        );
    }
}
