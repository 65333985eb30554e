use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::engine::ConnectionParams;
use crate::logging::LoggingConfig;

pub const ENV_PREFIX: &str = "DB_OPS";

/// Connection and logging settings, read from a file and then from
/// `DB_OPS__<SECTION>__<KEY>` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: ConnectionParams,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(config_path).required(true))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| {
                format!(
                    "failed to load configuration from {}",
                    config_path.display()
                )
            })?;
        let cfg: Settings = settings.try_deserialize().with_context(|| {
            format!(
                "failed to deserialize configuration from {}",
                config_path.display()
            )
        })?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_sections_and_fills_defaults() {
        let file = write_config(
            r#"
            [database]
            engine_type = "sqlite"
            database = "app.db"

            [logging]
            level = "debug"
            console = false
            "#,
        );
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.database.engine_type, "sqlite");
        assert_eq!(settings.database.database, "app.db");
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.timezone, "Asia/Kolkata");
        assert!(!settings.logging.console);
        assert!(settings.logging.file);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Settings::load(Path::new("/nonexistent/db_ops.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to load configuration"));
    }
}
