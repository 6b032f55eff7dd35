//! Configuration Loader
//!
//! 0. Loads a `.env` file if present (via dotenvy)
//! 1. Reads a single TOML file from `ASSESSMENT_CONFIG_PATH`
//!    (default `config/assessment.toml`); a missing file means defaults
//! 2. Substitutes `${VAR}` and `${VAR:-default}` references
//! 3. Layers `ASSESSMENT__SECTION__KEY` environment overrides on top
//! 4. Applies the legacy single-purpose variables (`ML_SERVICE_URL`, ...)
//! 5. Validates with the validator crate

use super::error::{ConfigResult, ConfigurationError};
use super::{AssessmentConfig, CacheBackendKind};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

const DEFAULT_CONFIG_PATH: &str = "config/assessment.toml";
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Loaded configuration plus the environment it was loaded for
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: AssessmentConfig,
    environment: String,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        dotenvy::dotenv().ok();

        let path = env::var("ASSESSMENT_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        Self::load_from_path(&path)
    }

    /// Load configuration from an explicit file path
    pub fn load_from_path(path: &Path) -> ConfigResult<Arc<ConfigManager>> {
        let environment = crate::logging::get_environment();

        let (content, source) = if path.exists() {
            (Self::read_config_file_safely(path)?, Some(path.to_path_buf()))
        } else {
            warn!(
                path = %path.display(),
                "Configuration file not found, using defaults"
            );
            (String::new(), None)
        };

        let config = Self::build(&content, &path.display().to_string())?;

        info!(
            environment = %environment,
            source = %source.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".to_string()),
            cache_backend = ?config.cache.backend,
            messaging_backend = ?config.messaging.backend,
            ledger_enabled = config.ledger.enabled,
            "Configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            source,
        }))
    }

    /// Load configuration from TOML text with an explicit environment
    ///
    /// Useful for tests that must not depend on files in the working directory.
    pub fn from_toml_str(content: &str, environment: &str) -> ConfigResult<ConfigManager> {
        let config = Self::build(content, "<inline>")?;
        Ok(ConfigManager {
            config,
            environment: environment.to_string(),
            source: None,
        })
    }

    /// Wrap an already-built configuration
    pub fn from_config(config: AssessmentConfig, environment: &str) -> ConfigResult<ConfigManager> {
        config.validate()?;
        Ok(ConfigManager {
            config,
            environment: environment.to_string(),
            source: None,
        })
    }

    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn build(content: &str, origin: &str) -> ConfigResult<AssessmentConfig> {
        let substituted = substitute_env_vars(content)?;

        let layered = config::Config::builder()
            .add_source(config::File::from_str(&substituted, config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix("ASSESSMENT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::invalid_toml(origin, e))?;

        let mut config: AssessmentConfig = layered
            .try_deserialize()
            .map_err(|e| ConfigurationError::invalid_toml(origin, e))?;

        apply_legacy_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                format!("Configuration file larger than {MAX_CONFIG_FILE_SIZE} bytes"),
            ));
        }

        if !metadata.is_file() {
            return Err(ConfigurationError::invalid_value(
                "file_type",
                "directory or special file",
                "Configuration path must point to a regular file",
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }
}

/// Replace `${VAR}` and `${VAR:-default}` with values from the environment
fn substitute_env_vars(content: &str) -> ConfigResult<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated reference, keep the remainder verbatim
            result.push_str(&rest[start..]);
            return Ok(result);
        };

        let expr = &after[..end];
        let (name, default) = match expr.find(":-") {
            Some(pos) => (&expr[..pos], Some(&expr[pos + 2..])),
            None => (expr, None),
        };

        let value = match (env::var(name), default) {
            (Ok(value), _) => {
                debug!(var = name, "Substituting environment variable");
                escape_toml_string(&value)
            }
            (Err(_), Some(default)) => default.to_string(),
            (Err(_), None) => {
                return Err(ConfigurationError::MissingEnvironmentVariable {
                    name: name.to_string(),
                })
            }
        };

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

fn escape_toml_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Honour the single-purpose variables older deployments set
fn apply_legacy_overrides(config: &mut AssessmentConfig) -> ConfigResult<()> {
    if let Ok(url) = env::var("ML_SERVICE_URL") {
        config.scoring.base_url = url.clone();
        config.reasoning.base_url = url;
    }

    if let Ok(url) = env::var("REDIS_URL") {
        config.cache.backend = CacheBackendKind::Redis;
        config.cache.redis_url = Some(url);
    }

    if let Ok(url) = env::var("DATABASE_URL") {
        config.messaging.database_url.get_or_insert(url.clone());
        config.ledger.database_url.get_or_insert(url);
    }

    if let Ok(flag) = env::var("ENABLE_AUDIT_LOG") {
        config.ledger.enabled = parse_flag("ENABLE_AUDIT_LOG", &flag)?;
    }

    if let Ok(flag) = env::var("ENABLE_WEBSOCKET") {
        config.notifier.enabled = parse_flag("ENABLE_WEBSOCKET", &flag)?;
    }

    Ok(())
}

fn parse_flag(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigurationError::invalid_value(
            name,
            other,
            "expected a boolean flag",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LedgerBackendKind, MessagingBackendKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_with_default() {
        let out = substitute_env_vars("url = \"${ASSESSMENT_TEST_UNSET_VAR:-http://fallback}\"")
            .unwrap();
        assert_eq!(out, "url = \"http://fallback\"");
    }

    #[test]
    fn test_substitute_from_environment() {
        env::set_var("ASSESSMENT_TEST_SUBST_VAR", "redis://cache:6379");
        let out = substitute_env_vars("a = \"${ASSESSMENT_TEST_SUBST_VAR}\" # ${ASSESSMENT_TEST_SUBST_VAR:-x}")
            .unwrap();
        assert_eq!(out, "a = \"redis://cache:6379\" # redis://cache:6379");
        env::remove_var("ASSESSMENT_TEST_SUBST_VAR");
    }

    #[test]
    fn test_missing_variable_without_default_is_an_error() {
        let err = substitute_env_vars("x = \"${ASSESSMENT_TEST_NEVER_SET}\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingEnvironmentVariable { .. }
        ));
    }

    #[test]
    fn test_from_toml_str_overrides_defaults() {
        let toml = r#"
            [scoring]
            base_url = "http://scoring:9000"
            timeout_ms = 1500

            [messaging]
            backend = "pgmq"
            database_url = "postgresql://localhost/assessment"

            [ledger]
            backend = "postgres"
        "#;

        let manager = ConfigManager::from_toml_str(toml, "test").unwrap();
        let config = manager.config();
        assert_eq!(manager.environment(), "test");
        assert_eq!(config.scoring.base_url, "http://scoring:9000");
        assert_eq!(config.scoring.timeout_ms, 1500);
        assert_eq!(config.scoring.cache_ttl_seconds, 300);
        assert_eq!(config.messaging.backend, MessagingBackendKind::Pgmq);
        assert_eq!(config.ledger.backend, LedgerBackendKind::Postgres);
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let toml = r#"
            [circuit_breaker]
            failure_ratio = 2.0
        "#;
        let err = ConfigManager::from_toml_str(toml, "test").unwrap_err();
        assert!(matches!(err, ConfigurationError::ValidationFailed(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[notifier]\nbroadcast_capacity = 64").unwrap();

        let manager = ConfigManager::load_from_path(file.path()).unwrap();
        assert_eq!(manager.config().notifier.broadcast_capacity, 64);
        assert_eq!(manager.source(), Some(file.path()));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let manager =
            ConfigManager::load_from_path(Path::new("/nonexistent/assessment.toml")).unwrap();
        assert!(manager.source().is_none());
        assert_eq!(manager.config().messaging.diagnosis_queue, "llm_tasks");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("X", "TRUE").unwrap());
        assert!(!parse_flag("X", "0").unwrap());
        assert!(parse_flag("X", "maybe").is_err());
    }
}
