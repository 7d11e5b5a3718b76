//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use crate::config::schema::ResilienceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable consulted when no `--config` flag is given.
pub const CONFIG_ENV: &str = "RESILIENCE_CONFIG";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "IO error reading {}: {}", path.display(), e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ResilienceConfig, ConfigError> {
    let config: ResilienceConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ResilienceConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    parse_config(&content)
}

/// Resolve the config source: explicit path, then `RESILIENCE_CONFIG`, then
/// built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ResilienceConfig, ConfigError> {
    let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    match explicit.map(Path::to_path_buf).or(from_env) {
        Some(path) => load_config(&path),
        None => {
            let config = ResilienceConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [store]
            backend = "memory"

            [[circuit_breakers]]
            name = "trading_service"
            failure_threshold = 3
            recovery_timeout_ms = 30000
            monitoring_period_ms = 60000
            half_open_max_calls = 1
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.circuit_breakers.len(), 1);
        assert_eq!(config.circuit_breakers[0].failure_threshold, 3);
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = parse_config(
            r#"
            [[circuit_breakers]]
            name = ""
            failure_threshold = 3
            recovery_timeout_ms = 30000
            monitoring_period_ms = 60000
            half_open_max_calls = 1
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::EmptyBreakerName(0)]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("circuit_breakers = 7").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
