//! Validator configuration loader.
//!
//! Reads `parley.toml` from a data directory and deserializes it into
//! [`ValidatorConfig`]. Falls back to defaults when the file is missing or
//! malformed; a broken config file must never keep the broker from starting.

use std::path::Path;

use parley_types::config::ValidatorConfig;

/// Load validator configuration from `{data_dir}/parley.toml`.
///
/// - Missing file: returns [`ValidatorConfig::default()`].
/// - Unreadable or unparseable file: logs a warning and returns the default.
pub async fn load_validator_config(data_dir: &Path) -> ValidatorConfig {
    let config_path = data_dir.join("parley.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No parley.toml found at {}, using defaults",
                config_path.display()
            );
            return ValidatorConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return ValidatorConfig::default();
        }
    };

    match toml::from_str::<ValidatorConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ValidatorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_validator_config(tmp.path()).await;
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.history_window, 10);
        assert!(config.validator_model.is_none());
    }

    #[tokio::test]
    async fn valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("parley.toml"),
            r#"
validator_model = "gpt-4o"
request_timeout_secs = 5

[policy_models]
toxicity = "gpt-4o-mini"
"#,
        )
        .await
        .unwrap();

        let config = load_validator_config(tmp.path()).await;
        assert_eq!(config.validator_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(
            config.policy_models.get("toxicity").map(String::as_str),
            Some("gpt-4o-mini")
        );
        // Unset fields keep their defaults.
        assert_eq!(config.history_window, 10);
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("parley.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_validator_config(tmp.path()).await;
        assert_eq!(config.request_timeout_secs, 30);
    }
}
