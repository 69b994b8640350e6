use anyhow::Context;

use crate::classify::{ThresholdOverrides, Thresholds};

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const THRESHOLDS_VAR: &str = "ATTENDSHEETS_THRESHOLDS";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    /// Used for classes that store no thresholds of their own.
    pub default_thresholds: Thresholds,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(
            std::env::var(DATABASE_URL_VAR).ok(),
            std::env::var(THRESHOLDS_VAR).ok(),
        )
    }

    fn from_vars(database_url: Option<String>, thresholds: Option<String>) -> anyhow::Result<Self> {
        let default_thresholds = match thresholds.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let overrides: ThresholdOverrides = serde_json::from_str(raw)
                    .with_context(|| format!("{THRESHOLDS_VAR} must be a JSON object of percentages"))?;
                overrides.apply(&Thresholds::default())
            }
            _ => Thresholds::default(),
        };

        Ok(Self {
            database_url: database_url.filter(|url| !url.trim().is_empty()),
            default_thresholds,
        })
    }

    pub fn with_overrides(mut self, overrides: &ThresholdOverrides) -> Self {
        self.default_thresholds = overrides.apply(&self.default_thresholds);
        self
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_vars(None, None).unwrap();
        assert_eq!(config.default_thresholds, Thresholds::default());
        assert!(config.database_url().is_err());
    }

    #[test]
    fn thresholds_variable_overrides_some_fields() {
        let config = AppConfig::from_vars(
            Some("postgres://localhost/attendsheets".to_string()),
            Some(r#"{"excellent": 97.5, "moderate": 80}"#.to_string()),
        )
        .unwrap();

        assert_eq!(config.database_url().unwrap(), "postgres://localhost/attendsheets");
        assert_eq!(config.default_thresholds.excellent, 97.5);
        assert_eq!(config.default_thresholds.good, 90.0);
        assert_eq!(config.default_thresholds.moderate, 80.0);
    }

    #[test]
    fn malformed_thresholds_are_rejected() {
        let err = AppConfig::from_vars(None, Some("ninety".to_string())).unwrap_err();
        assert!(err.to_string().contains(THRESHOLDS_VAR));
    }

    #[test]
    fn flag_overrides_apply_last() {
        let config = AppConfig::from_vars(None, Some(r#"{"good": 88}"#.to_string()))
            .unwrap()
            .with_overrides(&ThresholdOverrides {
                good: Some(91.0),
                ..ThresholdOverrides::default()
            });
        assert_eq!(config.default_thresholds.good, 91.0);
    }

    #[test]
    fn blank_database_url_counts_as_missing() {
        let config = AppConfig::from_vars(Some("  ".to_string()), None).unwrap();
        assert!(config.database_url.is_none());
    }
}
