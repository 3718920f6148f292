use std::str::FromStr;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use study_core::market::Liquidity;

use crate::error::ConfigError;
use crate::persistence::FlushMode;
use crate::retry::RetryPolicy;

/// Tunables shared by the study loop and the report.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StudyConfig {
    pub liquidity: Liquidity,
    pub retry: RetryPolicy,
    pub flush: FlushMode,
}

impl FromStr for FlushMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-response" | "per_response" | "single" => Ok(Self::PerResponse),
            "batched" | "batch" => Ok(Self::Batched),
            _ => Err(ConfigError::InvalidValue {
                key: "STUDY_FLUSH_MODE",
                raw: s.to_owned(),
            }),
        }
    }
}

/// Raw `STUDY_*` values before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StudySettings {
    liquidity: f64,
    retry_attempts: u32,
    retry_backoff_ms: u64,
    flush_mode: String,
}

impl Default for StudySettings {
    fn default() -> Self {
        let defaults = StudyConfig::default();
        Self {
            liquidity: defaults.liquidity.value(),
            retry_attempts: defaults.retry.max_attempts(),
            retry_backoff_ms: u64::try_from(defaults.retry.backoff().as_millis())
                .unwrap_or(u64::MAX),
            flush_mode: "per-response".into(),
        }
    }
}

impl StudyConfig {
    /// Reads `STUDY_LIQUIDITY`, `STUDY_RETRY_ATTEMPTS`, `STUDY_RETRY_BACKOFF_MS`
    /// and `STUDY_FLUSH_MODE`. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for values that do not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Defaults overlaid with `STUDY_*` environment variables.
    #[must_use]
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(StudySettings::default()))
            .merge(Env::prefixed("STUDY_"))
    }

    /// Extracts and validates settings from any provider chain.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` for values of the wrong type, and the
    /// matching variant for an invalid liquidity or flush mode.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let settings: StudySettings = figment.extract()?;
        Ok(Self {
            liquidity: Liquidity::new(settings.liquidity)?,
            retry: RetryPolicy::new(
                settings.retry_attempts,
                Duration::from_millis(settings.retry_backoff_ms),
            ),
            flush: settings.flush_mode.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_when_unset() {
        Jail::expect_with(|_jail| {
            let config = StudyConfig::from_env().unwrap();
            assert_eq!(config, StudyConfig::default());
            assert_eq!(config.retry.max_attempts(), 3);
            assert_eq!(config.retry.backoff(), Duration::from_secs(2));
            assert_eq!(config.flush, FlushMode::PerResponse);
            assert_eq!(config.liquidity.value(), 1.0);
            Ok(())
        });
    }

    #[test]
    fn reads_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("STUDY_LIQUIDITY", "2.5");
            jail.set_env("STUDY_RETRY_ATTEMPTS", "5");
            jail.set_env("STUDY_RETRY_BACKOFF_MS", "250");
            jail.set_env("STUDY_FLUSH_MODE", "Batched");

            let config = StudyConfig::from_env().unwrap();
            assert_eq!(config.liquidity.value(), 2.5);
            assert_eq!(config.retry, RetryPolicy::new(5, Duration::from_millis(250)));
            assert_eq!(config.flush, FlushMode::Batched);
            Ok(())
        });
    }

    #[test]
    fn unrelated_study_variables_are_ignored() {
        Jail::expect_with(|jail| {
            jail.set_env("STUDY_DB_URL", "sqlite::memory:");
            jail.set_env("STUDY_CATALOG", "statements.json");

            assert_eq!(StudyConfig::from_env().unwrap(), StudyConfig::default());
            Ok(())
        });
    }

    #[test]
    fn rejects_mistyped_numbers() {
        Jail::expect_with(|jail| {
            jail.set_env("STUDY_RETRY_ATTEMPTS", "many");
            assert!(matches!(
                StudyConfig::from_env(),
                Err(ConfigError::Figment(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn rejects_invalid_liquidity_and_flush_mode() {
        Jail::expect_with(|jail| {
            jail.set_env("STUDY_LIQUIDITY", "0.0");
            assert!(matches!(
                StudyConfig::from_env(),
                Err(ConfigError::Liquidity(_))
            ));

            jail.set_env("STUDY_LIQUIDITY", "1.5");
            jail.set_env("STUDY_FLUSH_MODE", "sometimes");
            assert!(matches!(
                StudyConfig::from_env(),
                Err(ConfigError::InvalidValue {
                    key: "STUDY_FLUSH_MODE",
                    ..
                })
            ));
            Ok(())
        });
    }
}
