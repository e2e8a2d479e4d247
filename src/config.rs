use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::{AggregationParams, MatchError, MatchingPipeline, ParticipantLimits, RankAggregator, StableMatcher, ValidationGate};
use crate::models::FitnessMode;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub aggregation: AggregationSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Population caps for the validation gate
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationSettings {
    #[serde(default = "default_max_participants")]
    pub max_recipients: usize,
    #[serde(default = "default_max_participants")]
    pub max_providers: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            max_recipients: default_max_participants(),
            max_providers: default_max_participants(),
        }
    }
}

fn default_max_participants() -> usize { 100 }

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationSettings {
    #[serde(default = "default_weight")]
    pub preference_weight: f64,
    #[serde(default = "default_weight")]
    pub fitness_weight: f64,
    #[serde(default = "default_fitness_mode")]
    pub fitness_mode: String,
    /// Candidate count above which a single aggregation is refused
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            preference_weight: default_weight(),
            fitness_weight: default_weight(),
            fitness_mode: default_fitness_mode(),
            max_candidates: default_max_candidates(),
        }
    }
}

fn default_weight() -> f64 { 1.0 }
fn default_fitness_mode() -> String { "ordinal".to_string() }
fn default_max_candidates() -> usize { 8 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingSettings {
    /// Overrides the |R|·|P| + 1 round bound
    pub max_rounds: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with CARE_MATCH)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., CARE_MATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("CARE_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("CARE_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn participant_limits(&self) -> ParticipantLimits {
        ParticipantLimits {
            max_recipients: self.validation.max_recipients,
            max_providers: self.validation.max_providers,
        }
    }

    pub fn aggregation_params(&self) -> Result<AggregationParams, MatchError> {
        Ok(AggregationParams {
            preference_weight: self.aggregation.preference_weight,
            fitness_weight: self.aggregation.fitness_weight,
            fitness_mode: self.aggregation.fitness_mode.parse::<FitnessMode>()?,
            max_candidates: self.aggregation.max_candidates,
        })
    }

    /// Build the matching pipeline these settings describe
    pub fn pipeline(&self) -> Result<MatchingPipeline, MatchError> {
        Ok(MatchingPipeline::new(
            ValidationGate::new(self.participant_limits()),
            RankAggregator::new(self.aggregation_params()?)?,
            StableMatcher::new(self.matching.max_rounds),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.validation.max_recipients, 100);
        assert_eq!(settings.validation.max_providers, 100);
        assert_eq!(settings.aggregation.preference_weight, 1.0);
        assert_eq!(settings.aggregation.max_candidates, 8);
        assert!(settings.matching.max_rounds.is_none());
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                "[aggregation]\nfitness_mode = \"gap\"\nfitness_weight = 2.5\n\n[matching]\nmax_rounds = 50\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let params = settings.aggregation_params().unwrap();
        assert_eq!(params.fitness_mode, FitnessMode::Gap);
        assert_eq!(params.fitness_weight, 2.5);
        assert_eq!(params.preference_weight, 1.0);
        assert_eq!(settings.matching.max_rounds, Some(50));
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let mut settings = Settings::default();
        settings.aggregation.fitness_mode = "linear".to_string();
        assert!(settings.pipeline().is_err());

        settings.aggregation.fitness_mode = "ordinal".to_string();
        settings.aggregation.fitness_weight = -1.0;
        assert!(settings.pipeline().is_err());
    }
}
