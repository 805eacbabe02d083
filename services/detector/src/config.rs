use std::str::FromStr;
use std::time::Duration;

use veritext_domain::analysis::{ConfidenceThresholds, Language};
use veritext_domain::credit::PlanAllowances;

use crate::infra::scoring::ScoringConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("invalid confidence thresholds: {0}")]
    Thresholds(#[from] veritext_domain::analysis::ThresholdError),
}

/// Detector service configuration loaded from environment variables.
#[derive(Debug)]
pub struct DetectorConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL, used for the token revocation list.
    pub redis_url: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    /// Cookie domain attribute (e.g. "example.com").
    pub cookie_domain: String,
    /// Shared secret the scheduler presents on `/cron/reset-credits`.
    pub cron_secret: String,
    pub scoring: ScoringConfig,
    pub allowances: PlanAllowances,
    pub thresholds: ConfidenceThresholds,
    pub default_language: Language,
    /// TCP port to listen on (default 3000). Env var: `DETECTOR_PORT`.
    pub detector_port: u16,
}

impl DetectorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let mut scoring =
            ScoringConfig::new(required("SCORING_API_URL")?, required("SCORING_API_KEY")?);
        if let Some(model) = lookup("SCORING_MODEL") {
            scoring.model = model;
        }
        scoring.timeout = Duration::from_secs(parsed(&lookup, "SCORING_TIMEOUT_SECS", 30)?);
        scoring.max_attempts = parsed(&lookup, "SCORING_MAX_ATTEMPTS", 3u32)?.max(1);
        scoring.cost_per_1k_tokens = parsed(&lookup, "SCORING_COST_PER_1K_TOKENS", 0.00015)?;

        let defaults = PlanAllowances::default();
        let allowances = PlanAllowances {
            free: parsed(&lookup, "CREDITS_FREE", defaults.free)?,
            pro: parsed(&lookup, "CREDITS_PRO", defaults.pro)?,
            enterprise: parsed(&lookup, "CREDITS_ENTERPRISE", defaults.enterprise)?,
        };

        let thresholds = ConfidenceThresholds::new(
            parsed(&lookup, "CONFIDENCE_MEDIUM", 30.0)?,
            parsed(&lookup, "CONFIDENCE_HIGH", 70.0)?,
            parsed(&lookup, "AI_GENERATED_CUTOFF", 50.0)?,
        )?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            access_token_secret: required("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?,
            cookie_domain: required("COOKIE_DOMAIN")?,
            cron_secret: required("CRON_SECRET")?,
            scoring,
            allowances,
            thresholds,
            default_language: parsed(&lookup, "DEFAULT_LANGUAGE", Language::Pt)?,
            detector_port: parsed(&lookup, "DETECTOR_PORT", 3000)?,
        })
    }
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
