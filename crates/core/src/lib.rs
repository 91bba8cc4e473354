pub mod cache;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod performance;
pub mod scoring;
pub mod sector;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub data_provider_base_url: Option<String>,
        pub data_provider_api_key: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                data_provider_base_url: std::env::var("DATA_PROVIDER_BASE_URL").ok(),
                data_provider_api_key: std::env::var("DATA_PROVIDER_API_KEY").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_data_provider_base_url(&self) -> anyhow::Result<&str> {
            self.data_provider_base_url
                .as_deref()
                .context("DATA_PROVIDER_BASE_URL is required")
        }
    }

    /// Market-cap bands for the composite score, in currency units.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ScoringConfig {
        pub mid_cap_min: f64,
        pub mid_cap_max: f64,
        pub large_cap_min: f64,
    }

    impl Default for ScoringConfig {
        fn default() -> Self {
            Self {
                mid_cap_min: 5.0e9,
                mid_cap_max: 5.0e10,
                large_cap_min: 1.0e11,
            }
        }
    }

    impl ScoringConfig {
        pub fn from_env() -> Self {
            let defaults = Self::default();
            Self {
                mid_cap_min: env_f64("SCORING_MID_CAP_MIN").unwrap_or(defaults.mid_cap_min),
                mid_cap_max: env_f64("SCORING_MID_CAP_MAX").unwrap_or(defaults.mid_cap_max),
                large_cap_min: env_f64("SCORING_LARGE_CAP_MIN").unwrap_or(defaults.large_cap_min),
            }
        }
    }

    fn env_f64(key: &str) -> Option<f64> {
        parse_positive_f64(key, &std::env::var(key).ok()?)
    }

    /// Positive finite number, else `None` with a warning naming the variable.
    fn parse_positive_f64(key: &str, raw: &str) -> Option<f64> {
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Some(v),
            _ => {
                tracing::warn!(key, value = raw, "invalid scoring threshold; using default");
                None
            }
        }
    }

}
