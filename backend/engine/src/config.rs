use serde::Deserialize;
use std::env;

const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
const DEFAULT_CHECKPOINT_INTERVAL_SECS: u64 = 20;
const DEFAULT_VIOLATION_LIMIT: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Countdown tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Interval between semi-score checkpoints in seconds.
    pub checkpoint_interval_secs: u64,
    /// Scored violations beyond this count force an automatic submit.
    pub violation_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            checkpoint_interval_secs: DEFAULT_CHECKPOINT_INTERVAL_SECS,
            violation_limit: DEFAULT_VIOLATION_LIMIT,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env_name = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env_name)).required(false), // Allow missing config file, fallback to ENV
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let tick_interval_ms = settings
            .get_int("exam.tick_interval_ms")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .or_else(|| parse_env_var("EXAM_TICK_INTERVAL_MS"))
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_TICK_INTERVAL_MS);

        let checkpoint_interval_secs = settings
            .get_int("exam.checkpoint_interval_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .or_else(|| parse_env_var("EXAM_CHECKPOINT_INTERVAL_SECS"))
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_CHECKPOINT_INTERVAL_SECS);

        let violation_limit = settings
            .get_int("exam.violation_limit")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| parse_env_var("EXAM_VIOLATION_LIMIT"))
            .unwrap_or(DEFAULT_VIOLATION_LIMIT);

        Ok(Config {
            tick_interval_ms,
            checkpoint_interval_secs,
            violation_limit,
        })
    }
}

fn parse_env_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}
