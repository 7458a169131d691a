use crate::actor_framework::IdStrategy;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// What to do when the stock update went through but the order call did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialFailurePolicy {
    /// Reverse the stock adjustment with a compensating update.
    #[default]
    Compensate,
    /// Leave the stock adjusted and report the inconsistency.
    Report,
}

impl FromStr for PartialFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compensate" => Ok(PartialFailurePolicy::Compensate),
            "report" => Ok(PartialFailurePolicy::Report),
            other => Err(format!("unknown partial failure policy: {other}")),
        }
    }
}

impl FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(IdStrategy::Sequential),
            "timestamp" => Ok(IdStrategy::Timestamp),
            other => Err(format!("unknown id strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub actor_buffer: usize,
    pub id_strategy: IdStrategy,
    pub partial_failure: PartialFailurePolicy,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_millis(15_000),
            actor_buffer: 32,
            id_strategy: IdStrategy::default(),
            partial_failure: PartialFailurePolicy::default(),
        }
    }
}

fn parse_setting<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e: T::Err| {
            warn!(var = name, value = %raw, error = %e, "Ignoring invalid setting");
            default
        }),
        None => default,
    }
}

fn env_parsed<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    parse_setting(name, env::var(name).ok(), default)
}

impl AdminConfig {
    /// Reads `INVENTORY_*` variables, falling back to defaults for anything
    /// unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("INVENTORY_API_BASE_URL").unwrap_or(defaults.base_url),
            request_timeout: Duration::from_millis(env_parsed(
                "INVENTORY_API_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )),
            actor_buffer: env_parsed("INVENTORY_ACTOR_BUFFER", defaults.actor_buffer).max(1),
            id_strategy: env_parsed("INVENTORY_ID_STRATEGY", defaults.id_strategy),
            partial_failure: env_parsed("INVENTORY_PARTIAL_FAILURE", defaults.partial_failure),
        }
    }
}
