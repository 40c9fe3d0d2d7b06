//! Scheduler configuration structures.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;

/// What happens once a task has failed on every live client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionPolicy {
    /// Fail the task with `ExclusionExhausted`.
    #[default]
    Exhaust,
    /// Forget the task's exclusions and keep retrying until its budget runs out.
    Recycle,
}

impl FromStr for ExclusionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exhaust" => Ok(Self::Exhaust),
            "recycle" => Ok(Self::Recycle),
            other => Err(format!("unknown exclusion policy `{other}`")),
        }
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Attempts budget applied to every task.
    pub attempts: u32,
    /// Behaviour when a task has been excluded from every live client.
    #[serde(default)]
    pub exclusion: ExclusionPolicy,
    /// How long the dispatcher waits for a client before logging a stall.
    #[serde(default)]
    pub acquire_timeout_ms: Option<u64>,
    /// Worker threads for `run_blocking`; defaults to the CPU count.
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            exclusion: ExclusionPolicy::default(),
            acquire_timeout_ms: None,
            worker_threads: None,
        }
    }
}

const ENV_ATTEMPTS: &str = "RETRY_LOT_ATTEMPTS";
const ENV_EXCLUSION: &str = "RETRY_LOT_EXCLUSION";
const ENV_ACQUIRE_TIMEOUT_MS: &str = "RETRY_LOT_ACQUIRE_TIMEOUT_MS";
const ENV_WORKER_THREADS: &str = "RETRY_LOT_WORKER_THREADS";

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` describing the first offending field.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.attempts == 0 {
            return Err(SchedulerError::InvalidConfig(
                "attempts must be greater than 0".into(),
            ));
        }
        if self.acquire_timeout_ms == Some(0) {
            return Err(SchedulerError::InvalidConfig(
                "acquire_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(SchedulerError::InvalidConfig(
                "worker_threads must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Stall warning interval as a `Duration`.
    #[must_use]
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// Worker threads to use for a dedicated runtime.
    #[must_use]
    pub fn worker_threads_or_default(&self) -> usize {
        self.worker_threads.unwrap_or_else(num_cpus::get)
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` on malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `RETRY_LOT_*` environment variables, loading a
    /// `.env` file first if present. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` if a variable fails to parse or the
    /// result does not validate.
    pub fn from_env() -> Result<Self, SchedulerError> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        if let Some(attempts) = env_var(ENV_ATTEMPTS)? {
            cfg.attempts = attempts;
        }
        if let Some(exclusion) = env_var(ENV_EXCLUSION)? {
            cfg.exclusion = exclusion;
        }
        cfg.acquire_timeout_ms = env_var(ENV_ACQUIRE_TIMEOUT_MS)?.or(cfg.acquire_timeout_ms);
        cfg.worker_threads = env_var(ENV_WORKER_THREADS)?.or(cfg.worker_threads);
        cfg.validate()?;
        Ok(cfg)
    }
}

fn env_var<T>(name: &str) -> Result<Option<T>, SchedulerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| SchedulerError::InvalidConfig(format!("{name}: {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = SchedulerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.exclusion, ExclusionPolicy::Exhaust);
        assert!(cfg.acquire_timeout().is_none());
    }

    #[test]
    fn test_exclusion_policy_from_str() {
        assert_eq!("Recycle".parse::<ExclusionPolicy>(), Ok(ExclusionPolicy::Recycle));
        assert_eq!(" exhaust ".parse::<ExclusionPolicy>(), Ok(ExclusionPolicy::Exhaust));
        assert!("never".parse::<ExclusionPolicy>().is_err());
    }

    #[test]
    fn test_worker_threads_default_to_cpu_count() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.worker_threads_or_default(), num_cpus::get());
        let cfg = SchedulerConfig {
            worker_threads: Some(2),
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.worker_threads_or_default(), 2);
    }
}
