// dayschedule-sync/src/config/mod.rs
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::errors::AppError;

pub const DEFAULT_BASE_URL: &str = "https://api.dayschedule.com/v1";
pub const DEFAULT_OUTPUT_FILE: &str = "day_schedule_bookings.json";
pub const DEFAULT_STATE_FILE_NAME: &str = ".day_schedule_sync_state.json";
/// 300ms keeps us under the Enterprise rate limit.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;
pub const TEST_MODE_DEFAULT_LIMIT: usize = 5;

pub const API_KEY_ENV: &str = "DAYSCHEDULE_API_KEY";
pub const BASE_URL_ENV: &str = "DAYSCHEDULE_BASE_URL";

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub output_file: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub request_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub default_interval_minutes: Option<u64>,
}

/// Values picked up from the process environment (after `.env` is loaded).
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let read = |key: &str| match std::env::var(key) {
            Ok(v) if !v.trim().is_empty() => Some(v),
            _ => None,
        };
        EnvOverrides {
            api_key: read(API_KEY_ENV),
            base_url: read(BASE_URL_ENV),
        }
    }
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub api_key: String,
    pub request_delay: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyncMode {
    Incremental,
    Full,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Incremental => f.write_str("incremental"),
            SyncMode::Full => f.write_str("full"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub mode: SyncMode,
    pub limit: Option<usize>,
    pub force: bool,
    pub test_mode: bool,
}

impl SyncOptions {
    /// Builds run options, applying the test-mode default limit.
    pub fn new(
        mode: SyncMode,
        limit: Option<usize>,
        force: bool,
        test_mode: bool,
    ) -> std::result::Result<Self, AppError> {
        if limit == Some(0) {
            return Err(AppError::Config("--limit must be at least 1".to_string()));
        }
        let limit = match (limit, test_mode) {
            (None, true) => Some(TEST_MODE_DEFAULT_LIMIT),
            (limit, _) => limit,
        };
        Ok(SyncOptions {
            mode,
            limit,
            force,
            test_mode,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub sync: SyncOptions,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub enum OperationConfig {
    Sync(SyncOptions),
    Schedule(ScheduleConfig),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub operation: Option<OperationConfig>,
    pub api: ApiConfig,
    pub output_file: PathBuf,
    pub state_file: PathBuf,
    pub default_interval: Duration,
}

impl AppConfig {
    /// Reads `config.json` if it exists; a missing file means "use defaults".
    pub fn load_from_json(config_path: &Path, env: &EnvOverrides) -> Result<Self> {
        let raw_json_config = if config_path.exists() {
            let config_content = fs::read_to_string(config_path).with_context(|| {
                format!("Failed to read config file at {}", config_path.display())
            })?;
            serde_json::from_str::<RawJsonConfig>(&config_content).with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?
        } else {
            info!(path = %config_path.display(), "no config file found, using defaults and environment");
            RawJsonConfig::default()
        };

        Ok(Self::from_raw(raw_json_config, env)?)
    }

    pub fn from_raw(raw: RawJsonConfig, env: &EnvOverrides) -> std::result::Result<Self, AppError> {
        let api_key = env
            .api_key
            .clone()
            .or(raw.api_key)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "api_key must be set in config.json or via the {} environment variable",
                    API_KEY_ENV
                ))
            })?;

        let base_url_str = env
            .base_url
            .clone()
            .or(raw.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(base_url_str.trim_end_matches('/'))
            .map_err(|e| AppError::Config(format!("invalid base_url '{}': {}", base_url_str, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "base_url '{}' cannot be used as an API base",
                base_url_str
            )));
        }

        let interval_minutes = raw
            .default_interval_minutes
            .unwrap_or(DEFAULT_INTERVAL_MINUTES);
        if interval_minutes == 0 {
            return Err(AppError::Config(
                "default_interval_minutes must be at least 1".to_string(),
            ));
        }

        let output_file = raw
            .output_file
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE));
        let state_file = raw
            .state_file
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| state_file_beside(&output_file));

        Ok(AppConfig {
            operation: None, // To be filled by main after parsing CLI args
            api: ApiConfig {
                base_url,
                api_key,
                request_delay: Duration::from_millis(
                    raw.request_delay_ms.unwrap_or(DEFAULT_REQUEST_DELAY_MS),
                ),
                request_timeout: Duration::from_secs(
                    raw.request_timeout_secs
                        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
                        .max(1),
                ),
            },
            output_file,
            state_file,
            default_interval: minutes(interval_minutes)?,
        })
    }

    /// Points the output somewhere else; the sync state follows it unless it was set explicitly.
    pub fn override_output_file(&mut self, output_file: PathBuf) {
        if self.state_file == state_file_beside(&self.output_file) {
            self.state_file = state_file_beside(&output_file);
        }
        self.output_file = output_file;
    }
}

pub fn load_schedule_config(
    app_config: &AppConfig,
    sync: SyncOptions,
    interval_minutes: Option<u64>,
) -> std::result::Result<ScheduleConfig, AppError> {
    let interval = match interval_minutes {
        Some(0) => {
            return Err(AppError::Config("--interval must be at least 1 minute".to_string()));
        }
        Some(m) => minutes(m)?,
        None => app_config.default_interval,
    };
    Ok(ScheduleConfig { sync, interval })
}

fn minutes(m: u64) -> std::result::Result<Duration, AppError> {
    m.checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| AppError::Config(format!("Interval of {} minutes is too large", m)))
}

fn state_file_beside(output_file: &Path) -> PathBuf {
    match output_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(DEFAULT_STATE_FILE_NAME),
        _ => PathBuf::from(DEFAULT_STATE_FILE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env_with_key() -> EnvOverrides {
        EnvOverrides {
            api_key: Some("env-key".to_string()),
            base_url: None,
        }
    }

    #[test]
    fn test_defaults_when_only_api_key_given() -> anyhow::Result<()> {
        let config = AppConfig::from_raw(RawJsonConfig::default(), &env_with_key())?;

        assert_eq!(config.api.api_key, "env-key");
        assert_eq!(config.api.base_url.as_str(), "https://api.dayschedule.com/v1");
        assert_eq!(config.output_file, PathBuf::from(DEFAULT_OUTPUT_FILE));
        assert_eq!(config.state_file, PathBuf::from(DEFAULT_STATE_FILE_NAME));
        assert_eq!(config.api.request_delay, Duration::from_millis(300));
        assert_eq!(config.default_interval, Duration::from_secs(3600));
        Ok(())
    }

    #[test]
    fn test_env_overrides_file_values() -> anyhow::Result<()> {
        let raw: RawJsonConfig = serde_json::from_value(json!({
            "api_key": "file-key",
            "base_url": "https://file.example.com/v1"
        }))?;
        let env = EnvOverrides {
            api_key: Some("env-key".to_string()),
            base_url: Some("http://127.0.0.1:9999/v1/".to_string()),
        };
        let config = AppConfig::from_raw(raw, &env)?;

        assert_eq!(config.api.api_key, "env-key");
        assert_eq!(config.api.base_url.as_str(), "http://127.0.0.1:9999/v1");
        Ok(())
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let raw: RawJsonConfig = serde_json::from_value(json!({ "api_key": "   " })).unwrap();
        let err = AppConfig::from_raw(raw, &EnvOverrides::default()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let env = EnvOverrides {
            api_key: Some("k".to_string()),
            base_url: Some("not a url".to_string()),
        };
        let err = AppConfig::from_raw(RawJsonConfig::default(), &env).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_state_file_follows_output_directory() -> anyhow::Result<()> {
        let raw: RawJsonConfig = serde_json::from_value(json!({
            "output_file": "data/bookings.json"
        }))?;
        let mut config = AppConfig::from_raw(raw, &env_with_key())?;
        assert_eq!(config.state_file, PathBuf::from("data/.day_schedule_sync_state.json"));

        config.override_output_file(PathBuf::from("elsewhere/out.json"));
        assert_eq!(config.output_file, PathBuf::from("elsewhere/out.json"));
        assert_eq!(config.state_file, PathBuf::from("elsewhere/.day_schedule_sync_state.json"));
        Ok(())
    }

    #[test]
    fn test_explicit_state_file_is_kept_on_output_override() -> anyhow::Result<()> {
        let raw: RawJsonConfig = serde_json::from_value(json!({
            "state_file": "/var/lib/sync/state.json"
        }))?;
        let mut config = AppConfig::from_raw(raw, &env_with_key())?;
        config.override_output_file(PathBuf::from("out.json"));
        assert_eq!(config.state_file, PathBuf::from("/var/lib/sync/state.json"));
        Ok(())
    }

    #[test]
    fn test_sync_options_test_mode_defaults_limit() -> anyhow::Result<()> {
        let opts = SyncOptions::new(SyncMode::Full, None, false, true)?;
        assert_eq!(opts.limit, Some(TEST_MODE_DEFAULT_LIMIT));

        let opts = SyncOptions::new(SyncMode::Full, Some(12), false, true)?;
        assert_eq!(opts.limit, Some(12));

        let opts = SyncOptions::new(SyncMode::Incremental, None, false, false)?;
        assert_eq!(opts.limit, None);
        Ok(())
    }

    #[test]
    fn test_zero_limit_and_interval_rejected() -> anyhow::Result<()> {
        assert!(SyncOptions::new(SyncMode::Full, Some(0), false, false).is_err());

        let config = AppConfig::from_raw(RawJsonConfig::default(), &env_with_key())?;
        let sync = SyncOptions::new(SyncMode::Full, None, false, false)?;
        assert!(load_schedule_config(&config, sync.clone(), Some(0)).is_err());

        let schedule = load_schedule_config(&config, sync, Some(5))?;
        assert_eq!(schedule.interval, Duration::from_secs(300));
        Ok(())
    }

    #[test]
    fn test_oversized_interval_is_config_error() -> anyhow::Result<()> {
        let config = AppConfig::from_raw(RawJsonConfig::default(), &env_with_key())?;
        let sync = SyncOptions::new(SyncMode::Full, None, false, false)?;
        let err = load_schedule_config(&config, sync.clone(), Some(u64::MAX / 2)).unwrap_err();
        assert!(err.is_fatal());

        let max = u64::MAX / 60;
        let schedule = load_schedule_config(&config, sync, Some(max))?;
        assert_eq!(schedule.interval, Duration::from_secs(max * 60));

        let raw = RawJsonConfig {
            default_interval_minutes: Some(u64::MAX),
            ..Default::default()
        };
        assert!(matches!(
            AppConfig::from_raw(raw, &env_with_key()),
            Err(AppError::Config(_))
        ));
        Ok(())
    }

    #[test]
    fn test_load_from_json_without_file_uses_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = AppConfig::load_from_json(&dir.path().join("config.json"), &env_with_key())?;
        assert_eq!(config.output_file, PathBuf::from(DEFAULT_OUTPUT_FILE));
        Ok(())
    }

    #[test]
    fn test_load_from_json_reads_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "api_key": "from-file", "request_delay_ms": 0, "default_interval_minutes": 15 }"#,
        )?;
        let config = AppConfig::load_from_json(&path, &EnvOverrides::default())?;
        assert_eq!(config.api.api_key, "from-file");
        assert_eq!(config.api.request_delay, Duration::ZERO);
        assert_eq!(config.default_interval, Duration::from_secs(900));
        Ok(())
    }
}
