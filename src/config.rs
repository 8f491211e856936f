//! Runtime configuration from environment variables (and `.env`).
//!
//! [`Config::from_lookup`] is pure over a key lookup; [`Config::from_env`]
//! plugs in the process environment after `dotenvy` has loaded `.env`.

use std::time::Duration;

use crate::llm::AwsCredentials;
use crate::pipeline::PipelineSettings;
use crate::trigger::{parse_key, KeyCode, PointerButton, TriggerSettings};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";
pub const DEFAULT_BEDROCK_MODEL: &str = "us.anthropic.claude-sonnet-4-5-20250929-v1:0";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_MAX_TOKENS: u32 = 16_000;
pub const DEFAULT_CAPTURE_MONITOR: usize = 1;
pub const DEFAULT_NOTIFY_MONITOR: usize = 2;
pub const DEFAULT_NOTIFY_DURATION_MS: u64 = 4_000;
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TRIGGER_KEY: &str = "Tab";
pub const DEFAULT_TRIGGER_BUTTON: &str = "Side1";
pub const DEFAULT_FOREGROUND_EXE: &str = "overwatch.exe";

/// Which vision backend to call, with its credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Anthropic { api_key: String, model: String },
    Bedrock { credentials: AwsCredentials, region: String, model: String },
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Anthropic { api_key, model } => f
                .debug_struct("Anthropic")
                .field("api_key", &format!("<{} chars>", api_key.len()))
                .field("model", model)
                .finish(),
            BackendConfig::Bedrock { credentials, region, model } => f
                .debug_struct("Bedrock")
                .field("credentials", credentials)
                .field("region", region)
                .field("model", model)
                .finish(),
        }
    }
}

impl BackendConfig {
    pub fn model(&self) -> &str {
        match self {
            BackendConfig::Anthropic { model, .. } | BackendConfig::Bedrock { model, .. } => model,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub max_tokens: u32,
    pub capture_monitor: usize,
    pub notify_monitor: usize,
    pub notify_duration: Duration,
    pub analysis_timeout: Duration,
    pub trigger_key: KeyCode,
    pub trigger_button: PointerButton,
    /// Lowercase executable name; `None` disables the foreground filter.
    pub foreground_exe: Option<String>,
    pub require_scoreboard: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No API credentials: set ANTHROPIC_API_KEY, or AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY")]
    MissingCredentials,

    #[error("{0} is required for the selected backend")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => log::info!("[CONFIG] Loaded {}", path.display()),
            Err(e) if e.not_found() => log::debug!("[CONFIG] No .env file"),
            Err(e) => log::warn!("[CONFIG] Ignoring unreadable .env: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = backend_from(&get)?;

        let max_tokens = parse_number::<u32>("OWL_MAX_TOKENS", get("OWL_MAX_TOKENS"), DEFAULT_MAX_TOKENS)?;
        if max_tokens == 0 {
            return Err(invalid("OWL_MAX_TOKENS", "0", "must be positive"));
        }
        let capture_monitor =
            parse_monitor("OWL_CAPTURE_MONITOR", get("OWL_CAPTURE_MONITOR"), DEFAULT_CAPTURE_MONITOR)?;
        let notify_monitor =
            parse_monitor("OWL_NOTIFY_MONITOR", get("OWL_NOTIFY_MONITOR"), DEFAULT_NOTIFY_MONITOR)?;
        if notify_monitor == capture_monitor {
            return Err(invalid(
                "OWL_NOTIFY_MONITOR",
                &notify_monitor.to_string(),
                "must differ from OWL_CAPTURE_MONITOR",
            ));
        }
        let notify_ms = parse_number::<u64>(
            "OWL_NOTIFY_DURATION_MS",
            get("OWL_NOTIFY_DURATION_MS"),
            DEFAULT_NOTIFY_DURATION_MS,
        )?;
        let timeout_secs = parse_number::<u64>(
            "OWL_ANALYSIS_TIMEOUT_SECS",
            get("OWL_ANALYSIS_TIMEOUT_SECS"),
            DEFAULT_ANALYSIS_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(invalid("OWL_ANALYSIS_TIMEOUT_SECS", "0", "must be positive"));
        }

        let key_name = get("OWL_TRIGGER_KEY").unwrap_or_else(|| DEFAULT_TRIGGER_KEY.to_string());
        let trigger_key = parse_key(&key_name)
            .ok_or_else(|| invalid("OWL_TRIGGER_KEY", &key_name, "unknown key name"))?;

        let button_name = get("OWL_TRIGGER_BUTTON").unwrap_or_else(|| DEFAULT_TRIGGER_BUTTON.to_string());
        let trigger_button = button_name
            .parse::<PointerButton>()
            .map_err(|reason| invalid("OWL_TRIGGER_BUTTON", &button_name, &reason))?;

        // Unset means the default; set-but-blank disables the filter.
        let foreground_exe = match lookup("OWL_FOREGROUND_EXE") {
            None => Some(DEFAULT_FOREGROUND_EXE.to_string()),
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_lowercase()),
        };

        let require_scoreboard = match get("OWL_REQUIRE_SCOREBOARD") {
            None => false,
            Some(v) => parse_bool(&v).ok_or_else(|| invalid("OWL_REQUIRE_SCOREBOARD", &v, "expected true or false"))?,
        };

        Ok(Config {
            backend,
            max_tokens,
            capture_monitor,
            notify_monitor,
            notify_duration: Duration::from_millis(notify_ms),
            analysis_timeout: Duration::from_secs(timeout_secs),
            trigger_key,
            trigger_button,
            foreground_exe,
            require_scoreboard,
        })
    }

    pub fn trigger_settings(&self) -> TriggerSettings {
        TriggerSettings {
            modifier: self.trigger_key,
            button: self.trigger_button,
            foreground_exe: self.foreground_exe.clone(),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            capture_monitor: self.capture_monitor,
            max_tokens: self.max_tokens,
            analysis_timeout: self.analysis_timeout,
            require_scoreboard: self.require_scoreboard,
        }
    }
}

fn backend_from<G>(get: &G) -> Result<BackendConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let choice = get("OWL_BACKEND").map(|v| v.to_lowercase());
    let use_bedrock = match choice.as_deref() {
        Some("anthropic") => false,
        Some("bedrock") => true,
        Some(other) => return Err(invalid("OWL_BACKEND", other, "expected anthropic or bedrock")),
        None if get("ANTHROPIC_API_KEY").is_some() => false,
        None if get("AWS_ACCESS_KEY_ID").is_some() && get("AWS_SECRET_ACCESS_KEY").is_some() => true,
        None => return Err(ConfigError::MissingCredentials),
    };

    if use_bedrock {
        let access_key_id = get("AWS_ACCESS_KEY_ID").ok_or(ConfigError::Missing("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key =
            get("AWS_SECRET_ACCESS_KEY").ok_or(ConfigError::Missing("AWS_SECRET_ACCESS_KEY"))?;
        Ok(BackendConfig::Bedrock {
            credentials: AwsCredentials {
                access_key_id,
                secret_access_key,
                session_token: get("AWS_SESSION_TOKEN"),
            },
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            model: get("BEDROCK_MODEL").unwrap_or_else(|| DEFAULT_BEDROCK_MODEL.to_string()),
        })
    } else {
        Ok(BackendConfig::Anthropic {
            api_key: get("ANTHROPIC_API_KEY").ok_or(ConfigError::Missing("ANTHROPIC_API_KEY"))?,
            model: get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
        })
    }
}

fn parse_number<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.parse::<T>().map_err(|e| invalid(key, &v, &e.to_string())),
    }
}

fn parse_monitor(key: &'static str, raw: Option<String>, default: usize) -> Result<usize, ConfigError> {
    let index = parse_number::<usize>(key, raw, default)?;
    if index == 0 {
        return Err(invalid(key, "0", "monitor indices start at 1"));
    }
    Ok(index)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
