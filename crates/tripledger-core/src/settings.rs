//! Runtime settings
//!
//! Settings are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tripledger/config/settings.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! A handful of environment variables override individual values afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Embedded default settings (compiled into binary)
const DEFAULT_SETTINGS: &str = include_str!("../../../config/settings.toml");

/// Structured document extraction endpoints
#[derive(Debug, Clone, Default)]
pub struct ExtractionSettings {
    pub document_ai_url: Option<String>,
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Timeout for a single AI text/vision call
    pub ai_timeout: Duration,
    /// Backoff for description generation
    pub retry: RetryPolicy,
    /// Timeout for downloading a report template
    pub template_timeout: Duration,
    pub default_currency: String,
    pub default_mileage_rate: f64,
    pub extraction: ExtractionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ai_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            template_timeout: Duration::from_secs(30),
            default_currency: "USD".to_string(),
            default_mileage_rate: 0.58,
            extraction: ExtractionSettings::default(),
        }
    }
}

impl Settings {
    /// Load from the override file if present, else embedded defaults, then apply env
    pub fn load() -> Result<Self> {
        let mut settings = load_settings(default_settings_path().as_deref())?;
        settings.apply_env();
        Ok(settings)
    }

    /// Load from an explicit path (falls back to embedded defaults if missing)
    pub fn from_path(path: &Path) -> Result<Self> {
        load_settings(Some(path))
    }

    /// Parse settings from TOML content layered over the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_settings(content)
    }

    fn apply_env(&mut self) {
        if let Some(secs) = env_var("TRIPLEDGER_TEMPLATE_TIMEOUT_SECS").and_then(|s| s.parse().ok())
        {
            self.template_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_var("TRIPLEDGER_AI_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.ai_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = env_var("DOCUMENT_AI_URL") {
            self.extraction.document_ai_url = Some(url);
        }
        if let Some(url) = env_var("DOCUMENT_AI_TOKEN_URL") {
            self.extraction.token_url = Some(url);
        }
        self.extraction.client_id = env_var("DOCUMENT_AI_CLIENT_ID");
        self.extraction.client_secret = env_var("DOCUMENT_AI_CLIENT_SECRET");
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Default settings override path
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tripledger").join("config").join("settings.toml"))
}

fn load_settings(override_path: Option<&Path>) -> Result<Settings> {
    let content = match override_path {
        Some(path) if path.exists() => fs::read_to_string(path)
            .map_err(|e| Error::InvalidData(format!("Failed to read settings: {}", e)))?,
        _ => DEFAULT_SETTINGS.to_string(),
    };

    parse_settings(&content)
}

/// Raw settings structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    ai: Option<RawAi>,
    retry: Option<RawRetry>,
    report: Option<RawReport>,
    extraction: Option<RawExtraction>,
}

#[derive(Debug, Deserialize)]
struct RawAi {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawRetry {
    max_retries: Option<u32>,
    base_delay_ms: Option<u64>,
    factor: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawReport {
    template_timeout_secs: Option<u64>,
    default_currency: Option<String>,
    default_mileage_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    document_ai_url: Option<String>,
    token_url: Option<String>,
}

fn parse_settings(content: &str) -> Result<Settings> {
    let raw: RawSettings = toml::from_str(content)
        .map_err(|e| Error::InvalidData(format!("Invalid settings TOML: {}", e)))?;

    let mut settings = Settings::default();

    if let Some(ai) = raw.ai {
        if let Some(secs) = ai.timeout_secs {
            settings.ai_timeout = Duration::from_secs(secs);
        }
    }

    if let Some(retry) = raw.retry {
        if let Some(max) = retry.max_retries {
            settings.retry.max_retries = max;
        }
        if let Some(ms) = retry.base_delay_ms {
            settings.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(factor) = retry.factor {
            settings.retry.factor = factor.max(1);
        }
    }

    if let Some(report) = raw.report {
        if let Some(secs) = report.template_timeout_secs {
            settings.template_timeout = Duration::from_secs(secs);
        }
        if let Some(currency) = report.default_currency.filter(|c| !c.trim().is_empty()) {
            settings.default_currency = currency.trim().to_uppercase();
        }
        if let Some(rate) = report.default_mileage_rate.filter(|r| *r >= 0.0) {
            settings.default_mileage_rate = rate;
        }
    }

    if let Some(extraction) = raw.extraction {
        settings.extraction.document_ai_url =
            extraction.document_ai_url.filter(|s| !s.trim().is_empty());
        settings.extraction.token_url = extraction.token_url.filter(|s| !s.trim().is_empty());
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let settings = Settings::from_toml(DEFAULT_SETTINGS).unwrap();
        assert_eq!(settings.ai_timeout, Duration::from_secs(30));
        assert_eq!(settings.retry.max_retries, 2);
        assert_eq!(settings.retry.base_delay, Duration::from_millis(500));
        assert_eq!(settings.retry.factor, 2);
        assert_eq!(settings.default_currency, "USD");
        assert!((settings.default_mileage_rate - 0.58).abs() < f64::EPSILON);
        assert!(settings.extraction.document_ai_url.is_none());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            [report]
            default_currency = "eur"
            "#,
        )
        .unwrap();
        assert_eq!(settings.default_currency, "EUR");
        assert_eq!(settings.template_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Settings::from_toml("[report\nbroken").is_err());
    }

    #[test]
    fn test_missing_override_file_uses_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_path(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings.retry.max_retries, 2);
    }
}
