//! Configuration file support for Interlock
//!
//! Loads assessment and analyst settings from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.interlockrc.json` in the working directory
//! 3. `interlock.config.json` in the working directory
//!
//! All fields are optional. Environment variables override file values and
//! CLI flags override both.

use crate::analysis::AssessOptions;
use crate::charges::ChargeMode;
use crate::rate_limit::{RateLimitConfig, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
use crate::risk::RiskThresholds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Value shipped in sample env files; treated as no key
const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

/// Interlock configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterlockConfig {
    /// How unknown additional charges are handled (default: lenient)
    #[serde(default)]
    pub charge_mode: Option<ChargeMode>,

    /// Cut points for the displayed risk level
    #[serde(default)]
    pub risk_thresholds: Option<RiskThresholdConfig>,

    /// Live analyst settings
    #[serde(default)]
    pub ai: Option<AiConfig>,

    /// Live analyst call budget
    #[serde(default)]
    pub rate_limit: Option<RateLimitFileConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskThresholdConfig {
    /// BAC for medium risk (default: 0.08)
    pub medium_bac: Option<f64>,
    /// BAC for high risk (default: 0.15)
    pub high_bac: Option<f64>,
    /// Prior offenses for medium risk (default: 1)
    pub medium_priors: Option<i64>,
    /// Prior offenses for high risk (default: 2)
    pub high_priors: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitFileConfig {
    pub window_ms: Option<u64>,
    pub max_requests: Option<u32>,
}

/// Live analyst settings after defaults and environment are applied
#[derive(Clone, PartialEq, Serialize)]
pub struct AiSettings {
    pub endpoint: String,
    pub model: String,
    #[serde(serialize_with = "serialize_millis")]
    pub timeout: Duration,
    pub max_tokens: u32,
    /// Only ever read from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiSettings")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Resolved configuration ready for use
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub charge_mode: ChargeMode,
    pub risk_thresholds: RiskThresholds,
    pub ai: AiSettings,
    pub rate_limit: RateLimitConfig,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

/// Whole milliseconds, saturating at `u64::MAX`
pub(crate) fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(duration_millis(*d))
}

impl InterlockConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref t) = self.risk_thresholds {
            let defaults = RiskThresholds::default();
            let medium_bac = t.medium_bac.unwrap_or(defaults.medium_bac);
            let high_bac = t.high_bac.unwrap_or(defaults.high_bac);
            let medium_priors = t.medium_priors.unwrap_or(defaults.medium_priors);
            let high_priors = t.high_priors.unwrap_or(defaults.high_priors);

            for (name, v) in [("medium_bac", medium_bac), ("high_bac", high_bac)] {
                if !v.is_finite() || v <= 0.0 {
                    anyhow::bail!("risk_thresholds.{} must be positive (got {})", name, v);
                }
            }
            if medium_bac >= high_bac {
                anyhow::bail!(
                    "risk_thresholds.medium_bac ({}) must be less than risk_thresholds.high_bac ({})",
                    medium_bac,
                    high_bac
                );
            }
            for (name, v) in [("medium_priors", medium_priors), ("high_priors", high_priors)] {
                if v < 1 {
                    anyhow::bail!("risk_thresholds.{} must be at least 1 (got {})", name, v);
                }
            }
            if medium_priors > high_priors {
                anyhow::bail!(
                    "risk_thresholds.medium_priors ({}) must not exceed risk_thresholds.high_priors ({})",
                    medium_priors,
                    high_priors
                );
            }
        }

        if let Some(ref ai) = self.ai {
            if ai.timeout_ms == Some(0) {
                anyhow::bail!("ai.timeout_ms must be positive");
            }
            if ai.max_tokens == Some(0) {
                anyhow::bail!("ai.max_tokens must be positive");
            }
            if let Some(ref endpoint) = ai.endpoint {
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    anyhow::bail!("ai.endpoint must be an http(s) URL (got {})", endpoint);
                }
            }
        }

        if let Some(ref rl) = self.rate_limit {
            if rl.window_ms == Some(0) {
                anyhow::bail!("rate_limit.window_ms must be positive");
            }
            if rl.max_requests == Some(0) {
                anyhow::bail!("rate_limit.max_requests must be positive");
            }
        }

        Ok(())
    }

    /// Resolve config, filling defaults for absent fields
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let defaults = RiskThresholds::default();
        let risk_thresholds = match &self.risk_thresholds {
            Some(t) => RiskThresholds {
                medium_bac: t.medium_bac.unwrap_or(defaults.medium_bac),
                high_bac: t.high_bac.unwrap_or(defaults.high_bac),
                medium_priors: t.medium_priors.unwrap_or(defaults.medium_priors),
                high_priors: t.high_priors.unwrap_or(defaults.high_priors),
            },
            None => defaults,
        };

        let ai = self.ai.as_ref();
        let rate_limit = self.rate_limit.as_ref();

        Ok(ResolvedConfig {
            charge_mode: self.charge_mode.unwrap_or_default(),
            risk_thresholds,
            ai: AiSettings {
                endpoint: ai
                    .and_then(|a| a.endpoint.clone())
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                model: ai
                    .and_then(|a| a.model.clone())
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout: Duration::from_millis(
                    ai.and_then(|a| a.timeout_ms).unwrap_or(DEFAULT_TIMEOUT_MS),
                ),
                max_tokens: ai.and_then(|a| a.max_tokens).unwrap_or(DEFAULT_MAX_TOKENS),
                api_key: None,
            },
            rate_limit: RateLimitConfig {
                window: rate_limit
                    .and_then(|r| r.window_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_WINDOW),
                max_requests: rate_limit
                    .and_then(|r| r.max_requests)
                    .unwrap_or(DEFAULT_MAX_REQUESTS),
            },
            config_path: None,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        InterlockConfig::default().resolve()
    }

    pub fn assess_options(&self) -> AssessOptions {
        AssessOptions {
            charge_mode: self.charge_mode,
            risk_thresholds: self.risk_thresholds,
        }
    }

    /// A usable live analyst key, if one is configured
    pub fn api_key(&self) -> Option<&str> {
        self.ai
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != PLACEHOLDER_API_KEY)
    }

    /// Apply environment overrides read through `lookup`
    ///
    /// Numeric values that fail to parse, or parse to zero, are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("AI_API_KEY") {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = lookup("AI_MODEL").filter(|m| !m.trim().is_empty()) {
            self.ai.model = model.trim().to_string();
        }
        if let Some(endpoint) = lookup("AI_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            self.ai.endpoint = endpoint.trim().to_string();
        }
        if let Some(ms) = parse_env::<u64>("AI_TIMEOUT_MS", lookup("AI_TIMEOUT_MS")) {
            if ms > 0 {
                self.ai.timeout = Duration::from_millis(ms);
            }
        }
        if let Some(ms) = parse_env::<u64>("AI_RATE_LIMIT_WINDOW", lookup("AI_RATE_LIMIT_WINDOW")) {
            if ms > 0 {
                self.rate_limit.window = Duration::from_millis(ms);
            }
        }
        if let Some(max) = parse_env::<u32>("AI_RATE_LIMIT_MAX", lookup("AI_RATE_LIMIT_MAX")) {
            if max > 0 {
                self.rate_limit.max_requests = max;
            }
        }
    }
}

/// Discover and load a config file from a directory
///
/// Search order:
/// 1. `.interlockrc.json`
/// 2. `interlock.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(dir: &Path) -> Result<Option<(InterlockConfig, PathBuf)>> {
    for name in [".interlockrc.json", "interlock.config.json"] {
        let path = dir.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<InterlockConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: InterlockConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config, then apply the process environment
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `dir`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(dir: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    load_and_resolve_with_env(dir, config_path, |name| std::env::var(name).ok())
}

/// Same as [`load_and_resolve`] with an explicit environment lookup
pub fn load_and_resolve_with_env<F>(
    dir: &Path,
    config_path: Option<&Path>,
    lookup: F,
) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(dir)? {
            Some((config, path)) => (config, Some(path)),
            None => (InterlockConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    resolved.apply_env(lookup);
    Ok(resolved)
}
