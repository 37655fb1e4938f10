use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

use crate::session::SessionConfig;

/// Environment variable consulted when the config carries no token.
pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordSection,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub rps: RpsConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::sf_serde::Error),

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("unclosed variable reference '${{' (missing '}}')")]
    UnclosedVarReference,

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path.as_ref()).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let expanded = expand_env_vars(&contents)?;
        let config: Config = serde_saphyr::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Bot token from the config, or from `BOT_TOKEN` in the environment.
    pub fn bot_token(&self) -> Option<String> {
        self.discord
            .bot_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                std::env::var(BOT_TOKEN_ENV)
                    .ok()
                    .filter(|t| !t.trim().is_empty())
            })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.composer.enabled {
            check_app("composer", &self.composer.trigger, self.composer.timeout_seconds)?;
            if self.composer.modal_timeout_seconds == 0 {
                return Err(ConfigError::Invalid(
                    "composer.modal_timeout_seconds must be positive".to_string(),
                ));
            }
            if self.composer.modal_timeout_seconds >= self.composer.timeout_seconds {
                return Err(ConfigError::Invalid(
                    "composer.modal_timeout_seconds must be shorter than timeout_seconds"
                        .to_string(),
                ));
            }
        }
        if self.rps.enabled {
            check_app("rps", &self.rps.trigger, self.rps.timeout_seconds)?;
        }
        if self.composer.enabled && self.rps.enabled && self.composer.trigger == self.rps.trigger
        {
            return Err(ConfigError::Invalid(format!(
                "composer and rps share the trigger '{}'",
                self.rps.trigger
            )));
        }
        Ok(())
    }
}

fn check_app(name: &str, trigger: &str, timeout_seconds: u64) -> Result<(), ConfigError> {
    if trigger.is_empty() {
        return Err(ConfigError::Invalid(format!("{name}.trigger must not be empty")));
    }
    if timeout_seconds == 0 {
        return Err(ConfigError::Invalid(format!(
            "{name}.timeout_seconds must be positive"
        )));
    }
    Ok(())
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}`, `${VAR:-default}` and `$$` in `input`.
///
/// A `$` not followed by `{` or `$` is kept as is. Nested references are not
/// supported.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        output.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            output.push('$');
            rest = tail;
        } else if let Some(body) = after.strip_prefix('{') {
            let end = body.find('}').ok_or(ConfigError::UnclosedVarReference)?;
            output.push_str(&resolve_var(&body[..end])?);
            rest = &body[end + 1..];
        } else {
            output.push('$');
            rest = after;
        }
    }

    output.push_str(rest);
    Ok(output)
}

/// Resolve the inside of a `${...}` reference.
fn resolve_var(reference: &str) -> Result<String, ConfigError> {
    let (name, default) = match reference.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (reference, None),
    };

    match (std::env::var(name), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_string()),
        (Err(_), None) => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DiscordSection {
    #[serde(default)]
    pub bot_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComposerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_composer_trigger")]
    pub trigger: String,
    #[serde(default = "default_composer_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_modal_timeout")]
    pub modal_timeout_seconds: u64,
}

impl ComposerConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(Duration::from_secs(self.timeout_seconds))
            .with_modal_timeout(Duration::from_secs(self.modal_timeout_seconds))
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger: default_composer_trigger(),
            timeout_seconds: default_composer_timeout(),
            modal_timeout_seconds: default_modal_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rps_trigger")]
    pub trigger: String,
    #[serde(default = "default_rps_timeout")]
    pub timeout_seconds: u64,
}

impl RpsConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(Duration::from_secs(self.timeout_seconds))
    }
}

impl Default for RpsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger: default_rps_trigger(),
            timeout_seconds: default_rps_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_composer_trigger() -> String {
    "miru".to_string()
}

fn default_composer_timeout() -> u64 {
    240
}

fn default_modal_timeout() -> u64 {
    120
}

fn default_rps_trigger() -> String {
    "rps".to_string()
}

fn default_rps_timeout() -> u64 {
    30
}
