use std::path::{Path, PathBuf};
use tracing::{info, warn};

use switchboard_core::{Result, SwitchboardError};

use crate::schema::{GatewayConfig, WarningSeverity};

const CONFIG_FILE_NAME: &str = "switchboard.toml";

/// Loads the gateway configuration once at startup.
///
/// The provider registry is built from this snapshot and never changes shape,
/// so there is no reload path.
pub struct ConfigLoader {
    config: GatewayConfig,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > SWITCHBOARD_CONFIG env >
    /// ./switchboard.toml > ~/.switchboard/switchboard.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("SWITCHBOARD_CONFIG") {
            return PathBuf::from(p);
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".switchboard")
            .join(CONFIG_FILE_NAME)
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            Self::parse(&raw).map_err(|e| {
                SwitchboardError::Config(format!("failed to parse {}: {}", config_path.display(), e))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            GatewayConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        // Validate config — fail on the first error, log the rest
        let warnings = config.warnings();
        let mut errors = warnings.iter().filter(|w| w.severity == WarningSeverity::Error);
        if let Some(first) = errors.next() {
            let reason = match errors.count() {
                0 => first.message.clone(),
                more => format!("{} (and {more} more)", first.message),
            };
            return Err(SwitchboardError::ConfigValidation {
                field: first.field.clone(),
                reason,
            });
        }
        for w in &warnings {
            warn!("{}", w);
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Parse a TOML document without touching the filesystem or environment.
    pub fn parse(raw: &str) -> std::result::Result<GatewayConfig, toml::de::Error> {
        toml::from_str::<GatewayConfig>(raw)
    }

    /// Get a snapshot of the loaded config.
    pub fn get(&self) -> GatewayConfig {
        self.config.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Path the config was resolved from (may not exist).
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (SWITCHBOARD_LOG_LEVEL, SWITCHBOARD_MAX_RETRIES, etc.)
    pub fn apply_env_overrides(config: GatewayConfig) -> GatewayConfig {
        Self::apply_overrides_from(config, |var| std::env::var(var).ok())
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an injectable lookup.
    pub fn apply_overrides_from(
        mut config: GatewayConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> GatewayConfig {
        if let Some(v) = lookup("SWITCHBOARD_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = lookup("SWITCHBOARD_LOG_FORMAT") {
            config.logging.format = v;
        }
        if let Some(v) = lookup("SWITCHBOARD_MAX_RETRIES") {
            match v.parse::<u32>() {
                Ok(n) => config.routing.max_retries = n,
                Err(_) => warn!(value = %v, "ignoring non-numeric SWITCHBOARD_MAX_RETRIES"),
            }
        }
        config
    }
}
