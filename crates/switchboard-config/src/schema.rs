use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Provider `type` tags understood by the registry.
pub const KNOWN_PROVIDER_TYPES: &[&str] = &["remote-http", "openai", "local", "local-execution", "g4f"];

const REMOTE_PROVIDER_TYPES: &[&str] = &["remote-http", "openai"];

/// Type tags match case-insensitively, as the registry does.
fn tag_in(tags: &[&str], tag: &str) -> bool {
    tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Root configuration — maps to `switchboard.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub routing: RoutingConfig,
    pub logging: LoggingConfig,
    /// Ordered provider descriptors. Order defines the rotation order.
    pub providers: Vec<ProviderConfig>,
}

// ── Routing ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Maximum attempts per request. Also capped by the number of providers.
    pub max_retries: u32,
    /// Consecutive failures after which a provider is skipped by selection.
    pub failure_threshold: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            failure_threshold: 3,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
    /// Log file path (None = stderr only).
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
            file: None,
        }
    }
}

// ── Providers ──────────────────────────────────────────────────

/// One backend descriptor from `[[providers]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name, used in logs and error summaries.
    pub name: String,
    /// Backend type: "remote-http" (alias "openai") or "local" (aliases "local-execution", "g4f").
    #[serde(rename = "type")]
    pub provider_type: String,
    /// Models this provider serves. `"*"` accepts any model.
    #[serde(default)]
    pub models: Vec<String>,
    /// Whether this provider is registered at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Backend-specific connection settings (base_url, api_key, api_key_env, timeout_secs, ...)
    #[serde(flatten)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, provider_type: impl Into<String>, models: &[&str]) -> Self {
        Self {
            name: name.into(),
            provider_type: provider_type.into(),
            models: models.iter().map(|m| m.to_string()).collect(),
            enabled: true,
            settings: HashMap::new(),
        }
    }

    /// Add a connection setting (builder style).
    pub fn with_setting(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.settings.insert(key.to_string(), value.into());
        self
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }

    pub fn setting_u64(&self, key: &str) -> Option<u64> {
        self.settings.get(key).and_then(|v| v.as_u64())
    }

    /// Resolve the credential: an explicit `api_key` wins, otherwise the
    /// environment variable named by `api_key_env` is consulted.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with(|var| std::env::var(var).ok())
    }

    pub fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        if let Some(key) = self.setting_str("api_key")
            && !key.is_empty()
        {
            return Some(key.to_string());
        }
        self.setting_str("api_key_env")
            .and_then(lookup)
            .filter(|k| !k.is_empty())
    }
}

// ── Default for root ───────────────────────────────────────────

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            logging: LoggingConfig::default(),
            providers: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let icon = match self.severity {
            WarningSeverity::Error => "❌",
            WarningSeverity::Warning => "⚠️ ",
            WarningSeverity::Info => "💡",
        };
        write!(f, "{} {}: {}", icon, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

impl GatewayConfig {
    /// Validate the config and return a list of warnings/errors.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let warnings = self.warnings();
        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }

    /// Every finding, hard errors included.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // ── Routing ───
        if self.routing.max_retries == 0 {
            warnings.push(ConfigWarning {
                field: "routing.max_retries".into(),
                message: "max_retries is 0 — no request would ever reach a provider".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 3".into()),
            });
        }
        if self.routing.failure_threshold == 0 {
            warnings.push(ConfigWarning {
                field: "routing.failure_threshold".into(),
                message: "failure_threshold is 0 — every provider would be considered unhealthy".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 3".into()),
            });
        }

        // ── Providers ───
        if self.providers.iter().all(|p| !p.enabled) {
            warnings.push(ConfigWarning {
                field: "providers".into(),
                message: "no providers configured".into(),
                severity: WarningSeverity::Info,
                hint: Some("A default local provider serving every model will be used".into()),
            });
        }

        let mut seen = HashSet::new();
        for (i, p) in self.providers.iter().enumerate() {
            let field = |name: &str| format!("providers[{i}].{name}");

            if p.name.trim().is_empty() {
                warnings.push(ConfigWarning {
                    field: field("name"),
                    message: "provider name is empty".into(),
                    severity: WarningSeverity::Error,
                    hint: Some("Every provider needs a unique name".into()),
                });
            } else if p.enabled && !seen.insert(p.name.as_str()) {
                warnings.push(ConfigWarning {
                    field: field("name"),
                    message: format!("duplicate provider name '{}'", p.name),
                    severity: WarningSeverity::Warning,
                    hint: Some("Only the first provider with this name is registered".into()),
                });
            }

            if !tag_in(KNOWN_PROVIDER_TYPES, &p.provider_type) {
                warnings.push(ConfigWarning {
                    field: field("type"),
                    message: format!("unknown provider type '{}'", p.provider_type),
                    severity: WarningSeverity::Warning,
                    hint: Some(format!("Supported: {}", KNOWN_PROVIDER_TYPES.join(", "))),
                });
            }

            if p.models.is_empty() {
                warnings.push(ConfigWarning {
                    field: field("models"),
                    message: format!("provider '{}' lists no models and will never be selected", p.name),
                    severity: WarningSeverity::Warning,
                    hint: Some("Add model ids, or \"*\" to accept any model".into()),
                });
            }

            if tag_in(REMOTE_PROVIDER_TYPES, &p.provider_type) && p.enabled && p.api_key().is_none() {
                warnings.push(ConfigWarning {
                    field: field("api_key"),
                    message: format!("remote provider '{}' has no API key", p.name),
                    severity: WarningSeverity::Warning,
                    hint: Some("Set api_key, or api_key_env to read it from the environment".into()),
                });
            }

            if p.setting_u64("timeout_secs") == Some(0) {
                warnings.push(ConfigWarning {
                    field: field("timeout_secs"),
                    message: "timeout of 0 seconds — every request would time out".into(),
                    severity: WarningSeverity::Error,
                    hint: Some("Remove it to use the default, or set e.g. 60".into()),
                });
            }
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        warnings
    }
}
