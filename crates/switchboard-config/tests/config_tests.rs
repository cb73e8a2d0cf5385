#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;
    use switchboard_config::ConfigLoader;
    use switchboard_config::schema::*;

    // ── Default tests ──────────────────────────────────────────

    #[test]
    fn test_gateway_config_defaults() {
        let config = GatewayConfig::default();
        assert!(config.providers.is_empty());
        assert_eq!(config.routing.max_retries, 3);
        assert_eq!(config.routing.failure_threshold, 3);
    }

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "pretty");
        assert!(config.file.is_none());
    }

    // ── TOML parsing ───────────────────────────────────────────

    #[test]
    fn test_partial_toml_applies_defaults() {
        let toml_str = r#"
[routing]
max_retries = 5
"#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.routing.max_retries, 5);
        assert_eq!(config.routing.failure_threshold, 3);
        assert_eq!(config.logging.level, "info");
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_provider_descriptors_keep_order_and_settings() {
        let toml_str = r#"
[[providers]]
name = "openai"
type = "remote-http"
models = ["gpt-4o", "gpt-4o-mini"]
base_url = "https://api.openai.com/v1"
api_key = "sk-test"
timeout_secs = 30

[[providers]]
name = "local"
type = "local"
models = ["*"]
enabled = false
"#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.len(), 2);

        let openai = &config.providers[0];
        assert_eq!(openai.name, "openai");
        assert_eq!(openai.provider_type, "remote-http");
        assert_eq!(openai.models, vec!["gpt-4o", "gpt-4o-mini"]);
        assert!(openai.enabled);
        assert_eq!(openai.setting_str("base_url"), Some("https://api.openai.com/v1"));
        assert_eq!(openai.setting_u64("timeout_secs"), Some(30));
        assert_eq!(openai.api_key().as_deref(), Some("sk-test"));
        // Known fields are not duplicated into the flattened settings
        assert!(!openai.settings.contains_key("name"));
        assert!(!openai.settings.contains_key("models"));

        let local = &config.providers[1];
        assert_eq!(local.models, vec!["*"]);
        assert!(!local.enabled);
    }

    #[test]
    fn test_provider_missing_type_is_parse_error() {
        let toml_str = r#"
[[providers]]
name = "nameless"
models = ["*"]
"#;
        assert!(ConfigLoader::parse(toml_str).is_err());
    }

    #[test]
    fn test_api_key_env_lookup() {
        let p = ProviderConfig::new("openai", "remote-http", &["*"])
            .with_setting("api_key_env", "MY_KEY");
        let env: HashMap<&str, &str> = HashMap::from([("MY_KEY", "sk-from-env")]);
        let key = p.api_key_with(|var| env.get(var).map(|v| v.to_string()));
        assert_eq!(key.as_deref(), Some("sk-from-env"));

        // An explicit key wins over the environment
        let p = p.with_setting("api_key", "sk-explicit");
        let key = p.api_key_with(|var| env.get(var).map(|v| v.to_string()));
        assert_eq!(key.as_deref(), Some("sk-explicit"));
    }

    #[test]
    fn test_api_key_absent() {
        let p = ProviderConfig::new("openai", "remote-http", &["*"]);
        assert!(p.api_key_with(|_| None).is_none());
        let p = p.with_setting("api_key", "");
        assert!(p.api_key_with(|_| None).is_none());
    }

    // ── Validation ─────────────────────────────────────────────

    #[test]
    fn test_validate_empty_config_is_info_only() {
        let warnings = GatewayConfig::default().validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "providers");
        assert_eq!(warnings[0].severity, WarningSeverity::Info);
    }

    #[test]
    fn test_validate_zero_retries_is_error() {
        let mut config = GatewayConfig::default();
        config.routing.max_retries = 0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("routing.max_retries"));
    }

    #[test]
    fn test_validate_zero_threshold_is_error() {
        let mut config = GatewayConfig::default();
        config.routing.failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_provider_issues() {
        let mut config = GatewayConfig::default();
        config.providers = vec![
            ProviderConfig::new("a", "local", &["*"]),
            ProviderConfig::new("a", "local", &["*"]),
            ProviderConfig::new("b", "carrier-pigeon", &["*"]),
            ProviderConfig::new("c", "local", &[]),
        ];
        let warnings = config.validate().unwrap();
        let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
        assert!(fields.contains(&"providers[1].name"));
        assert!(fields.contains(&"providers[2].type"));
        assert!(fields.contains(&"providers[3].models"));
        assert!(warnings.iter().all(|w| w.severity != WarningSeverity::Error));
    }

    #[test]
    fn test_validate_empty_name_is_error() {
        let mut config = GatewayConfig::default();
        config.providers = vec![ProviderConfig::new("  ", "local", &["*"])];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout_is_error() {
        let mut config = GatewayConfig::default();
        config.providers = vec![ProviderConfig::new("l", "local", &["*"]).with_setting("timeout_secs", 0)];
        let err = config.validate().unwrap_err();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_remote_without_key_warns() {
        let mut config = GatewayConfig::default();
        config.providers = vec![ProviderConfig::new("openai", "openai", &["gpt-4o"])];
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.field == "providers[0].api_key"));
    }

    #[test]
    fn test_validate_type_tags_ignore_case() {
        let mut config = GatewayConfig::default();
        config.providers = vec![ProviderConfig::new("oa", "OpenAI", &["gpt-4o"])];
        let warnings = config.validate().unwrap();
        assert!(!warnings.iter().any(|w| w.field == "providers[0].type"));
        assert!(warnings.iter().any(|w| w.field == "providers[0].api_key"));
    }

    #[test]
    fn test_validate_disabled_duplicate_is_not_reported() {
        let mut disabled = ProviderConfig::new("x", "local", &["*"]);
        disabled.enabled = false;
        let mut config = GatewayConfig::default();
        config.providers = vec![disabled, ProviderConfig::new("x", "local", &["*"])];
        let warnings = config.validate().unwrap();
        assert!(!warnings.iter().any(|w| w.message.contains("duplicate")));

        config.providers.push(ProviderConfig::new("x", "local", &["*"]));
        let warnings = config.validate().unwrap();
        let dups: Vec<&str> = warnings
            .iter()
            .filter(|w| w.message.contains("duplicate"))
            .map(|w| w.field.as_str())
            .collect();
        assert_eq!(dups, vec!["providers[2].name"]);
    }

    #[test]
    fn test_warnings_include_errors() {
        let mut config = GatewayConfig::default();
        config.routing.max_retries = 0;
        let warnings = config.warnings();
        assert!(
            warnings
                .iter()
                .any(|w| w.field == "routing.max_retries" && w.severity == WarningSeverity::Error)
        );
    }

    #[test]
    fn test_warning_display() {
        let w = ConfigWarning {
            field: "logging.format".into(),
            message: "unknown log format 'xml'".into(),
            severity: WarningSeverity::Warning,
            hint: Some("Valid values: pretty, json, compact".into()),
        };
        let text = w.to_string();
        assert!(text.contains("logging.format"));
        assert!(text.contains("↳ Valid values"));
    }

    // ── Env overrides ──────────────────────────────────────────

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SWITCHBOARD_LOG_LEVEL", "debug"),
            ("SWITCHBOARD_LOG_FORMAT", "json"),
            ("SWITCHBOARD_MAX_RETRIES", "7"),
        ]);
        let config = ConfigLoader::apply_overrides_from(GatewayConfig::default(), |var| {
            env.get(var).map(|v| v.to_string())
        });
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.routing.max_retries, 7);
    }

    #[test]
    fn test_env_override_ignores_garbage_retries() {
        let config = ConfigLoader::apply_overrides_from(GatewayConfig::default(), |var| {
            (var == "SWITCHBOARD_MAX_RETRIES").then(|| "many".to_string())
        });
        assert_eq!(config.routing.max_retries, 3);
    }

    // ── ConfigLoader tests ─────────────────────────────────────

    #[test]
    fn test_config_loader_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("switchboard.toml");
        let mut f = std::fs::File::create(&config_path).unwrap();
        writeln!(
            f,
            r#"
[routing]
failure_threshold = 5

[[providers]]
name = "local"
type = "local"
models = ["*"]
base_url = "http://127.0.0.1:11434"
"#
        )
        .unwrap();

        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();
        let config = loader.get();
        assert_eq!(config.routing.failure_threshold, 5);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].setting_str("base_url"), Some("http://127.0.0.1:11434"));
        assert_eq!(loader.path(), config_path.as_path());
    }

    #[test]
    fn test_config_loader_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("absent.toml");
        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();
        assert!(loader.config().providers.is_empty());
        assert_eq!(loader.config().routing.failure_threshold, 3);
    }

    #[test]
    fn test_config_loader_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("switchboard.toml");
        std::fs::write(&config_path, "[[providers]\nname = ").unwrap();
        let result = ConfigLoader::load(Some(config_path.as_path()));
        assert!(matches!(result, Err(switchboard_core::SwitchboardError::Config(_))));
    }

    #[test]
    fn test_config_loader_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("switchboard.toml");
        std::fs::write(&config_path, "[routing]\nmax_retries = 0\nfailure_threshold = 0\n").unwrap();
        match ConfigLoader::load(Some(config_path.as_path())) {
            Err(switchboard_core::SwitchboardError::ConfigValidation { field, reason }) => {
                assert_eq!(field, "routing.max_retries");
                assert!(reason.contains("and 1 more"));
            }
            Err(other) => panic!("expected ConfigValidation, got {other:?}"),
            Ok(_) => panic!("expected ConfigValidation"),
        }
    }

    #[test]
    fn test_resolve_path_prefers_explicit() {
        let p = std::path::Path::new("/etc/switchboard/custom.toml");
        assert_eq!(ConfigLoader::resolve_path(Some(p)), p.to_path_buf());
    }

    // ── Roundtrip ──────────────────────────────────────────────

    #[test]
    fn test_config_toml_roundtrip_with_providers() {
        let mut config = GatewayConfig::default();
        config.providers = vec![
            ProviderConfig::new("openai", "remote-http", &["gpt-4o"])
                .with_setting("base_url", "https://example.test/v1"),
        ];
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: GatewayConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(restored.providers.len(), 1);
        assert_eq!(restored.providers[0].name, "openai");
        assert_eq!(
            restored.providers[0].setting_str("base_url"),
            Some("https://example.test/v1")
        );
    }
}
