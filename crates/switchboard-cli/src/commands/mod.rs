use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use switchboard_config::{ConfigLoader, GatewayConfig, LoggingConfig, WarningSeverity};
use switchboard_core::{Result, SwitchboardError};
use switchboard_llm::{ProviderRegistry, ProviderRouter};

mod chat;
mod providers;

pub use chat::ChatArgs;

/// Switchboard — streaming chat-completion gateway with provider failover
#[derive(Parser)]
#[command(name = "switchboard", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to switchboard.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with a model; interactive when no prompt is given
    Chat(ChatArgs),
    /// List configured providers and their health
    Providers {
        /// Probe each provider's backend
        #[arg(long)]
        check: bool,
    },
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Audit configuration for problems
    Doctor,
    /// Show version and build info
    Version,
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        // Load config first so we can use it for the log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        let log_level = resolve_log_level(
            self.verbose,
            self.quiet,
            self.log_level.as_deref(),
            &config.logging.level,
        );
        init_tracing(&config.logging, log_level)?;

        match self.command {
            Commands::Chat(args) => chat::cmd_chat(config, args).await,
            Commands::Providers { check } => providers::cmd_providers(config, check).await,
            Commands::Config { json } => Self::cmd_config(config, json),
            Commands::Doctor => Self::cmd_doctor(config, config_loader.path().display().to_string()),
            Commands::Version => Self::cmd_version(),
            Commands::Completions { shell } => Self::cmd_completions(shell),
        }
    }

    fn cmd_config(config: GatewayConfig, json: bool) -> Result<()> {
        let config = redacted(config);
        if json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| SwitchboardError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    fn cmd_doctor(config: GatewayConfig, path: String) -> Result<()> {
        println!("🩺 Switchboard Doctor — Configuration Audit");
        println!("   config: {path}");
        println!();

        // Loading already rejects Error-severity problems
        let warnings = match config.validate() {
            Ok(w) => w,
            Err(e) => {
                println!("{e}");
                return Ok(());
            }
        };

        let mut warn_count = 0;
        let mut info_count = 0;
        for w in &warnings {
            println!("  {w}");
            match w.severity {
                WarningSeverity::Warning => warn_count += 1,
                WarningSeverity::Info => info_count += 1,
                WarningSeverity::Error => {}
            }
        }

        // Which descriptors actually turn into providers
        let registry = ProviderRegistry::from_config(&config.providers);
        let enabled = config.providers.iter().filter(|p| p.enabled).count();
        if enabled > 0 && registry.len() < enabled {
            println!(
                "  ⚠️  providers: {} of {enabled} enabled providers could not be initialized (see logs)",
                enabled - registry.len()
            );
            warn_count += 1;
        }
        if registry.is_empty() {
            println!("  ⚠️  providers: no usable provider — every request will fail");
            warn_count += 1;
        }
        for status in registry.statuses() {
            println!(
                "  ✓ {} ({}) serves {}",
                status.name,
                status.kind,
                status.models.join(", ")
            );
        }

        println!();
        println!(
            "  ✅ {} providers ready, ⚠️  {warn_count} warnings, 💡 {info_count} suggestions",
            registry.len()
        );
        Ok(())
    }

    fn cmd_version() -> Result<()> {
        println!("Switchboard v{}", env!("CARGO_PKG_VERSION"));
        println!("   Rust edition: 2024");
        println!("   Target: {}", std::env::consts::ARCH);
        println!("   OS: {}", std::env::consts::OS);
        #[cfg(debug_assertions)]
        println!("   Profile: debug");
        #[cfg(not(debug_assertions))]
        println!("   Profile: release");
        Ok(())
    }

    fn cmd_completions(shell: Shell) -> Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "switchboard", &mut std::io::stdout());
        Ok(())
    }
}

/// Build the router for one CLI invocation from the loaded config.
pub(crate) fn build_router(config: &GatewayConfig) -> ProviderRouter {
    let registry = ProviderRegistry::from_config(&config.providers);
    ProviderRouter::from_routing_config(registry, &config.routing)
}

/// Resolve log level: --verbose > --quiet > --log-level > config
fn resolve_log_level<'a>(verbose: bool, quiet: bool, flag: Option<&'a str>, configured: &'a str) -> &'a str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        flag.unwrap_or(configured)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
fn init_tracing(logging: &LoggingConfig, level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let writer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(logging.file.is_none());

    match logging.format.as_str() {
        "json" => builder.json().with_target(true).init(),
        "compact" => builder.compact().with_target(false).init(),
        _ => builder.with_target(false).init(),
    }
    Ok(())
}

/// Mask credentials before printing a config.
fn redacted(mut config: GatewayConfig) -> GatewayConfig {
    for provider in &mut config.providers {
        if let Some(key) = provider.settings.get_mut("api_key")
            && key.as_str().is_some_and(|k| !k.is_empty())
        {
            *key = serde_json::Value::String("********".into());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_config::ProviderConfig;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_chat_one_shot() {
        let cli = Cli::try_parse_from([
            "switchboard", "chat", "-m", "gpt-4o", "--system", "be brief", "--sse", "hello", "there",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.model, "gpt-4o");
                assert_eq!(args.system.as_deref(), Some("be brief"));
                assert!(args.sse);
                assert_eq!(args.prompt, vec!["hello", "there"]);
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["switchboard", "providers", "--check", "-v", "--config", "/tmp/s.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
        assert!(matches!(cli.command, Commands::Providers { check: true }));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["switchboard", "-v", "-q", "doctor"]).is_err());
    }

    #[test]
    fn test_resolve_log_level_precedence() {
        assert_eq!(resolve_log_level(true, false, Some("warn"), "info"), "debug");
        assert_eq!(resolve_log_level(false, true, Some("warn"), "info"), "error");
        assert_eq!(resolve_log_level(false, false, Some("warn"), "info"), "warn");
        assert_eq!(resolve_log_level(false, false, None, "trace"), "trace");
    }

    #[test]
    fn test_redacted_masks_api_keys_only() {
        let mut config = GatewayConfig::default();
        config.providers = vec![
            ProviderConfig::new("openai", "remote-http", &["*"])
                .with_setting("api_key", "sk-secret")
                .with_setting("api_key_env", "OPENAI_API_KEY"),
        ];
        let config = redacted(config);
        let p = &config.providers[0];
        assert_eq!(p.setting_str("api_key"), Some("********"));
        assert_eq!(p.setting_str("api_key_env"), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn test_build_router_uses_routing_limits() {
        let mut config = GatewayConfig::default();
        config.routing.failure_threshold = 7;
        let router = build_router(&config);
        assert_eq!(router.registry().failure_threshold(), 7);
        assert_eq!(router.registry().len(), 1);
    }
}
