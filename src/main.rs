//! ITSM Board - rotating ticket dashboard binary
//!
//! Loads the layered configuration, assembles the dashboard and drives the
//! selected display until interrupted.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use itsm_board::config::{resolve_environment, DashboardConfig};
use itsm_board::display::terminal::render_frame;
use itsm_board::metrics::manager::DataManager;
use itsm_board::{create_display, Dashboard, DisplayBackend, PluginRegistry, StopHandle};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "itsm_board")]
#[command(about = "ITSM Board - rotating ticket dashboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Polls an ITSM REST API and rotates incident, request and health screens on a small display")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding base.yaml and the environment overlays
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,

    /// Configuration environment (defaults to DASHBOARD_ENV, then development)
    #[arg(short, long)]
    env: Option<String>,

    /// Override the configured display backend
    #[arg(long, value_enum)]
    display: Option<DisplayBackend>,

    /// Override the web display port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard (default)
    Run,

    /// Fetch every configured screen once, print it and exit
    Snapshot(SnapshotArgs),

    /// List the registered screens and data sources
    Plugins,

    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let environment = resolve_environment(cli.env.as_deref());
    let (config, from_dir) = load_config(&cli, &environment)?;

    init_logging(&cli, &config)?;
    if !from_dir {
        warn!(
            "No configuration found in {}, using built-in defaults",
            cli.config_dir.display()
        );
    }

    let registry = PluginRegistry::with_builtins();

    match &cli.command {
        Some(Commands::Run) | None => run_command(&config, &registry, &environment).await?,
        Some(Commands::Snapshot(args)) => snapshot_command(&config, &registry, args).await?,
        Some(Commands::Plugins) => plugins_command(&registry),
        Some(Commands::CheckConfig) => check_config_command(&config, &registry, &environment)?,
    }

    Ok(())
}

/// Load the layered configuration and apply CLI overrides.
///
/// Falls back to the built-in defaults when the directory has no
/// `base.yaml`. The flag tells whether files were used.
fn load_config(cli: &Cli, environment: &str) -> anyhow::Result<(DashboardConfig, bool)> {
    let from_dir = has_base_file(&cli.config_dir);
    let mut config = if from_dir {
        DashboardConfig::load(&cli.config_dir, environment).with_context(|| {
            format!("failed to load configuration from {}", cli.config_dir.display())
        })?
    } else {
        DashboardConfig::load_defaults().context("failed to load default configuration")?
    };

    if let Some(backend) = cli.display {
        config.display.backend = backend;
    }
    if let Some(port) = cli.port {
        config.display.web.port = port;
    }

    Ok((config, from_dir))
}

fn has_base_file(dir: &Path) -> bool {
    dir.join("base.yaml").is_file()
}

fn init_logging(cli: &Cli, config: &DashboardConfig) -> anyhow::Result<()> {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn print_banner(config: &DashboardConfig, environment: &str) {
    println!("ITSM Board - rotating ticket dashboard");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!("   Environment: {}", environment);
    println!("   Display: {}", config.display.backend);
    println!();
}

async fn run_command(
    config: &DashboardConfig,
    registry: &PluginRegistry,
    environment: &str,
) -> anyhow::Result<()> {
    if config.display.backend != DisplayBackend::Terminal {
        print_banner(config, environment);
    }
    info!("Starting ITSM board ({} environment)", environment);

    let display = create_display(&config.display);
    let mut dashboard = Dashboard::from_config(config, registry, display)
        .context("failed to assemble the dashboard")?;
    dashboard
        .start(&config.display)
        .await
        .context("failed to start the dashboard")?;

    let signals = tokio::spawn(stop_on_signal(dashboard.stop_handle()));
    let result = dashboard.run().await;
    signals.abort();

    result.context("dashboard stopped with an error")?;
    info!("ITSM board stopped");
    Ok(())
}

/// Stop the dashboard on Ctrl+C or SIGTERM.
async fn stop_on_signal(stop: StopHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
    stop.stop();
}

async fn snapshot_command(
    config: &DashboardConfig,
    registry: &PluginRegistry,
    args: &SnapshotArgs,
) -> anyhow::Result<()> {
    let screens = registry.build_screens(config)?;

    let mut data = DataManager::from_config(config);
    for source in registry.build_sources(config) {
        data.add_source(source);
    }
    if !data.connect_all().await {
        warn!("Not every data source connected; the snapshot may be incomplete");
    }

    let needed: BTreeSet<String> = screens
        .iter()
        .flat_map(|screen| screen.required_metrics())
        .collect();
    let snapshot = data.get_or_fetch(&needed, Instant::now()).await;
    data.disconnect_all().await;

    let frames: Vec<_> = screens.iter().map(|screen| screen.process(&snapshot)).collect();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&frames)?),
        OutputFormat::Pretty => {
            let clock = chrono::Local::now().format("%H:%M").to_string();
            for frame in &frames {
                println!("{}", render_frame(frame, &clock, 32, false));
            }
        }
    }

    Ok(())
}

fn plugins_command(registry: &PluginRegistry) {
    println!("Screens:");
    for name in registry.list_screens() {
        println!("  - {}", name);
    }
    println!("  - custom_<metric> (one per custom_metrics entry)");
    println!();
    println!("Data sources:");
    for name in registry.list_sources() {
        println!("  - {}", name);
    }
}

fn check_config_command(
    config: &DashboardConfig,
    registry: &PluginRegistry,
    environment: &str,
) -> anyhow::Result<()> {
    println!("Environment: {}", environment);
    println!("Display: {}", config.display.backend);

    let mut problems = 0;
    println!("Screens:");
    for name in &config.display.screens {
        match registry.create_screen(name, config) {
            Ok(screen) => println!("  ok  {} ({:?})", name, screen.display_duration()),
            Err(e) => {
                problems += 1;
                println!("  !!  {}: {}", name, e);
            }
        }
    }

    println!("Data sources:");
    for name in &config.data_sources.enabled {
        match registry.create_source(name, config) {
            Ok(_) => println!("  ok  {}", name),
            Err(e) => {
                problems += 1;
                println!("  !!  {}: {}", name, e);
            }
        }
    }

    if problems > 0 {
        anyhow::bail!("{} configuration problem(s) found", problems);
    }
    println!("Configuration OK");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "itsm_board",
            "--display",
            "web",
            "--port",
            "9090",
            "--env",
            "production",
        ])
        .unwrap();
        assert_eq!(cli.display, Some(DisplayBackend::Web));
        assert_eq!(cli.port, Some(9090));
        assert_eq!(cli.env.as_deref(), Some("production"));
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["itsm_board"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config_dir, PathBuf::from("config"));
        assert!(cli.display.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_snapshot_subcommand() {
        let cli = Cli::try_parse_from(["itsm_board", "snapshot", "--format", "json"]).unwrap();
        match cli.command {
            Some(Commands::Snapshot(args)) => assert_eq!(args.format, OutputFormat::Json),
            _ => panic!("expected snapshot command"),
        }

        assert!(Cli::try_parse_from(["itsm_board", "snapshot", "--format", "yaml"]).is_err());
        assert!(matches!(
            Cli::try_parse_from(["itsm_board", "check-config"]).unwrap().command,
            Some(Commands::CheckConfig)
        ));
    }

    #[test]
    fn test_overrides_without_config_dir() {
        let cli = Cli::try_parse_from([
            "itsm_board",
            "--config-dir",
            "/nonexistent/itsm",
            "--display",
            "dump",
            "--port",
            "9191",
        ])
        .unwrap();
        let (config, from_dir) = load_config(&cli, "development").unwrap();
        assert!(!from_dir);
        assert_eq!(config.display.backend, DisplayBackend::Dump);
        assert_eq!(config.display.web.port, 9191);
    }
}
