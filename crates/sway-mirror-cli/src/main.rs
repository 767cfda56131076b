//! sway-mirror CLI
//!
//! Inspect and follow sway's window-manager state over the IPC socket.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use sway_mirror::sway_ipc::{check_outcomes, SwayClient, SwayMirror};
use sway_mirror::{ActiveState, Node, StateStore};
use sway_mirror_config::Config;
use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Registry};

#[derive(Parser, Debug)]
#[command(name = "sway-mirror")]
#[command(about = "Mirror of sway window manager state")]
#[command(version)]
struct Cli {
    /// Path to configuration file [default: ~/.config/sway-mirror/config.kdl]
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// Print outputs, workspaces, windows and focus once
    Snapshot {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Follow focus changes until sway exits or Ctrl-C
    Watch,

    /// Run sway commands and report their results
    Run {
        /// Command text, joined with spaces (e.g. `focus left`)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise start at warn and switch to the configured level once known
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("warn")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = config_path(cli.config.as_deref());

    let config = sway_mirror_config::load_config(&config_path)?;
    if !from_env {
        apply_log_level(&filter_handle, &config);
    }

    match cli.command {
        Commands::Validate => cmd_validate(&config_path, &config),
        Commands::Snapshot { json } => cmd_snapshot(&config, json).await,
        Commands::Watch => cmd_watch(&config).await,
        Commands::Run { command } => cmd_run(&config, &command.join(" ")).await,
    }
}

/// Expand `~` in an explicit config path, or fall back to the default location
fn config_path(arg: Option<&str>) -> PathBuf {
    match arg {
        Some(path) => shellexpand::tilde(path).into_owned().into(),
        None => sway_mirror_config::default_config_path(),
    }
}

fn apply_log_level(handle: &FilterHandle, config: &Config) {
    if let Some(level) = config.global.log_level {
        if let Err(e) = handle.reload(EnvFilter::new(level.as_str())) {
            tracing::warn!("Failed to apply configured log level: {}", e);
        }
    }
}

fn cmd_validate(config_path: &Path, config: &Config) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    if !config_path.exists() {
        println!("No configuration file found, defaults apply.");
    }

    println!("Configuration is valid!");
    println!(
        "  Log level: {}",
        config
            .global
            .log_level
            .map(|l| l.to_string())
            .unwrap_or_else(|| "<default>".to_string())
    );
    println!(
        "  Socket: {}",
        config
            .global
            .socket_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "$SWAYSOCK / $I3SOCK".to_string())
    );
    println!("  Subscribe: {}", config.ipc.subscribe.join(", "));
    println!("  Max retries: {}", config.ipc.max_retries);
    Ok(())
}

async fn cmd_snapshot(config: &Config, json: bool) -> miette::Result<()> {
    let mut client = SwayClient::connect(config.global.socket_path.as_deref())
        .await
        .into_diagnostic()?;
    let tree = client.get_tree().await.into_diagnostic()?;

    let mut state = StateStore::new();
    state.sync_tree(tree);

    if json {
        let value = serde_json::json!({
            "monitors": sorted(state.monitors()),
            "workspaces": sorted(state.workspaces()),
            "clients": sorted(state.clients()),
            "active": state.active(),
        });
        let text = serde_json::to_string_pretty(&value).into_diagnostic()?;
        println!("{}", text);
        return Ok(());
    }

    println!("Monitors:");
    for node in sorted(state.monitors()) {
        println!("  [{}] {}", node.id, node.name);
    }
    println!("Workspaces:");
    for node in sorted(state.workspaces()) {
        println!(
            "  [{}] {} on {}",
            node.id,
            node.name,
            node.output.as_deref().unwrap_or("?")
        );
    }
    println!("Clients:");
    for node in sorted(state.clients()) {
        let class = node.derived_class();
        println!(
            "  [{}] {} ({})",
            node.id,
            node.name,
            if class.is_empty() { "-" } else { class.as_str() }
        );
    }
    print_active(state.active());
    Ok(())
}

async fn cmd_watch(config: &Config) -> miette::Result<()> {
    let client = SwayClient::connect_with_retry(
        config.global.socket_path.as_deref(),
        config.ipc.max_retries,
    )
    .await
    .into_diagnostic()?;

    // A single slot is enough, the mirror is re-read on wake-up
    let (tx, mut rx) = mpsc::channel::<()>(1);
    let (mirror, mut task) = SwayMirror::from_client(client, &config.ipc.subscribe, tx)
        .await
        .into_diagnostic()?;

    let mut last: Option<ActiveState> = None;

    loop {
        tokio::select! {
            Some(()) = rx.recv() => {
                let active = mirror.active();
                if last.as_ref() != Some(&active) {
                    print_active(&active);
                    last = Some(active);
                }
            }
            result = &mut task => {
                return match result.into_diagnostic()? {
                    Ok(()) => {
                        println!("Sway closed the connection");
                        Ok(())
                    }
                    Err(e) => Err(e).into_diagnostic(),
                };
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                task.abort();
                return Ok(());
            }
        }
    }
}

async fn cmd_run(config: &Config, command: &str) -> miette::Result<()> {
    let mut client = SwayClient::connect(config.global.socket_path.as_deref())
        .await
        .into_diagnostic()?;
    let outcomes = client.run_command(command).await.into_diagnostic()?;

    for (i, outcome) in outcomes.iter().enumerate() {
        match (&outcome.error, outcome.success) {
            (_, true) => println!("  {}: ok", i + 1),
            (Some(error), false) => println!("  {}: failed: {}", i + 1, error),
            (None, false) => println!("  {}: failed", i + 1),
        }
    }

    check_outcomes(&outcomes).into_diagnostic()
}

fn print_active(active: &ActiveState) {
    println!(
        "Active: client [{}] {} ({}) | workspace [{}] {} | monitor {}",
        active.client.id,
        active.client.title,
        active.client.class,
        active.workspace.id,
        active.workspace.name,
        active.monitor
    );
}

fn sorted(map: &HashMap<i64, Node>) -> Vec<&Node> {
    let mut nodes: Vec<&Node> = map.values().collect();
    nodes.sort_by_key(|n| n.id);
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_joins_trailing_arguments() {
        let cli = Cli::try_parse_from(["sway-mirror", "run", "workspace", "number", "3"]).unwrap();
        match cli.command {
            Commands::Run { command } => assert_eq!(command.join(" "), "workspace number 3"),
            other => panic!("Expected Run, got: {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_a_command() {
        assert!(Cli::try_parse_from(["sway-mirror", "run"]).is_err());
    }

    #[test]
    fn test_snapshot_json_flag_and_config_override() {
        let cli = Cli::try_parse_from([
            "sway-mirror",
            "--config",
            "/etc/sway-mirror.kdl",
            "snapshot",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("/etc/sway-mirror.kdl"));
        assert!(matches!(cli.command, Commands::Snapshot { json: true }));
    }

    #[test]
    fn test_config_path_defaults_and_expands() {
        assert_eq!(config_path(None), sway_mirror_config::default_config_path());
        assert_eq!(
            config_path(Some("/etc/sway-mirror.kdl")),
            PathBuf::from("/etc/sway-mirror.kdl")
        );
        assert!(!config_path(Some("~/sway.kdl")).to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_sorted_orders_by_id() {
        let mut map = HashMap::new();
        for id in [30, 10, 20] {
            map.insert(
                id,
                Node {
                    id,
                    ..Node::default()
                },
            );
        }

        let ids: Vec<i64> = sorted(&map).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }
}
