//! Scene Prefab command line
//!
//! `serve` runs the HTTP automation API over a scene dump; `export` writes a
//! single prefab from a scene dump to disk and prints the result.

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use scene_prefab::core::config::{parse_storage_type, StorageType};
use scene_prefab::inspector::{MemoryInspector, SharedInspector};
use scene_prefab::storage::FsStore;
use scene_prefab::{api, AppState, Config, CreatePrefabRequest};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

fn cli() -> Command {
    let config_arg = Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Configuration file path");
    let scene_arg = Arg::new("scene")
        .long("scene")
        .value_name("FILE")
        .help("Scene dump (JSON) served as the live scene");
    let data_dir_arg = Arg::new("data-dir")
        .long("data-dir")
        .value_name("DIR")
        .help("Asset data directory");
    let log_level_arg = Arg::new("log-level")
        .long("log-level")
        .value_name("LEVEL")
        .help("Log level (trace, debug, info, warn, error)");

    Command::new("scene-prefab")
        .version(scene_prefab::VERSION)
        .about("Serializes live scene nodes into prefab documents.")
        .subcommand_required(true)
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP automation API")
                .arg(config_arg.clone())
                .arg(scene_arg.clone())
                .arg(data_dir_arg.clone())
                .arg(log_level_arg.clone())
                .arg(
                    Arg::new("http-addr")
                        .long("http-addr")
                        .value_name("ADDR")
                        .help("HTTP server bind address"),
                )
                .arg(
                    Arg::new("storage-type")
                        .long("storage-type")
                        .value_name("TYPE")
                        .help("Storage backend type (memory, disk)"),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Write one prefab from a scene dump")
                .arg(config_arg)
                .arg(scene_arg.required(true))
                .arg(data_dir_arg)
                .arg(log_level_arg)
                .arg(
                    Arg::new("node")
                        .long("node")
                        .value_name("UUID")
                        .required(true)
                        .help("Live identifier of the node to export"),
                )
                .arg(
                    Arg::new("path")
                        .long("path")
                        .value_name("ASSET_PATH")
                        .required(true)
                        .help("Target asset path, e.g. db://assets/ui/Door.prefab"),
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .value_name("NAME")
                        .help("Prefab name (defaults to the node name)"),
                )
                .arg(
                    Arg::new("no-children")
                        .long("no-children")
                        .action(ArgAction::SetTrue)
                        .help("Serialize the node without its descendants"),
                )
                .arg(
                    Arg::new("no-components")
                        .long("no-components")
                        .action(ArgAction::SetTrue)
                        .help("Serialize nodes without components"),
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("serve", sub)) => serve(sub).await,
        Some(("export", sub)) => export(sub).await,
        _ => unreachable!("subcommand_required"),
    }
}

/// Load configuration and apply the overrides shared by all subcommands
fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    if let Some(data_dir) = matches.get_one::<String>("data-dir") {
        config.storage.data_dir = data_dir.into();
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

fn load_inspector(matches: &ArgMatches) -> anyhow::Result<SharedInspector> {
    match matches.get_one::<String>("scene") {
        Some(path) => {
            let inspector = MemoryInspector::from_file(path)
                .with_context(|| format!("loading scene dump {}", path))?;
            info!(scene = %path, nodes = inspector.len(), "scene loaded");
            Ok(Arc::new(inspector))
        }
        None => {
            warn!("no scene dump given, every node query will fail");
            Ok(Arc::new(MemoryInspector::new()))
        }
    }
}

async fn serve(matches: &ArgMatches) -> anyhow::Result<()> {
    let mut config = load_config(matches)?;

    if let Some(addr) = matches.get_one::<String>("http-addr") {
        config.server.http_addr = addr.parse().context("invalid HTTP address")?;
    }
    if let Some(storage_type) = matches.get_one::<String>("storage-type") {
        config.storage.storage_type = parse_storage_type(storage_type)?;
    }

    scene_prefab::init(&config.logging)?;

    let inspector = load_inspector(matches)?;
    let addr = config.server.http_addr;
    let state = AppState::from_config(config, inspector)?;

    info!("Starting {} v{} on {}", scene_prefab::NAME, scene_prefab::VERSION, addr);
    api::start_server(addr, state, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

async fn export(matches: &ArgMatches) -> anyhow::Result<()> {
    let mut config = load_config(matches)?;
    config.storage.storage_type = StorageType::Disk;

    scene_prefab::init(&config.logging)?;

    let inspector = load_inspector(matches)?;
    let store = FsStore::open(&config.storage.data_dir)
        .with_context(|| format!("opening data directory {}", config.storage.data_dir.display()))?;
    let state = AppState::new(config, inspector, Arc::new(store));

    let request = CreatePrefabRequest {
        name: matches.get_one::<String>("name").cloned(),
        include_children: matches.get_flag("no-children").then_some(false),
        include_components: matches.get_flag("no-components").then_some(false),
        ..CreatePrefabRequest::new(
            matches.get_one::<String>("node").cloned().unwrap_or_default(),
            matches.get_one::<String>("path").cloned().unwrap_or_default(),
        )
    };

    let result = state.service.create_prefab(request).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        anyhow::bail!(result.error.unwrap_or_else(|| "export failed".to_string()));
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_export_arguments() {
        let matches = cli()
            .try_get_matches_from([
                "scene-prefab", "export", "--scene", "scene.json", "--node", "n1", "--path", "Door",
                "--no-children",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "export");
        assert!(sub.get_flag("no-children"));
        assert!(!sub.get_flag("no-components"));
    }
}
