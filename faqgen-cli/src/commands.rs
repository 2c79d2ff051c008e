//! CLI subcommand handlers.

use crate::{Commands, ConfigAction};
use faqgen_core::config::{FaqgenConfig, load_config};
use faqgen_core::gateway::{GenerateFaqResponse, run_gateway};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Serve { host, port } => {
            let mut config = load(workspace, config_file)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            handle_serve(config).await
        }
        Commands::Generate { urls, user } => {
            let config = load(workspace, config_file)?;
            handle_generate(config, &urls, &user).await
        }
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

fn load(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<FaqgenConfig> {
    load_config(Some(workspace), config_file, None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
}

async fn handle_serve(config: FaqgenConfig) -> anyhow::Result<()> {
    let gateway = faqgen_core::build_gateway(&config)?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        prefix = %config.server.route_prefix,
        "Starting gateway"
    );
    run_gateway(gateway).await?;
    info!("Gateway stopped");
    Ok(())
}

async fn handle_generate(config: FaqgenConfig, urls: &[String], user: &str) -> anyhow::Result<()> {
    let orchestrator = faqgen_core::build_orchestrator(&config)?;
    let entries = if config.server.batch_timeout_secs > 0 {
        orchestrator
            .generate_urls_within(
                user,
                urls,
                Duration::from_secs(config.server.batch_timeout_secs),
            )
            .await?
    } else {
        orchestrator.generate_urls(user, urls).await?
    };
    let response = GenerateFaqResponse::from_entries(&entries);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".faqgen");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&FaqgenConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_file)?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
