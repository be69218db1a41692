//! multienv CLI
//!
//! Composes the config documents of the current project and deploys them to a
//! local store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use multienv_config::logging::{init_logging, LoggingConfig};
use multienv_config::{ConfigStore, LocalConfigManager, LocalDirStore, MultiEnvConfig};
use serde_json::Value;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "multienv", version, about = "Compose and deploy multi-environment JSON config")]
struct Cli {
    /// Directory holding config.json and secret_config.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error, off
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log format: text or json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the composed config of one env
    Show {
        /// Env name, defaults to MULTIENV_ENV or dev
        #[arg(long)]
        env: Option<String>,
    },
    /// Print the composed config of every env
    Compose,
    /// Deploy the all-env document and one document per env
    Deploy {
        #[arg(long)]
        store: PathBuf,
    },
    /// Delete every document of this project from the store
    Delete {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        include_history: bool,
    },
    /// Print a stored document
    Read {
        #[arg(long)]
        store: PathBuf,
        /// Parameter name, e.g. my_project or my_project-dev
        #[arg(long)]
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging_config = LoggingConfig {
        level: cli.log_level.clone(),
        format: cli.log_format.clone(),
    };
    init_logging(&logging_config).context("failed to initialize logging")?;

    let output = run(&cli)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(cli: &Cli) -> Result<Value> {
    let mut manager = LocalConfigManager::new();
    if let Some(dir) = &cli.config_dir {
        manager = manager.with_config_dir(dir);
    }

    match &cli.command {
        Command::Show { env } => {
            let env = match env {
                Some(name) => manager.get_env(name)?,
                None => manager.current_env()?,
            };
            Ok(env.to_value())
        }
        Command::Compose => Ok(Value::Object(manager.config()?.merged().clone())),
        Command::Deploy { store } => {
            let store = LocalDirStore::new(store);
            let config = manager.config()?;
            let deployments = config.prepare_deploy()?;
            let mut report = serde_json::Map::new();
            for deployment in &deployments {
                let version = store
                    .deploy(deployment)
                    .with_context(|| format!("failed to deploy {}", deployment.parameter_name))?;
                report.insert(
                    deployment.parameter_name.clone(),
                    version.map_or(Value::Null, |v| Value::from(v.version)),
                );
            }
            info!(count = deployments.len(), "deploy finished");
            Ok(Value::Object(report))
        }
        Command::Delete { store, include_history } => {
            let store = LocalDirStore::new(store);
            let config = manager.config()?;
            let mut report = serde_json::Map::new();
            for deployment in config.prepare_deploy()? {
                let removed = store.delete(&deployment.parameter_name, *include_history)?;
                report.insert(deployment.parameter_name, Value::Bool(removed));
            }
            Ok(Value::Object(report))
        }
        Command::Read { store, name } => {
            let store = LocalDirStore::new(store);
            let config = MultiEnvConfig::read_from(&store, name)?;
            Ok(Value::Object(config.merged().clone()))
        }
    }
}
