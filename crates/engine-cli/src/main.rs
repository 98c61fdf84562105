//! Scaffolding around the `engine` crate, the way `eeg_daemon` is
//! scaffolding around `pipeline`: boots one Engine from a config file using
//! the demo stage collaborators from `engine-stages`, then waits for
//! Ctrl+C and tears down gracefully. Not a user-facing crawler CLI.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Arg, Command};
use engine::{Engine, EngineConfig, EngineDeps};
use engine_stages::{register_demo_plugins, DemoDownloader, DemoItemProcessor, DemoSpider, NoopPipelineHooks};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "engine_cli=debug,engine=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("engine-cli starting...");

    let matches = Command::new("engine-cli")
        .about("Boots a single Engine from a config file")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Path to an EngineConfig YAML file")
                .required(true),
        )
        .get_matches();

    let config_path: &String = matches.get_one("config").expect("required by clap");
    let config_str = std::fs::read_to_string(config_path)?;
    let config: EngineConfig = serde_yaml::from_str(&config_str)?;

    let (requesters, storages) = register_demo_plugins();
    let deps = EngineDeps::new(
        Arc::new(DemoDownloader),
        Arc::new(DemoSpider),
        Arc::new(DemoItemProcessor),
        Arc::new(NoopPipelineHooks),
    )
    .with_requester_plugins(requesters)
    .with_storage_plugins(storages);

    let engine_ref = Engine::start(config, deps)?;
    tracing::info!(spider = %engine_ref.spider(), "engine started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, suspending before teardown");

    if let Err(e) = engine_ref.suspend(CONTROL_TIMEOUT).await {
        tracing::warn!(error = %e, "suspend failed during shutdown, terminating anyway");
    }

    let dump_paths = engine_ref
        .dump2file_force(None::<PathBuf>, CONTROL_TIMEOUT)
        .await?;
    tracing::info!(?dump_paths, "dumped tables before shutdown");

    engine_ref.terminate("normal").await?;
    tracing::info!("engine-cli stopped gracefully");
    Ok(())
}
