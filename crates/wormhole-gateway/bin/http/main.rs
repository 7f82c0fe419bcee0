mod cli;

use crate::cli::{LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wormhole_core::Shortener;
use wormhole_gateway::{Router, Server};
use wormhole_generator::RandomGenerator;
use wormhole_shortener::{ShortenerService, ShortenerSettings};
use wormhole_storage::{InMemoryRepository, SqliteRepository};

const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        domain = %config.domain,
        code_length = config.code_length,
        max_attempts = config.max_attempts,
        storage_backend = %config.storage,
        "starting wormhole"
    );

    let generator = RandomGenerator::try_new(usize::from(config.code_length))
        .context("invalid code length")?;
    let settings = ShortenerSettings::builder()
        .max_attempts(config.max_attempts)
        .build();

    let shortener: Arc<dyn Shortener> = match config.storage {
        StorageBackendArg::InMemory => Arc::new(ShortenerService::with_settings(
            InMemoryRepository::new(),
            generator,
            settings,
        )),
        StorageBackendArg::Sqlite => {
            let repository = SqliteRepository::connect(&config.database_url)
                .await
                .with_context(|| format!("failed to open database {}", config.database_url))?;
            Arc::new(ShortenerService::with_settings(repository, generator, settings))
        }
    };

    let server = Server::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?
        .with_io_timeout(Duration::from_secs(config.io_timeout_secs));

    server.serve(Router::new(shortener, config.domain)).await?;

    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormatArg::Text => subscriber.init(),
        LogFormatArg::Json => subscriber.json().init(),
    }
}
