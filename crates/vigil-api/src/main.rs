//! `vigil-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use vigil_api::config::Config;
use vigil_api::postgrest::PostgrestStore;
use vigil_api::server::Server;
use vigil_core::observability::{init_logging, LogFormat};
use vigil_core::{MemoryStore, RecordStore};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(choose_log_format(&config));

    let store: Arc<dyn RecordStore> = if let Some(url) = config.store.url.as_deref() {
        tracing::info!(url = %url, table = %config.store.table, "Using PostgREST record store");
        Arc::new(PostgrestStore::new(
            url,
            config.store.table.clone(),
            config.store.api_key.as_deref(),
        ))
    } else {
        if !config.debug {
            anyhow::bail!("VIGIL_STORE_URL is required when VIGIL_DEBUG=false");
        }
        tracing::warn!("VIGIL_STORE_URL not set; using in-memory record store (debug only)");
        Arc::new(MemoryStore::new())
    };

    let server = Server::with_store(config, store);
    server.serve().await?;
    Ok(())
}
