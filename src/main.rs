use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use astera::config::Config;
use astera::resolver::{PrefixPatterns, Resolver};
use astera::server::{self, ProxyServer};
use astera::store::sqlite::SqliteStore;
use astera::upstream::ProxyClient;
use astera::vcs::Git;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let store = SqliteStore::open(&config.db)
        .with_context(|| format!("failed to open database {}", config.db.display()))?;

    let resolver = Arc::new(Resolver::new(
        Arc::new(store),
        Arc::new(ProxyClient::new()?),
        Arc::new(Git::new()),
        PrefixPatterns::new(&config.goprivate),
    ));

    if config.import_local_cache {
        info!(dir = %config.local_cache_dir.display(), "importing local module cache");
        resolver
            .import_cached_modules(&config.local_cache_dir)
            .context("failed to import local module cache")?;
    }

    if config.pprof {
        tokio::spawn(async {
            if let Err(e) = server::run_diagnostics(6060).await {
                error!("diagnostics listener failed: {e}");
            }
        });
    }

    ProxyServer::new(config.listen_addr()?, resolver).run().await
}
