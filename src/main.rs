use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use vanity::config::Config;
use vanity::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load().context("loading configuration")?;
    let resolver = cfg
        .resolver_builder()
        .context("reading package registry")?
        .build()
        .context("invalid vanity configuration")?;
    tracing::info!(
        vcs = resolver.vcs(),
        vcs_url = resolver.vcs_url(),
        module_server = resolver.module_server().base(),
        host = resolver.host().unwrap_or("<request host>"),
        packages = resolver.packages().len(),
        "Resolver configured"
    );
    if let Some(static_dir) = resolver.static_dir() {
        tracing::info!(
            root = %static_dir.root().display(),
            prefix = static_dir.prefix(),
            "Serving static files"
        );
    }
    if resolver.packages().is_empty() {
        tracing::debug!("No packages registered; every path resolves under vcs_url");
    }

    tokio::select! {
        res = server::listener::run(&cfg.listen_addr, Arc::new(resolver)) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
