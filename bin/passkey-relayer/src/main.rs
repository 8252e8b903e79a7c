//! Passkey relayer binary entry point.
//!
//! 1. Parse and validate configuration
//! 2. Initialise logging and metrics
//! 3. Connect one chain client per configured chain
//! 4. Build the datastore, verifier and wallet service
//! 5. Serve the JSON-RPC API and sweep expired options
//! 6. Wait for SIGTERM or SIGINT and stop the server

use std::{sync::Arc, time::Duration};

use clap::Parser;
use eyre::Result;
use jsonrpsee::server::Server;
use passkey_wallet::{
    Cli, PasskeyApiServer, PasskeyRpc, RelayerConfig,
    chain::ChainRegistry,
    metrics,
    service::PasskeyWalletService,
    store::{Datastore, InMemoryStore},
    webauthn::P256CeremonyVerifier,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Periodically drops expired entries from the store.
fn spawn_store_sweeper(store: Arc<InMemoryStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!(
                    target: "passkey::store",
                    purged,
                    remaining = store.len(),
                    "Purged expired entries"
                );
                metrics::record_store_purged(purged);
            }
        }
    })
}

/// Resolves once SIGINT, or SIGTERM on Unix, is received.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received SIGINT");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = RelayerConfig::from_cli(cli)?;
    config.log.init_tracing_subscriber()?;
    config.metrics.init()?;
    metrics::record_startup_metrics(env!("CARGO_PKG_VERSION"));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        relayer = %config.signer.address(),
        entry_point = %config.settings.entry_point,
        factory = %config.settings.factory,
        rp_id = %config.settings.rp.id,
        origin = %config.settings.rp.origin,
        "Passkey relayer starting"
    );

    let chains = ChainRegistry::connect(&config.chains, &config.signer);
    info!(chains = ?chains.ids(), "Chain clients initialized");

    let store = Arc::new(InMemoryStore::new());
    let datastore = Datastore::new(store.clone(), config.options_ttl);
    let service = PasskeyWalletService::new(
        chains,
        datastore,
        Arc::new(P256CeremonyVerifier),
        config.settings.clone(),
    );

    let server = Server::builder().build(config.rpc_addr).await?;
    let addr = server.local_addr()?;
    let handle = server.start(PasskeyRpc::new(service).into_rpc());
    info!(%addr, "JSON-RPC server started");

    let sweeper = spawn_store_sweeper(store, config.store_sweep_interval);

    shutdown_signal().await?;
    info!("Shutdown signal received, stopping service...");

    sweeper.abort();
    handle.stop()?;
    handle.stopped().await;

    info!("Service stopped");
    Ok(())
}
