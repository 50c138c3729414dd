//! dutchbid Service Entry Point
//!
//! Wires the whole broker together: configuration, logging, store,
//! oracles, the monitor with its poll loops and ZMQ subscribers, and the
//! HTTP server. Shutdown is cooperative: Ctrl-C flips a watch channel,
//! the scheduler and subscribers drain, and the server finishes in-flight
//! requests.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use dutchbid::api::{self, AppState};
use dutchbid::config::Config;
use dutchbid::logging::init_logging;
use dutchbid::monitor::{zmq, ListingMonitor};
use dutchbid::oracle::{AssetOracle, BitcoinRpc, ChainOracle, CounterpartyClient};
use dutchbid::storage::{ListingStore, SqliteListingStore};
use dutchbid::ServiceError;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.log_level) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), ServiceError> {
    info!(
        "starting dutchbid (db: {}, node: {}:{})",
        config.database_path, config.bitcoin_rpc_host, config.bitcoin_rpc_port
    );

    let store = Arc::new(SqliteListingStore::new(&config.database_path)?);
    let chain = Arc::new(BitcoinRpc::from_config(&config));
    let assets = Arc::new(CounterpartyClient::from_config(&config));

    let store_dyn: Arc<dyn ListingStore> = store.clone();
    let chain_dyn: Arc<dyn ChainOracle> = chain.clone();
    let assets_dyn: Arc<dyn AssetOracle> = assets.clone();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let monitor = Arc::new(ListingMonitor::new(store_dyn.clone(), chain_dyn.clone()));

    tokio::spawn(
        monitor
            .clone()
            .run_height_poll(config.block_poll_interval_seconds, shutdown_rx.clone()),
    );
    tokio::spawn(
        monitor
            .clone()
            .run_spend_poll(config.utxo_poll_interval_seconds, shutdown_rx.clone()),
    );

    if config.zmq_enabled {
        tokio::spawn(zmq::run_block_subscriber(
            config.zmq_block_url.clone(),
            monitor.clone(),
            shutdown_rx.clone(),
        ));
        tokio::spawn(zmq::run_tx_subscriber(
            config.zmq_tx_url.clone(),
            monitor.clone(),
            shutdown_rx.clone(),
        ));
    } else {
        info!("zmq notifications disabled via config, polling only");
    }

    let state = Arc::new(AppState {
        store: store_dyn,
        chain: chain_dyn,
        assets: assets_dyn,
        api_key: config.api_key.clone(),
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    api::serve(state, &config.listen_host, config.listen_port, shutdown_rx).await?;

    info!("shutdown complete");
    Ok(())
}
