//! Bitcoin Core ZMQ Subscribers
//!
//! Real-time notifications from the node's `rawblock` and `rawtx`
//! publishers. Each subscriber owns its socket for the life of the
//! connection and reconnects with a delay after any socket error. Losing
//! ZMQ entirely only degrades latency: the poll loops remain the
//! authoritative fallback.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use zeromq::{Socket, SocketRecv, SubSocket, ZmqError};

use super::ListingMonitor;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Subscribe to `rawblock` and trigger sweeps on every new block
pub async fn run_block_subscriber(
    url: String,
    monitor: Arc<ListingMonitor>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            result = listen_blocks(&url, &monitor) => {
                if let Err(e) = result {
                    warn!("rawblock subscription lost ({url}): {e}");
                }
            }
            _ = shutdown.changed() => {
                info!("rawblock subscriber stopping");
                return;
            }
        }

        tokio::select! {
            _ = sleep(RECONNECT_DELAY) => {}
            _ = shutdown.changed() => {
                info!("rawblock subscriber stopping");
                return;
            }
        }
    }
}

/// Subscribe to `rawtx` and check incoming transactions against watched UTXOs
pub async fn run_tx_subscriber(
    url: String,
    monitor: Arc<ListingMonitor>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            result = listen_transactions(&url, &monitor) => {
                if let Err(e) = result {
                    warn!("rawtx subscription lost ({url}): {e}");
                }
            }
            _ = shutdown.changed() => {
                info!("rawtx subscriber stopping");
                return;
            }
        }

        tokio::select! {
            _ = sleep(RECONNECT_DELAY) => {}
            _ = shutdown.changed() => {
                info!("rawtx subscriber stopping");
                return;
            }
        }
    }
}

async fn listen_blocks(url: &str, monitor: &ListingMonitor) -> Result<(), ZmqError> {
    let mut socket = SubSocket::new();
    socket.connect(url).await?;
    socket.subscribe("rawblock").await?;
    info!("subscribed to rawblock at {url}");

    loop {
        let message = socket.recv().await?;
        // Frames: topic, payload, sequence. The height is re-derived via
        // RPC inside the sweep, so the payload itself is not decoded.
        let frames = message.into_vec();
        if frames.len() < 2 {
            continue;
        }
        monitor.on_new_block().await;
    }
}

async fn listen_transactions(url: &str, monitor: &ListingMonitor) -> Result<(), ZmqError> {
    let mut socket = SubSocket::new();
    socket.connect(url).await?;
    socket.subscribe("rawtx").await?;
    info!("subscribed to rawtx at {url}");

    loop {
        let message = socket.recv().await?;
        let frames = message.into_vec();
        if frames.len() < 2 {
            continue;
        }
        monitor.on_raw_tx(&frames[1]).await;
    }
}
