//! pullchain - Main Entry Point
//!
//! Loads a chain file (first argument, or the default location), builds the
//! chain and runs it on a driver thread until it stops.

use anyhow::Context;
use pullchain::{
    config::{self, ChainConfig},
    logging,
    pipeline::{ChainBridge, Driver, NodeFactory, SinkMessage, SystemClock},
};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => config::default_config_path()
            .context("Could not determine config directory")?,
    };

    let chain_config = ChainConfig::load_or_default(&path)?;
    logging::init(&chain_config.logging.filter)?;
    tracing::info!("Starting pullchain with {:?}", path);

    let (bridge, cmd_rx, msg_tx) = ChainBridge::new();
    let factory = NodeFactory::new(msg_tx.clone());
    let chain = chain_config
        .build_chain(&factory, Arc::new(SystemClock))
        .context("Failed to build chain")?;
    drop(factory);
    let mut driver = Driver::new(chain, chain_config.driver).with_bridge(cmd_rx, msg_tx);

    let driver_handle = std::thread::spawn(move || driver.run());

    let mut chunks = 0u64;
    let mut frames = 0usize;
    for msg in bridge.msg_rx.iter() {
        match msg {
            SinkMessage::Chunk(chunk) => {
                chunks += 1;
                frames += chunk.frames();
            }
            SinkMessage::Configured {
                frequency,
                channel_labels,
            } => {
                tracing::info!("Sink configured at {} Hz, channels {:?}", frequency, channel_labels);
            }
            SinkMessage::CycleError { cycle, message } => {
                tracing::warn!("Cycle {} failed: {}", cycle, message);
            }
            SinkMessage::AttributeRejected {
                node_id,
                attribute,
                error,
            } => {
                tracing::warn!("{:?}.{} rejected: {}", node_id, attribute, error);
            }
            SinkMessage::Snapshot(snapshot) => {
                tracing::debug!("{}", snapshot.to_json()?);
            }
            SinkMessage::Shutdown => break,
        }
    }

    let report = driver_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Driver thread panicked"))??;
    tracing::info!(
        "Finished: {} cycles ({} failed), {} chunks / {} frames received, stopped by {:?}",
        report.cycles,
        report.failed_cycles,
        chunks,
        frames,
        report.stop_reason
    );
    Ok(())
}
