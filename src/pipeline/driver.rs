//! Driver — runs a chain cycle after cycle on the calling thread.
//!
//! The loop mirrors a classic executor: drain commands, check the stop
//! conditions, wait for the next tick, pull every node once. Spawn it on a
//! dedicated thread and talk to it through a [`ChainBridge`] when the
//! controller lives elsewhere.
//!
//! [`ChainBridge`]: crate::pipeline::bridge::ChainBridge

use crate::error::ChainResult;
use crate::pipeline::bridge::{ChainCommand, SinkMessage};
use crate::pipeline::chain::Chain;
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default cycle rate in Hz.
pub const DEFAULT_CYCLE_RATE_HZ: u32 = 100;

/// Driver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Target cycles per second. 0 runs unthrottled.
    pub cycle_rate_hz: u32,
    /// Stop after this many cycles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cycle_rate_hz: DEFAULT_CYCLE_RATE_HZ,
            max_cycles: None,
        }
    }
}

/// Why `Driver::run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// `running` was cleared or a shutdown command arrived.
    Requested,
    MaxCycles,
    /// Every source in the chain has outlived its lifetime.
    SourcesExpired,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriverReport {
    pub cycles: u64,
    /// Cycles that failed with a recoverable error.
    pub failed_cycles: u64,
    pub stop_reason: StopReason,
}

pub struct Driver {
    chain: Chain,
    settings: DriverConfig,
    running: Arc<AtomicBool>,
    cmd_rx: Option<Receiver<ChainCommand>>,
    msg_tx: Option<Sender<SinkMessage>>,
    last_cycle_time: Option<Instant>,
}

impl Driver {
    pub fn new(chain: Chain, settings: DriverConfig) -> Self {
        Self {
            chain,
            settings,
            running: Arc::new(AtomicBool::new(true)),
            cmd_rx: None,
            msg_tx: None,
            last_cycle_time: None,
        }
    }

    /// Accept commands from `cmd_rx` and report through `msg_tx`.
    pub fn with_bridge(mut self, cmd_rx: Receiver<ChainCommand>, msg_tx: Sender<SinkMessage>) -> Self {
        self.cmd_rx = Some(cmd_rx);
        self.msg_tx = Some(msg_tx);
        self
    }

    /// Clearing this flag stops the driver before its next cycle.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn settings(&self) -> &DriverConfig {
        &self.settings
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut Chain {
        &mut self.chain
    }

    pub fn into_chain(self) -> Chain {
        self.chain
    }

    /// Run until stopped.
    ///
    /// Recoverable pull errors skip the rest of the cycle and are counted in
    /// `failed_cycles`. A fatal error (a structurally broken chain) is
    /// returned immediately.
    pub fn run(&mut self) -> ChainResult<DriverReport> {
        tracing::info!(
            "Driver started: {} nodes, {} Hz",
            self.chain.len(),
            self.settings.cycle_rate_hz
        );
        let mut cycles = 0u64;
        let mut failed_cycles = 0u64;

        let stop_reason = loop {
            self.process_commands();
            if !self.running.load(Ordering::Relaxed) {
                break StopReason::Requested;
            }
            if self.settings.max_cycles.is_some_and(|max| cycles >= max) {
                break StopReason::MaxCycles;
            }
            if !self.chain.any_source_alive() {
                break StopReason::SourcesExpired;
            }

            self.rate_limit();
            self.last_cycle_time = Some(Instant::now());

            let cycle = self.chain.cycle();
            match self.chain.run_cycle() {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    tracing::error!("Driver aborting at cycle {}: {}", cycle, e);
                    self.send(SinkMessage::Shutdown);
                    return Err(e);
                }
                Err(e) => {
                    failed_cycles += 1;
                    self.send(SinkMessage::CycleError {
                        cycle,
                        message: e.to_string(),
                    });
                }
            }
            cycles += 1;
        };

        self.send(SinkMessage::Shutdown);
        let report = DriverReport {
            cycles,
            failed_cycles,
            stop_reason,
        };
        tracing::info!("Driver stopped: {:?}", report);
        Ok(report)
    }

    fn process_commands(&mut self) {
        let commands: Vec<ChainCommand> = match &self.cmd_rx {
            Some(rx) => rx.try_iter().collect(),
            None => return,
        };
        for cmd in commands {
            match cmd {
                ChainCommand::SetAttribute {
                    node_id,
                    name,
                    value,
                } => {
                    if let Err(e) = self.chain.set_attribute(node_id, &name, value) {
                        self.send(SinkMessage::AttributeRejected {
                            node_id,
                            attribute: name,
                            error: e.to_string(),
                        });
                    }
                }
                ChainCommand::RequestSnapshot => {
                    let snapshot = self.chain.snapshot();
                    self.send(SinkMessage::Snapshot(snapshot));
                }
                ChainCommand::Shutdown => {
                    tracing::info!("Driver received shutdown");
                    self.running.store(false, Ordering::Relaxed);
                }
            }
        }
    }

    fn send(&self, msg: SinkMessage) {
        if let Some(tx) = &self.msg_tx {
            let _ = tx.try_send(msg);
        }
    }

    fn rate_limit(&self) {
        if self.settings.cycle_rate_hz == 0 {
            return;
        }

        let target_interval = Duration::from_nanos(1_000_000_000 / self.settings.cycle_rate_hz as u64);

        if let Some(last) = self.last_cycle_time {
            let elapsed = last.elapsed();
            if elapsed < target_interval {
                let remaining = target_interval - elapsed;
                // Spin for sub-millisecond accuracy, sleep for larger waits
                if remaining > Duration::from_millis(2) {
                    std::thread::sleep(remaining - Duration::from_millis(1));
                }
                while last.elapsed() < target_interval {
                    std::hint::spin_loop();
                }
            }
        }
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("chain", &self.chain)
            .field("settings", &self.settings)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}
