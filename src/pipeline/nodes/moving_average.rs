//! MovingAverage — per-channel boxcar average over the last `window` samples.
//!
//! The number of channels is taken from the nearest upstream `channel_count`
//! at initialization, so a change of channel count upstream reinitializes
//! this node. Changing `window` only resets the history.

use crate::error::{ChainError, ChainResult};
use crate::pipeline::node::{NodeBehavior, NodeContext, ProcessorNode};
use crate::pipeline::packet::Chunk;
use crate::pipeline::value::AttrValue;
use std::collections::VecDeque;

const RESET_TRIGGERS: &[&str] = &["window"];
const REINIT_TRIGGERS: &[&str] = &["channel_count"];

/// Moving-average processor.
pub struct MovingAverage {
    history: Vec<VecDeque<f64>>,
}

impl MovingAverage {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
        }
    }

    /// Channels this node was initialized for.
    pub fn channel_count(&self) -> usize {
        self.history.len()
    }
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for MovingAverage {
    fn type_name(&self) -> &'static str {
        "MovingAverage"
    }

    fn declared_attributes(&self) -> Vec<(&'static str, AttrValue)> {
        vec![("window", AttrValue::Int(4))]
    }

    fn reset_triggers(&self) -> &'static [&'static str] {
        RESET_TRIGGERS
    }

    fn check_value(&self, name: &str, value: &AttrValue) -> Result<(), String> {
        match (name, value.as_int()) {
            ("window", Some(w)) if w >= 1 => Ok(()),
            ("window", Some(w)) => Err(format!("must be at least 1, got {}", w)),
            ("window", None) => Err(format!("expected an integer, got {}", value.kind_name())),
            _ => Err(format!("no such attribute '{}'", name)),
        }
    }

    fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        let channels = ctx
            .find_upstream("channel_count")?
            .as_int()
            .filter(|&n| n >= 1)
            .ok_or_else(|| {
                ChainError::compute("MovingAverage", "upstream channel_count is not a positive integer")
            })?;
        let window = ctx.int("window").unwrap_or(1).max(1) as usize;
        self.history = vec![VecDeque::with_capacity(window); channels as usize];
        Ok(())
    }

    fn reset(&mut self, _ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        for channel in &mut self.history {
            channel.clear();
        }
        Ok(())
    }

    fn compute(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<Option<Chunk>> {
        let Some(input) = ctx.input() else {
            return Ok(None);
        };
        if input.channel_count() != self.history.len() {
            return Err(ChainError::compute(
                "MovingAverage",
                format!(
                    "initialized for {} channels, got {}",
                    self.history.len(),
                    input.channel_count()
                ),
            ));
        }

        let window = ctx.int("window").unwrap_or(1).max(1) as usize;
        let mut output = input.clone();
        for (ch, history) in self.history.iter_mut().enumerate() {
            let (Some(src), Some(dst)) = (input.channel(ch), output.channel_mut(ch)) else {
                continue;
            };
            for (x, y) in src.iter().zip(dst.iter_mut()) {
                history.push_back(*x);
                while history.len() > window {
                    history.pop_front();
                }
                *y = history.iter().sum::<f64>() / history.len() as f64;
            }
        }
        Ok(Some(output))
    }
}

impl ProcessorNode for MovingAverage {
    fn reinit_triggers(&self) -> &'static [&'static str] {
        REINIT_TRIGGERS
    }
}
