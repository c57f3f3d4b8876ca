//! SyntheticSource — deterministic test-signal generator.
//!
//! Emits one chunk per pull. Channel `k` carries a unit sine at `k + 1` Hz,
//! sampled at `frequency`. The sample counter runs across pulls so
//! consecutive chunks join up; reset rewinds it to zero.
//!
//! Declares the attributes every source carries (`frequency`, `dtype`,
//! `channel_count`, `channel_labels`, `source_name`) plus `chunk_size`.
//! Labels left at their generated `ch1..chN` form follow `channel_count`;
//! custom labels must match it by the next initialize or reset.

use crate::error::{ChainError, ChainResult};
use crate::pipeline::node::{NodeBehavior, NodeContext, SourceNode};
use crate::pipeline::packet::Chunk;
use crate::pipeline::value::AttrValue;
use std::f64::consts::TAU;

/// Upper bound on `channel_count`.
pub const MAX_CHANNELS: i64 = 1024;
/// Upper bound on `chunk_size`.
pub const MAX_CHUNK_SIZE: i64 = 65_536;

const DEFAULT_CHANNELS: usize = 4;

const RESET_TRIGGERS: &[&str] = &[
    "frequency",
    "dtype",
    "channel_count",
    "channel_labels",
    "chunk_size",
    "source_name",
];

/// `ch1..chN`
pub fn default_labels(count: usize) -> Vec<String> {
    (1..=count).map(|k| format!("ch{}", k)).collect()
}

/// Sine generator source.
pub struct SyntheticSource {
    sample_index: u64,
    generated_labels: Vec<String>,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            sample_index: 0,
            generated_labels: default_labels(DEFAULT_CHANNELS),
        }
    }

    /// Bring `channel_labels` in line with `channel_count`.
    ///
    /// Empty or generated labels are regenerated; custom labels of the wrong
    /// length are an error, left pending until the user fixes one side.
    fn sync_labels(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        let count = ctx.int("channel_count").unwrap_or_default().max(0) as usize;
        let current = ctx
            .get("channel_labels")
            .and_then(AttrValue::as_list)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        if current.len() == count {
            return Ok(());
        }
        if current.is_empty() || current == self.generated_labels {
            self.generated_labels = default_labels(count);
            return ctx.set("channel_labels", self.generated_labels.clone());
        }
        Err(ChainError::InvalidConfiguration {
            node_type: "SyntheticSource".to_string(),
            attribute: "channel_labels".to_string(),
            reason: format!("{} labels for {} channels", current.len(), count),
        })
    }

    /// Samples emitted since the last initialize or reset.
    pub fn sample_index(&self) -> u64 {
        self.sample_index
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for SyntheticSource {
    fn type_name(&self) -> &'static str {
        "SyntheticSource"
    }

    fn declared_attributes(&self) -> Vec<(&'static str, AttrValue)> {
        vec![
            ("frequency", AttrValue::Float(256.0)),
            ("dtype", AttrValue::Text("float64".to_string())),
            ("channel_count", AttrValue::Int(DEFAULT_CHANNELS as i64)),
            ("channel_labels", AttrValue::List(default_labels(DEFAULT_CHANNELS))),
            ("chunk_size", AttrValue::Int(32)),
            ("source_name", AttrValue::Text("synthetic".to_string())),
        ]
    }

    fn reset_triggers(&self) -> &'static [&'static str] {
        RESET_TRIGGERS
    }

    fn check_value(&self, name: &str, value: &AttrValue) -> Result<(), String> {
        match name {
            "frequency" => match value.as_float() {
                Some(f) if f.is_finite() && f > 0.0 => Ok(()),
                Some(f) => Err(format!("must be positive and finite, got {}", f)),
                None => Err(format!("expected a number, got {}", value.kind_name())),
            },
            "channel_count" => match value.as_int() {
                Some(n) if (1..=MAX_CHANNELS).contains(&n) => Ok(()),
                Some(n) => Err(format!("must be in 1..={}, got {}", MAX_CHANNELS, n)),
                None => Err(format!("expected an integer, got {}", value.kind_name())),
            },
            "dtype" => match value.as_str() {
                Some("float32" | "float64") => Ok(()),
                Some(other) => Err(format!("must be float32 or float64, got {:?}", other)),
                None => Err(format!("expected text, got {}", value.kind_name())),
            },
            "channel_labels" => match value.as_list() {
                Some(labels) if labels.iter().any(|l| l.trim().is_empty()) => {
                    Err("labels must not be empty".to_string())
                }
                Some(labels) => {
                    let mut seen = std::collections::BTreeSet::new();
                    match labels.iter().find(|l| !seen.insert(l.as_str())) {
                        Some(dup) => Err(format!("duplicate label {:?}", dup)),
                        None => Ok(()),
                    }
                }
                None => Err(format!("expected a list, got {}", value.kind_name())),
            },
            "chunk_size" => match value.as_int() {
                Some(n) if (1..=MAX_CHUNK_SIZE).contains(&n) => Ok(()),
                Some(n) => Err(format!("must be in 1..={}, got {}", MAX_CHUNK_SIZE, n)),
                None => Err(format!("expected an integer, got {}", value.kind_name())),
            },
            "source_name" => match value.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(()),
                Some(_) => Err("must not be empty".to_string()),
                None => Err(format!("expected text, got {}", value.kind_name())),
            },
            _ => Err(format!("no such attribute '{}'", name)),
        }
    }

    fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        self.sync_labels(ctx)?;
        self.sample_index = 0;
        tracing::info!(
            "SyntheticSource '{}' streaming at {} Hz",
            ctx.get("source_name").and_then(AttrValue::as_str).unwrap_or("?"),
            ctx.float("frequency").unwrap_or_default()
        );
        Ok(())
    }

    fn reset(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        self.sync_labels(ctx)?;
        self.sample_index = 0;
        Ok(())
    }

    fn compute(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<Option<Chunk>> {
        let missing = |name: &str| ChainError::compute("SyntheticSource", format!("{} is not set", name));
        let frequency = ctx.float("frequency").ok_or_else(|| missing("frequency"))?;
        let channels = ctx.int("channel_count").ok_or_else(|| missing("channel_count"))? as usize;
        let frames = ctx.int("chunk_size").ok_or_else(|| missing("chunk_size"))? as usize;
        let single = ctx.get("dtype").and_then(AttrValue::as_str) == Some("float32");

        let mut chunk = Chunk::zeros(channels, frames).with_timestamp(ctx.timestamp);
        for ch in 0..channels {
            let tone = (ch + 1) as f64;
            if let Some(samples) = chunk.channel_mut(ch) {
                for (i, sample) in samples.iter_mut().enumerate() {
                    let t = (self.sample_index + i as u64) as f64 / frequency;
                    let value = (TAU * tone * t).sin();
                    *sample = if single { value as f32 as f64 } else { value };
                }
            }
        }
        self.sample_index += frames as u64;
        Ok(Some(chunk))
    }
}

impl SourceNode for SyntheticSource {}
