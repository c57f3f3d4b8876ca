//! Gain — multiplies every sample by a constant.

use crate::error::{ChainError, ChainResult};
use crate::pipeline::node::{NodeBehavior, NodeContext, ProcessorNode};
use crate::pipeline::packet::Chunk;
use crate::pipeline::value::AttrValue;

/// Constant gain processor. Stateless, so it has no triggers.
pub struct Gain;

impl Gain {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for Gain {
    fn type_name(&self) -> &'static str {
        "Gain"
    }

    fn declared_attributes(&self) -> Vec<(&'static str, AttrValue)> {
        vec![("gain", AttrValue::Float(1.0))]
    }

    fn reset_triggers(&self) -> &'static [&'static str] {
        &[]
    }

    fn check_value(&self, name: &str, value: &AttrValue) -> Result<(), String> {
        match (name, value.as_float()) {
            ("gain", Some(g)) if g.is_finite() => Ok(()),
            ("gain", Some(g)) => Err(format!("must be finite, got {}", g)),
            ("gain", None) => Err(format!("expected a number, got {}", value.kind_name())),
            _ => Err(format!("no such attribute '{}'", name)),
        }
    }

    fn initialize(&mut self, _ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        Ok(())
    }

    fn reset(&mut self, _ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        Ok(())
    }

    fn compute(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<Option<Chunk>> {
        let gain = ctx
            .float("gain")
            .ok_or_else(|| ChainError::compute("Gain", "gain is not set"))?;
        Ok(ctx.input().map(|chunk| chunk.map(|v| v * gain)))
    }
}

impl ProcessorNode for Gain {
    fn reinit_triggers(&self) -> &'static [&'static str] {
        &[]
    }
}
