//! Configurable nodes that record which hooks ran

use pullchain::pipeline::{
    AttrValue, Chunk, NodeBehavior, NodeContext, OutputNode, ProcessorNode, SourceNode,
};
use pullchain::{ChainError, ChainResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Hook invocation recorded by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Initialize,
    Reset,
    Compute,
}

/// Shared view of what a probe did, kept by the test after the node moved
/// into the chain
#[derive(Clone, Default)]
pub struct ProbeHandle {
    events: Arc<Mutex<Vec<Hook>>>,
    fail_initialize: Arc<AtomicBool>,
}

impl ProbeHandle {
    pub fn events(&self) -> Vec<Hook> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, hook: Hook) -> usize {
        self.events().iter().filter(|h| **h == hook).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Make initialize fail until cleared again
    pub fn set_fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    fn record(&self, hook: Hook) {
        self.events.lock().unwrap().push(hook);
    }
}

/// Node with configurable attributes and triggers
pub struct ProbeNode {
    name: &'static str,
    attributes: Vec<(&'static str, AttrValue)>,
    reset_triggers: &'static [&'static str],
    reinit_triggers: &'static [&'static str],
    lookups: Vec<&'static str>,
    write_on_initialize: Option<(&'static str, AttrValue)>,
    handle: ProbeHandle,
}

impl ProbeNode {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            reset_triggers: &[],
            reinit_triggers: &[],
            lookups: Vec::new(),
            write_on_initialize: None,
            handle: ProbeHandle::default(),
        }
    }

    pub fn attribute(mut self, name: &'static str, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    pub fn reset_triggers(mut self, names: &'static [&'static str]) -> Self {
        self.reset_triggers = names;
        self
    }

    pub fn reinit_triggers(mut self, names: &'static [&'static str]) -> Self {
        self.reinit_triggers = names;
        self
    }

    /// Look `name` up among the ancestors during initialize
    pub fn lookup_on_initialize(mut self, name: &'static str) -> Self {
        self.lookups.push(name);
        self
    }

    /// Write one of its own attributes from inside initialize
    pub fn write_on_initialize(mut self, name: &'static str, value: impl Into<AttrValue>) -> Self {
        self.write_on_initialize = Some((name, value.into()));
        self
    }

    pub fn handle(&self) -> ProbeHandle {
        self.handle.clone()
    }
}

impl NodeBehavior for ProbeNode {
    fn type_name(&self) -> &'static str {
        self.name
    }

    fn declared_attributes(&self) -> Vec<(&'static str, AttrValue)> {
        self.attributes.clone()
    }

    fn reset_triggers(&self) -> &'static [&'static str] {
        self.reset_triggers
    }

    fn check_value(&self, _name: &str, value: &AttrValue) -> Result<(), String> {
        match value.as_float() {
            Some(v) if v < 0.0 => Err(format!("must not be negative, got {}", v)),
            _ => Ok(()),
        }
    }

    fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        self.handle.record(Hook::Initialize);
        if self.handle.fail_initialize.load(Ordering::SeqCst) {
            return Err(ChainError::compute(self.name, "initialize refused"));
        }
        for name in &self.lookups {
            ctx.find_upstream(name)?;
        }
        if let Some((name, value)) = self.write_on_initialize.clone() {
            ctx.set(name, value)?;
        }
        Ok(())
    }

    fn reset(&mut self, _ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        self.handle.record(Hook::Reset);
        Ok(())
    }

    fn compute(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<Option<Chunk>> {
        self.handle.record(Hook::Compute);
        let chunk = match ctx.input() {
            Some(input) => input.clone(),
            None => Chunk::zeros(1, 1).with_timestamp(ctx.timestamp),
        };
        Ok(Some(chunk))
    }
}

impl SourceNode for ProbeNode {}

impl ProcessorNode for ProbeNode {
    fn reinit_triggers(&self) -> &'static [&'static str] {
        self.reinit_triggers
    }
}

impl OutputNode for ProbeNode {
    fn reinit_triggers(&self) -> &'static [&'static str] {
        self.reinit_triggers
    }
}
