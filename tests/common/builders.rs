//! Test data builders for creating test chains

use super::probes::{ProbeHandle, ProbeNode};
use pullchain::pipeline::{Chain, Clock, NodeId};
use std::sync::Arc;

/// Source(frequency) → Processor(reinit on frequency) → Output
pub struct ScenarioChain {
    pub chain: Chain,
    pub source: NodeId,
    pub processor: NodeId,
    pub output: NodeId,
    pub source_probe: ProbeHandle,
    pub processor_probe: ProbeHandle,
    pub output_probe: ProbeHandle,
}

impl ScenarioChain {
    pub fn new() -> Self {
        Self::with_chain(Chain::new())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_chain(Chain::with_clock(clock))
    }

    fn with_chain(mut chain: Chain) -> Self {
        let source = ProbeNode::new("Source")
            .attribute("frequency", 256.0)
            .attribute("gain", 1.0)
            .reset_triggers(&["frequency"]);
        let processor = ProbeNode::new("Processor")
            .attribute("window", 4i64)
            .reset_triggers(&["window"])
            .reinit_triggers(&["frequency"]);
        let output = ProbeNode::new("Output");

        let (source_probe, processor_probe, output_probe) =
            (source.handle(), processor.handle(), output.handle());

        let source = chain.add_source(source).unwrap();
        let processor = chain.add_processor(processor, source).unwrap();
        let output = chain.add_output(output, processor).unwrap();

        Self {
            chain,
            source,
            processor,
            output,
            source_probe,
            processor_probe,
            output_probe,
        }
    }

    /// Pull every node once and forget the hooks recorded so far
    pub fn settle(&mut self) {
        self.chain.run_cycle().unwrap();
        self.source_probe.clear();
        self.processor_probe.clear();
        self.output_probe.clear();
    }
}

/// Linear chain of `len` pass-through probes below a head declaring `name`
pub fn probe_chain(len: usize, name: &'static str) -> (Chain, Vec<NodeId>) {
    let mut chain = Chain::new();
    let mut ids = vec![chain
        .add_source(ProbeNode::new("Head").attribute(name, 1i64))
        .unwrap()];
    for _ in 1..len {
        let last = *ids.last().unwrap();
        ids.push(chain.add_processor(ProbeNode::new("Link"), last).unwrap());
    }
    (chain, ids)
}
