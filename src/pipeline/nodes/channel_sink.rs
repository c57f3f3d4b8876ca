//! ChannelSink — forwards chunks to another thread via crossbeam channel.
//!
//! Every (re)initialization is announced with `SinkMessage::Configured`,
//! carrying the upstream frequency and channel labels, so the receiving side
//! can rescale whatever it keeps for the stream.

use crate::error::{ChainError, ChainResult};
use crate::pipeline::bridge::SinkMessage;
use crate::pipeline::node::{NodeBehavior, NodeContext, OutputNode};
use crate::pipeline::packet::Chunk;
use crate::pipeline::value::AttrValue;
use crossbeam_channel::Sender;

const REINIT_TRIGGERS: &[&str] = &["frequency", "channel_labels"];

/// Output node. Never produces output of its own.
pub struct ChannelSink {
    tx: Sender<SinkMessage>,
    dropped: u64,
    forwarded: u64,
}

impl ChannelSink {
    pub fn new(tx: Sender<SinkMessage>) -> Self {
        Self {
            tx,
            dropped: 0,
            forwarded: 0,
        }
    }

    /// Messages lost to a full channel.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }
}

impl NodeBehavior for ChannelSink {
    fn type_name(&self) -> &'static str {
        "ChannelSink"
    }

    fn declared_attributes(&self) -> Vec<(&'static str, AttrValue)> {
        vec![("enabled", AttrValue::Bool(true))]
    }

    fn reset_triggers(&self) -> &'static [&'static str] {
        &[]
    }

    fn check_value(&self, name: &str, value: &AttrValue) -> Result<(), String> {
        match (name, value.as_bool()) {
            ("enabled", Some(_)) => Ok(()),
            ("enabled", None) => Err(format!("expected a boolean, got {}", value.kind_name())),
            _ => Err(format!("no such attribute '{}'", name)),
        }
    }

    fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        let frequency = ctx.find_upstream("frequency")?.as_float().ok_or_else(|| {
            ChainError::compute("ChannelSink", "upstream frequency is not a number")
        })?;
        let channel_labels = ctx
            .find_upstream("channel_labels")?
            .as_list()
            .ok_or_else(|| ChainError::compute("ChannelSink", "upstream channel_labels is not a list"))?
            .to_vec();
        let configured = SinkMessage::Configured {
            frequency,
            channel_labels,
        };
        if self.tx.try_send(configured).is_err() {
            self.dropped += 1;
        }
        Ok(())
    }

    fn reset(&mut self, _ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        Ok(())
    }

    fn compute(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<Option<Chunk>> {
        if ctx.get("enabled").and_then(AttrValue::as_bool) == Some(false) {
            return Ok(None);
        }
        let Some(input) = ctx.input() else {
            return Ok(None);
        };
        if self.tx.try_send(SinkMessage::Chunk(input.clone())).is_err() {
            self.dropped += 1;
            if self.dropped.is_power_of_two() {
                tracing::warn!("ChannelSink dropped {} messages due to backpressure", self.dropped);
            }
        } else {
            self.forwarded += 1;
        }
        Ok(None)
    }
}

impl OutputNode for ChannelSink {
    fn reinit_triggers(&self) -> &'static [&'static str] {
        REINIT_TRIGGERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::chain::Chain;
    use crate::pipeline::nodes::{Gain, SyntheticSource};
    use crossbeam_channel::bounded;

    #[test]
    fn test_announces_frequency_and_forwards() {
        let (tx, rx) = bounded(16);
        let mut chain = Chain::new();
        let src = chain.add_source(SyntheticSource::new()).unwrap();
        let sink = chain.add_output(ChannelSink::new(tx), src).unwrap();
        chain.run_cycle().unwrap();

        assert!(matches!(rx.try_recv().unwrap(), SinkMessage::Configured { frequency, .. } if frequency == 256.0));
        assert!(matches!(rx.try_recv().unwrap(), SinkMessage::Chunk(_)));
        assert!(chain.output(sink).is_none());
    }

    #[test]
    fn test_frequency_change_reannounces() {
        let (tx, rx) = bounded(16);
        let mut chain = Chain::new();
        let src = chain.add_source(SyntheticSource::new()).unwrap();
        chain.add_output(ChannelSink::new(tx), src).unwrap();
        chain.run_cycle().unwrap();
        let _ = rx.try_iter().count();

        chain.set_attribute(src, "frequency", 512.0).unwrap();
        chain.run_cycle().unwrap();
        assert!(matches!(rx.try_recv().unwrap(), SinkMessage::Configured { frequency, .. } if frequency == 512.0));
    }

    #[test]
    fn test_disabled_forwards_nothing() {
        let (tx, rx) = bounded(16);
        let mut chain = Chain::new();
        let src = chain.add_source(SyntheticSource::new()).unwrap();
        let sink = chain.add_output(ChannelSink::new(tx), src).unwrap();
        chain.set_attribute(sink, "enabled", false).unwrap();
        chain.run_cycle().unwrap();

        let msgs: Vec<_> = rx.try_iter().collect();
        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0], SinkMessage::Configured { .. }));
    }

    #[test]
    fn test_finds_frequency_two_hops_up() {
        let (tx, rx) = bounded(4);
        let mut chain = Chain::new();
        let src = chain.add_source(SyntheticSource::new()).unwrap();
        let gain = chain.add_processor(Gain::new(), src).unwrap();
        chain.add_output(ChannelSink::new(tx), gain).unwrap();
        chain.run_cycle().unwrap();
        match rx.try_recv().unwrap() {
            SinkMessage::Configured { channel_labels, .. } => {
                assert_eq!(channel_labels, vec!["ch1", "ch2", "ch3", "ch4"]);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_channel_count_change_reannounces_labels() {
        let (tx, rx) = bounded(16);
        let mut chain = Chain::new();
        let src = chain.add_source(SyntheticSource::new()).unwrap();
        let gain = chain.add_processor(Gain::new(), src).unwrap();
        let sink = chain.add_output(ChannelSink::new(tx), gain).unwrap();
        chain.run_cycle().unwrap();
        let _ = rx.try_iter().count();

        chain.set_attribute(src, "channel_count", 2).unwrap();
        chain.run_cycle().unwrap();

        let labels: Vec<String> = vec!["ch1".into(), "ch2".into()];
        assert_eq!(chain.find_upstream(sink, "channel_labels").unwrap().as_list(), Some(&labels[..]));
        assert_eq!(
            chain.upstream_snapshot(sink).unwrap().get("channel_labels"),
            Some(&AttrValue::List(labels.clone()))
        );
        match rx.try_recv().unwrap() {
            SinkMessage::Configured { frequency, channel_labels } => {
                assert_eq!(frequency, 256.0);
                assert_eq!(channel_labels, labels);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }
}
