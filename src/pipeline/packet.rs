//! Multi-channel sample block passed between nodes.
//!
//! A `Chunk` stores `channel_count` rows of `frames` samples each in one
//! contiguous row-major buffer, so a channel is always a plain slice.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dense block of samples: `channel_count` rows × `frames` columns.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Time of the cycle that produced this chunk, relative to chain start.
    pub timestamp: Duration,
    channel_count: usize,
    data: Vec<f64>,
}

impl Chunk {
    /// Create a chunk from a row-major buffer.
    ///
    /// Returns `None` if the buffer does not divide evenly into channels.
    pub fn new(channel_count: usize, data: Vec<f64>) -> Option<Self> {
        if channel_count == 0 {
            return if data.is_empty() {
                Some(Self {
                    timestamp: Duration::ZERO,
                    channel_count,
                    data,
                })
            } else {
                None
            };
        }
        if data.len() % channel_count != 0 {
            return None;
        }
        Some(Self {
            timestamp: Duration::ZERO,
            channel_count,
            data,
        })
    }

    /// Create a zero-filled chunk.
    pub fn zeros(channel_count: usize, frames: usize) -> Self {
        Self {
            timestamp: Duration::ZERO,
            channel_count,
            data: vec![0.0; channel_count * frames],
        }
    }

    /// Build a chunk from per-channel vectors. All channels must share a length.
    pub fn from_channels(channels: &[Vec<f64>]) -> Option<Self> {
        let frames = channels.first().map(Vec::len).unwrap_or(0);
        if channels.iter().any(|c| c.len() != frames) {
            return None;
        }
        let data = channels.iter().flatten().copied().collect();
        Some(Self {
            timestamp: Duration::ZERO,
            channel_count: channels.len(),
            data,
        })
    }

    pub fn with_timestamp(mut self, timestamp: Duration) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Samples per channel.
    #[inline]
    pub fn frames(&self) -> usize {
        if self.channel_count == 0 {
            0
        } else {
            self.data.len() / self.channel_count
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Samples of one channel.
    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        if index >= self.channel_count {
            return None;
        }
        let frames = self.frames();
        Some(&self.data[index * frames..(index + 1) * frames])
    }

    /// Mutable samples of one channel.
    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f64]> {
        if index >= self.channel_count {
            return None;
        }
        let frames = self.frames();
        Some(&mut self.data[index * frames..(index + 1) * frames])
    }

    /// Iterate over channels as slices.
    pub fn channels(&self) -> impl Iterator<Item = &[f64]> {
        let frames = self.frames().max(1);
        self.data.chunks(frames)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Apply `f` to every sample, keeping shape and timestamp.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Chunk {
        Chunk {
            timestamp: self.timestamp,
            channel_count: self.channel_count,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("timestamp", &self.timestamp)
            .field("channel_count", &self.channel_count)
            .field("frames", &self.frames())
            .finish()
    }
}
