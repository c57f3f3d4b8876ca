//! Identity types for the chain.
//!
//! `NodeId` is a newtype over `u32` that serves as a direct index into
//! `Chain::slots`. Ids are handed out in insertion order, and a node can only
//! be linked to an already existing predecessor, so a predecessor's id is
//! always smaller than its successor's.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into `Chain::slots`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Fails for indices beyond the `u32` range.
impl TryFrom<usize> for NodeId {
    type Error = std::num::TryFromIntError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        u32::try_from(index).map(NodeId)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
