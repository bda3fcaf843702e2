//! weft DOM - the live document mutated by the change-list interpreter
//!
//! Design principles:
//! 1. Arena-based allocation - all nodes live in one contiguous vector
//! 2. Compact node IDs - u32 indices instead of pointers
//! 3. Child vectors - indexed child access is what the wire protocol needs
//! 4. Detachment instead of deallocation - removed subtrees stay in the
//!    arena until the document is dropped, so node IDs are never reused

mod node;
mod tree;

pub use node::{ElementData, Node, NodeData, NodeType, TextData};
pub use tree::{DomError, DomResult, DomTree};

/// Node identifier - 4 bytes (vs 8 bytes for a pointer on 64-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Invalid/null node ID
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Document root ID (always 0)
    pub const ROOT: NodeId = NodeId(0);

    /// Check if this is a valid node ID
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Get the raw index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
