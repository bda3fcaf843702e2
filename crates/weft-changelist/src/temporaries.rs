//! Temporaries table
//!
//! Sparse integer-indexed slots for nodes pulled out of the tree mid
//! traversal and reused later in the same frame. Cleared at frame end.

use crate::error::ChangeError;
use fxhash::FxHashMap;
use weft_dom::NodeId;

#[derive(Debug, Default)]
pub(crate) struct Temporaries {
    slots: FxHashMap<u32, NodeId>,
}

impl Temporaries {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn save(&mut self, slot: u32, node: NodeId) {
        self.slots.insert(slot, node);
    }

    pub fn get(&self, slot: u32) -> Result<NodeId, ChangeError> {
        self.slots
            .get(&slot)
            .copied()
            .ok_or(ChangeError::EmptyTemporary(slot))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
