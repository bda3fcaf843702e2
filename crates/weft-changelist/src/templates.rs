//! Template cache
//!
//! Detached prototype subtrees keyed by guest-chosen IDs. Saving deep-clones
//! the live node so later mutations of the document cannot reach the
//! prototype; pushing deep-clones the prototype so the pushed node cannot
//! either. Prototypes persist across frames and are never evicted.

use crate::error::ChangeError;
use fxhash::FxHashMap;
use weft_dom::NodeId;

#[derive(Debug, Default)]
pub(crate) struct TemplateCache {
    prototypes: FxHashMap<u32, NodeId>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// Store a prototype under a guest-chosen id, replacing any previous one
    pub fn save(&mut self, id: u32, prototype: NodeId) {
        self.prototypes.insert(id, prototype);
    }

    /// Resolve a prototype. Unknown ids are a protocol violation.
    pub fn get(&self, id: u32) -> Result<NodeId, ChangeError> {
        self.prototypes
            .get(&id)
            .copied()
            .ok_or(ChangeError::UnknownTemplate(id))
    }

    /// Resolve a prototype if present
    pub fn lookup(&self, id: u32) -> Option<NodeId> {
        self.prototypes.get(&id).copied()
    }
}
