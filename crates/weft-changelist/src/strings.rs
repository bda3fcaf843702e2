//! Cached strings
//!
//! Short strings (tag names, attribute names, event types) cross the wire
//! once and are referenced by guest-chosen IDs afterwards. The guest owns
//! the IDs and their lifetimes; the cache never evicts on its own.

use crate::error::ChangeError;
use fxhash::FxHashMap;

#[derive(Debug, Default)]
pub(crate) struct StringCache {
    entries: FxHashMap<u32, String>,
}

impl StringCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// Intern a string under a guest-chosen id. Re-adding an id overwrites
    /// it; ordering drops before re-adds is the guest's responsibility.
    pub fn add(&mut self, id: u32, string: String) {
        self.entries.insert(id, string);
    }

    /// Drop an interned string. Dropping an absent id is a no-op.
    pub fn remove(&mut self, id: u32) {
        self.entries.remove(&id);
    }

    /// Resolve an id. Unknown ids are a protocol violation.
    pub fn get(&self, id: u32) -> Result<&str, ChangeError> {
        self.entries
            .get(&id)
            .map(String::as_str)
            .ok_or(ChangeError::UnknownString(id))
    }

    /// Resolve an id if present
    pub fn lookup(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }
}
