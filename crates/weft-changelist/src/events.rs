//! Event dispatch
//!
//! Every listener the guest installs shares one host-side handler. Per
//! element and event type the registry stores two opaque 32-bit payloads
//! `(a, b)` - typically a function identifier and a closure index in guest
//! memory. Dispatch resolves the payloads from the element the handler is
//! attached to and forwards `(event, a, b)` to the guest trampoline, so
//! updating a listener is a payload overwrite with no DOM traffic.
//!
//! Annotations live in a side table keyed by node, not on the nodes
//! themselves; when the interpreter detaches a subtree it frees the whole
//! table slice for that subtree.

use fxhash::FxHashMap;
use weft_dom::{DomTree, NodeId};

use crate::error::ChangeError;

/// An event delivered to the guest
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    /// The node the event was fired at
    pub target: NodeId,
    /// The annotated element the shared handler resolved payloads from
    pub current_target: NodeId,
}

/// Callback forwarding events into the guest
pub type EventsTrampoline = Box<dyn FnMut(Event, u32, u32)>;

#[derive(Debug, Clone, Copy)]
struct EventAnnotation {
    a: u32,
    b: u32,
    /// Shared-handler registrations performed for this (element, type).
    /// Stays at one across any number of payload updates.
    registrations: u32,
}

#[derive(Default)]
pub(crate) struct EventRegistry {
    annotations: FxHashMap<NodeId, FxHashMap<String, EventAnnotation>>,
    trampoline: Option<EventsTrampoline>,
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("annotated_nodes", &self.annotations.len())
            .field("has_trampoline", &self.trampoline.is_some())
            .finish()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Bind the single shared trampoline used by every annotation
    pub fn init_trampoline(&mut self, trampoline: EventsTrampoline) {
        self.trampoline = Some(trampoline);
    }

    /// Annotate `(node, event_type)` with payloads, registering the shared
    /// handler if this event type is new on the node
    pub fn add(
        &mut self,
        node: NodeId,
        event_type: &str,
        a: u32,
        b: u32,
    ) -> Result<(), ChangeError> {
        if self.trampoline.is_none() {
            return Err(ChangeError::NoTrampoline);
        }
        let by_type = self.annotations.entry(node).or_default();
        match by_type.get_mut(event_type) {
            Some(annotation) => {
                annotation.a = a;
                annotation.b = b;
            }
            None => {
                by_type.insert(
                    event_type.to_string(),
                    EventAnnotation {
                        a,
                        b,
                        registrations: 1,
                    },
                );
            }
        }
        Ok(())
    }

    /// Overwrite payloads in place. Touches no handler registration, even
    /// when the annotation did not exist yet.
    pub fn update(&mut self, node: NodeId, event_type: &str, a: u32, b: u32) {
        let by_type = self.annotations.entry(node).or_default();
        match by_type.get_mut(event_type) {
            Some(annotation) => {
                annotation.a = a;
                annotation.b = b;
            }
            None => {
                by_type.insert(
                    event_type.to_string(),
                    EventAnnotation {
                        a,
                        b,
                        registrations: 0,
                    },
                );
            }
        }
    }

    /// Drop the annotation for `(node, event_type)`
    pub fn remove(&mut self, node: NodeId, event_type: &str) {
        if let Some(by_type) = self.annotations.get_mut(&node) {
            by_type.remove(event_type);
            if by_type.is_empty() {
                self.annotations.remove(&node);
            }
        }
    }

    /// Free every annotation belonging to the given nodes. Called when a
    /// subtree leaves the document, so annotations share the element's
    /// lifetime without a compensating removeEventListener.
    pub fn remove_subtree(&mut self, nodes: &[NodeId]) {
        for node in nodes {
            self.annotations.remove(node);
        }
    }

    /// Payloads stored for `(node, event_type)`
    pub fn payloads(&self, node: NodeId, event_type: &str) -> Option<(u32, u32)> {
        self.annotations
            .get(&node)
            .and_then(|by_type| by_type.get(event_type))
            .map(|annotation| (annotation.a, annotation.b))
    }

    /// Shared-handler registrations performed for `(node, event_type)`
    pub fn registrations(&self, node: NodeId, event_type: &str) -> u32 {
        self.annotations
            .get(&node)
            .and_then(|by_type| by_type.get(event_type))
            .map(|annotation| annotation.registrations)
            .unwrap_or(0)
    }

    /// Deliver an event fired at `target`: walk ancestor-or-self for the
    /// nearest annotated element and forward its payloads to the trampoline.
    /// Returns whether a listener fired.
    pub fn dispatch(
        &mut self,
        doc: &DomTree,
        event_type: &str,
        target: NodeId,
    ) -> Result<bool, ChangeError> {
        let mut node = target;
        while node.is_valid() {
            if let Some((a, b)) = self.payloads(node, event_type) {
                let trampoline = self.trampoline.as_mut().ok_or(ChangeError::NoTrampoline)?;
                tracing::trace!(?node, event_type, a, b, "dispatching event to guest");
                trampoline(
                    Event {
                        event_type: event_type.to_string(),
                        target,
                        current_target: node,
                    },
                    a,
                    b,
                );
                return Ok(true);
            }
            node = doc.get(node).map(|n| n.parent).unwrap_or(NodeId::NONE);
        }
        tracing::warn!(?target, event_type, "event fired with no annotated element in scope");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_registry() -> (EventRegistry, Rc<RefCell<Vec<(String, u32, u32)>>>) {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);
        let mut registry = EventRegistry::new();
        registry.init_trampoline(Box::new(move |event, a, b| {
            sink.borrow_mut().push((event.event_type, a, b));
        }));
        (registry, fired)
    }

    #[test]
    fn test_add_requires_trampoline() {
        let mut registry = EventRegistry::new();
        assert!(matches!(
            registry.add(NodeId(1), "click", 1, 2),
            Err(ChangeError::NoTrampoline)
        ));
    }

    #[test]
    fn test_update_keeps_single_registration() {
        let (mut registry, _) = recording_registry();
        registry.add(NodeId(1), "click", 7, 8).unwrap();
        registry.update(NodeId(1), "click", 9, 10);
        registry.add(NodeId(1), "click", 11, 12).unwrap();

        assert_eq!(registry.payloads(NodeId(1), "click"), Some((11, 12)));
        assert_eq!(registry.registrations(NodeId(1), "click"), 1);
    }

    #[test]
    fn test_dispatch_bubbles_to_annotated_ancestor() {
        let mut doc = DomTree::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append_child(doc.root(), outer).unwrap();
        doc.append_child(outer, inner).unwrap();

        let (mut registry, fired) = recording_registry();
        registry.add(outer, "click", 3, 4).unwrap();

        assert!(registry.dispatch(&doc, "click", inner).unwrap());
        assert!(!registry.dispatch(&doc, "keydown", inner).unwrap());
        assert_eq!(fired.borrow().as_slice(), &[("click".to_string(), 3, 4)]);
    }

    #[test]
    fn test_remove_subtree_frees_annotations() {
        let (mut registry, _) = recording_registry();
        registry.add(NodeId(1), "click", 1, 1).unwrap();
        registry.add(NodeId(2), "input", 2, 2).unwrap();

        registry.remove_subtree(&[NodeId(1), NodeId(2)]);
        assert_eq!(registry.payloads(NodeId(1), "click"), None);
        assert_eq!(registry.payloads(NodeId(2), "input"), None);
    }
}
