//! Change-list interpreter
//!
//! The frame controller and dispatch loop. A guest submits one or more
//! (offset, length) ranges pointing into shared memory, then commits the
//! frame; the interpreter walks each range word by word and applies the
//! decoded mutations to the document rooted at the container.
//!
//! Per-frame state (cursor, ranges, temporaries) is cleared after a
//! successful commit; strings and templates persist until the guest drops
//! them. A failed range leaves everything as-is and poisons the frame - the
//! host is expected to unmount.

use weft_dom::{DomError, DomTree, NodeId};

use crate::cursor::Cursor;
use crate::error::ChangeError;
use crate::events::{Event, EventRegistry};
use crate::memory::{MemoryView, SharedMemory};
use crate::opcode::Opcode;
use crate::strings::StringCache;
use crate::temporaries::Temporaries;
use crate::templates::TemplateCache;

/// One guest-submitted slice of the change list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeListRange {
    /// Byte offset into shared memory, a multiple of 4
    pub offset: u32,
    /// Byte length, a multiple of 4
    pub length: u32,
}

/// Applies change lists to the document subtree rooted at a container
/// element.
///
/// ```
/// use weft_changelist::{ChangeListEncoder, ChangeListInterpreter};
/// use weft_dom::DomTree;
///
/// let mut doc = DomTree::new();
/// let container = doc.create_element("main");
/// doc.append_child(doc.root(), container).unwrap();
///
/// let mut encoder = ChangeListEncoder::new();
/// let tag = encoder.ensure_string("div");
/// encoder.create_element(tag);
/// encoder.append_child();
/// let list = encoder.finish();
///
/// let mut interpreter = ChangeListInterpreter::new(container);
/// for range in list.ranges() {
///     interpreter.add_change_list_range(range.offset, range.length).unwrap();
/// }
/// interpreter.apply_changes(&mut doc, &list).unwrap();
///
/// assert_eq!(doc.outer_html(container).unwrap(), "<main><div></div></main>");
/// ```
#[derive(Debug)]
pub struct ChangeListInterpreter {
    /// Taken to `None` by unmount; every public call fails from then on
    state: Option<InterpreterState>,
}

#[derive(Debug)]
struct InterpreterState {
    container: NodeId,
    cursor: Cursor,
    ranges: Vec<ChangeListRange>,
    strings: StringCache,
    temporaries: Temporaries,
    templates: TemplateCache,
    events: EventRegistry,
}

impl ChangeListInterpreter {
    /// Construct an interpreter managing the subtree under `container`
    pub fn new(container: NodeId) -> Self {
        Self {
            state: Some(InterpreterState {
                container,
                cursor: Cursor::new(),
                ranges: Vec::new(),
                strings: StringCache::new(),
                temporaries: Temporaries::new(),
                templates: TemplateCache::new(),
                events: EventRegistry::new(),
            }),
        }
    }

    fn state(&self) -> Result<&InterpreterState, ChangeError> {
        self.state.as_ref().ok_or(ChangeError::Unmounted)
    }

    fn state_mut(&mut self) -> Result<&mut InterpreterState, ChangeError> {
        self.state.as_mut().ok_or(ChangeError::Unmounted)
    }

    /// The container element this interpreter was constructed with
    pub fn container(&self) -> Result<NodeId, ChangeError> {
        Ok(self.state()?.container)
    }

    /// Queue a change-list range for the next commit
    pub fn add_change_list_range(&mut self, offset: u32, length: u32) -> Result<(), ChangeError> {
        let state = self.state_mut()?;
        state.ranges.push(ChangeListRange { offset, length });
        Ok(())
    }

    /// Ranges queued and not yet consumed by a commit
    pub fn pending_ranges(&self) -> Result<usize, ChangeError> {
        Ok(self.state()?.ranges.len())
    }

    /// Depth of the traversal cursor; zero between frames
    pub fn cursor_depth(&self) -> Result<usize, ChangeError> {
        Ok(self.state()?.cursor.depth())
    }

    /// Commit the frame: execute every queued range in submission order,
    /// then clear the per-frame state. With no queued ranges this returns
    /// immediately. On error the frame is abandoned mid-mutation and the
    /// error propagates.
    ///
    /// `doc` must be the document that owns the container (templates and
    /// temporaries are node references into it).
    pub fn apply_changes<M>(&mut self, doc: &mut DomTree, memory: &M) -> Result<(), ChangeError>
    where
        M: SharedMemory + ?Sized,
    {
        let state = self.state_mut()?;
        if state.ranges.is_empty() {
            return Ok(());
        }
        let view = MemoryView::new(memory.buffer());
        tracing::debug!(ranges = state.ranges.len(), "applying change list");

        state.cursor.seed(state.container);
        for index in 0..state.ranges.len() {
            let range = state.ranges[index];
            state.run_range(doc, view, range)?;
        }

        state.cursor.clear();
        state.temporaries.clear();
        state.ranges.clear();
        Ok(())
    }

    /// Bind the callback that forwards `(event, a, b)` into the guest
    pub fn init_events_trampoline<F>(&mut self, trampoline: F) -> Result<(), ChangeError>
    where
        F: FnMut(Event, u32, u32) + 'static,
    {
        self.state_mut()?
            .events
            .init_trampoline(Box::new(trampoline));
        Ok(())
    }

    /// Deliver a DOM event fired at `target`. Resolves the nearest
    /// annotated ancestor-or-self element and invokes the trampoline with
    /// that element's payload pair. Returns whether a listener fired.
    pub fn dispatch_event(
        &mut self,
        doc: &DomTree,
        event_type: &str,
        target: NodeId,
    ) -> Result<bool, ChangeError> {
        self.state_mut()?.events.dispatch(doc, event_type, target)
    }

    /// Tear the interpreter down. Any public call afterwards, including
    /// event dispatch, fails with [`ChangeError::Unmounted`].
    pub fn unmount(&mut self) -> Result<(), ChangeError> {
        self.state().map(|_| ())?;
        tracing::debug!("unmounting change-list interpreter");
        self.state = None;
        Ok(())
    }

    /// Look up a cached string
    pub fn cached_string(&self, id: u32) -> Result<Option<&str>, ChangeError> {
        Ok(self.state()?.strings.lookup(id))
    }

    /// Look up a template prototype
    pub fn template(&self, id: u32) -> Result<Option<NodeId>, ChangeError> {
        Ok(self.state()?.templates.lookup(id))
    }

    /// Payload pair stored for `(node, event_type)`
    pub fn listener_payloads(
        &self,
        node: NodeId,
        event_type: &str,
    ) -> Result<Option<(u32, u32)>, ChangeError> {
        Ok(self.state()?.events.payloads(node, event_type))
    }

    /// Number of shared-handler registrations performed for
    /// `(node, event_type)`. Payload updates leave this untouched.
    pub fn listener_registrations(
        &self,
        node: NodeId,
        event_type: &str,
    ) -> Result<u32, ChangeError> {
        Ok(self.state()?.events.registrations(node, event_type))
    }
}

impl InterpreterState {
    /// Execute one range: a contiguous run of 32-bit words, opcode then
    /// operands, repeated until the range ends.
    fn run_range(
        &mut self,
        doc: &mut DomTree,
        view: MemoryView<'_>,
        range: ChangeListRange,
    ) -> Result<(), ChangeError> {
        let ChangeListRange { offset, length } = range;
        if offset % 4 != 0 || length % 4 != 0 {
            return Err(ChangeError::MisalignedRange { offset, length });
        }
        let end_byte = (offset as usize)
            .checked_add(length as usize)
            .filter(|&end| end <= view.size())
            .ok_or(ChangeError::RangeOutOfBounds {
                offset,
                length,
                size: view.size(),
            })?;

        let mut pc = offset as usize / 4;
        let end = end_byte / 4;
        while pc < end {
            let word = view.word(pc);
            pc += 1;
            let op = Opcode::from_word(word).ok_or(ChangeError::UnknownOpcode(word))?;
            if pc + op.operand_words() > end {
                return Err(ChangeError::TruncatedChangeList(op.name()));
            }
            let mut operands = [0u32; 3];
            for slot in 0..op.operand_words() {
                operands[slot] = view.word(pc + slot);
            }
            pc += op.operand_words();
            tracing::trace!(op = op.name(), "exec");
            self.exec(doc, view, op, operands)?;
        }
        Ok(())
    }

    fn exec(
        &mut self,
        doc: &mut DomTree,
        view: MemoryView<'_>,
        op: Opcode,
        operands: [u32; 3],
    ) -> Result<(), ChangeError> {
        let [first, second, third] = operands;
        match op {
            Opcode::SetText => {
                let text = view.text(first, second)?;
                self.set_text(doc, &text)
            }
            Opcode::RemoveSelfAndNextSiblings => self.remove_self_and_next_siblings(doc),
            Opcode::ReplaceWith => self.replace_with(doc),
            Opcode::SetAttribute => self.set_attribute(doc, first, second),
            Opcode::RemoveAttribute => self.remove_attribute(doc, first),
            Opcode::PushFirstChild => self.push_first_child(doc),
            Opcode::PopPushNextSibling => self.pop_push_next_sibling(doc),
            Opcode::Pop => self.pop(),
            Opcode::AppendChild => self.append_child(doc),
            Opcode::CreateTextNode => {
                let text = view.text(first, second)?;
                self.create_text_node(doc, &text)
            }
            Opcode::CreateElement => self.create_element(doc, first),
            Opcode::NewEventListener => self.new_event_listener(first, second, third),
            Opcode::UpdateEventListener => self.update_event_listener(first, second, third),
            Opcode::RemoveEventListener => self.remove_event_listener(first),
            Opcode::AddCachedString => {
                let string = view.text(first, second)?;
                self.strings.add(third, string);
                Ok(())
            }
            Opcode::DropCachedString => {
                self.strings.remove(first);
                Ok(())
            }
            Opcode::CreateElementNs => self.create_element_ns(doc, first, second),
            // The wire contract fixes the namespace of attribute writes to
            // the null namespace, so storage matches a plain setAttribute.
            Opcode::SetAttributeNs => self.set_attribute(doc, first, second),
            Opcode::SaveChildrenToTemporaries => {
                self.save_children_to_temporaries(doc, first, second, third)
            }
            Opcode::PushChild => self.push_child(doc, first),
            Opcode::PushTemporary => self.push_temporary(first),
            Opcode::InsertBefore => self.insert_before(doc),
            Opcode::PopPushReverseChild => self.pop_push_reverse_child(doc, first),
            Opcode::RemoveChild => self.remove_child(doc, first),
            Opcode::SetClass => self.set_class(doc, first),
            Opcode::SaveTemplate => self.save_template(doc, first),
            Opcode::PushTemplate => self.push_template(doc, first),
        }
    }

    /// Free event annotations for a subtree that left the document
    fn free_subtree(&mut self, doc: &DomTree, root: NodeId) -> Result<(), ChangeError> {
        let mut detached = Vec::new();
        doc.collect_subtree(root, &mut detached)?;
        self.events.remove_subtree(&detached);
        Ok(())
    }

    fn set_text(&mut self, doc: &mut DomTree, text: &str) -> Result<(), ChangeError> {
        let node = self.cursor.top("setText")?;
        // Children displaced by the new text content leave the document.
        let children: Vec<NodeId> = doc
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            self.free_subtree(doc, child)?;
        }
        doc.set_text_content(node, text)?;
        Ok(())
    }

    fn remove_self_and_next_siblings(&mut self, doc: &mut DomTree) -> Result<(), ChangeError> {
        let entry = self.cursor.pop_node("removeSelfAndNextSiblings")?;
        let mut node = entry.node;
        while node.is_valid() {
            let next = doc.next_sibling(node)?;
            self.free_subtree(doc, node)?;
            doc.remove(node)?;
            node = next;
        }
        Ok(())
    }

    fn replace_with(&mut self, doc: &mut DomTree) -> Result<(), ChangeError> {
        let new = self.cursor.pop_node("replaceWith")?;
        let old = self.cursor.pop_node("replaceWith")?;
        let index = doc.replace_with(old.node, new.node)?;
        self.free_subtree(doc, old.node)?;
        self.cursor.push(new.node, Some(index as u32));
        Ok(())
    }

    fn set_attribute(
        &mut self,
        doc: &mut DomTree,
        name_id: u32,
        value_id: u32,
    ) -> Result<(), ChangeError> {
        let node = self.cursor.top("setAttribute")?;
        let name = self.strings.get(name_id)?;
        let value = self.strings.get(value_id)?;
        doc.set_attribute(node, name, value)?;
        Ok(())
    }

    fn remove_attribute(&mut self, doc: &mut DomTree, name_id: u32) -> Result<(), ChangeError> {
        let node = self.cursor.top("removeAttribute")?;
        let name = self.strings.get(name_id)?;
        doc.remove_attribute(node, name)?;
        Ok(())
    }

    fn push_first_child(&mut self, doc: &DomTree) -> Result<(), ChangeError> {
        let parent = self.cursor.top("pushFirstChild")?;
        let child = doc.first_child(parent)?;
        self.cursor.push(child, Some(0));
        Ok(())
    }

    fn pop_push_next_sibling(&mut self, doc: &DomTree) -> Result<(), ChangeError> {
        let entry = self.cursor.pop_node("popPushNextSibling")?;
        let parent = doc
            .get(entry.node)
            .map(|n| n.parent)
            .unwrap_or(NodeId::NONE);

        // Use the recorded sibling index when it still matches; mutations
        // since the push may have shifted the child list.
        let index = if parent.is_valid() {
            match entry.sibling_index {
                Some(i) if doc.child(parent, i as usize).ok() == Some(entry.node) => {
                    Some(i as usize)
                }
                _ => doc.position(entry.node)?,
            }
        } else {
            None
        };

        let (next, next_index) = match index {
            Some(i) => {
                let next_i = i + 1;
                let node = if next_i < doc.child_count(parent)? {
                    doc.child(parent, next_i)?
                } else {
                    NodeId::NONE
                };
                (node, Some(next_i as u32))
            }
            // A detached node has no next sibling.
            None => (NodeId::NONE, None),
        };
        self.cursor.push(next, next_index);
        Ok(())
    }

    fn pop(&mut self) -> Result<(), ChangeError> {
        self.cursor.pop("pop")?;
        Ok(())
    }

    fn append_child(&mut self, doc: &mut DomTree) -> Result<(), ChangeError> {
        let child = self.cursor.pop_node("appendChild")?;
        let parent = self.cursor.top("appendChild")?;
        doc.append_child(parent, child.node)?;
        Ok(())
    }

    fn create_text_node(&mut self, doc: &mut DomTree, text: &str) -> Result<(), ChangeError> {
        let node = doc.create_text(text);
        self.cursor.push(node, None);
        Ok(())
    }

    fn create_element(&mut self, doc: &mut DomTree, tag_id: u32) -> Result<(), ChangeError> {
        let tag = self.strings.get(tag_id)?;
        let node = doc.create_element(tag);
        self.cursor.push(node, None);
        Ok(())
    }

    fn new_event_listener(&mut self, event_id: u32, a: u32, b: u32) -> Result<(), ChangeError> {
        let node = self.cursor.top("newEventListener")?;
        let event_type = self.strings.get(event_id)?;
        self.events.add(node, event_type, a, b)
    }

    fn update_event_listener(&mut self, event_id: u32, a: u32, b: u32) -> Result<(), ChangeError> {
        let node = self.cursor.top("updateEventListener")?;
        let event_type = self.strings.get(event_id)?;
        self.events.update(node, event_type, a, b);
        Ok(())
    }

    fn remove_event_listener(&mut self, event_id: u32) -> Result<(), ChangeError> {
        let node = self.cursor.top("removeEventListener")?;
        let event_type = self.strings.get(event_id)?;
        self.events.remove(node, event_type);
        Ok(())
    }

    fn create_element_ns(
        &mut self,
        doc: &mut DomTree,
        tag_id: u32,
        ns_id: u32,
    ) -> Result<(), ChangeError> {
        let tag = self.strings.get(tag_id)?;
        let ns = self.strings.get(ns_id)?;
        let node = doc.create_element_ns(ns, tag);
        self.cursor.push(node, None);
        Ok(())
    }

    fn save_children_to_temporaries(
        &mut self,
        doc: &DomTree,
        temp_base: u32,
        start: u32,
        end: u32,
    ) -> Result<(), ChangeError> {
        let parent = self.cursor.top("saveChildrenToTemporaries")?;
        for i in start..end {
            let child = doc.child(parent, i as usize)?;
            self.temporaries.save(temp_base + (i - start), child);
        }
        Ok(())
    }

    fn push_child(&mut self, doc: &DomTree, n: u32) -> Result<(), ChangeError> {
        let parent = self.cursor.top("pushChild")?;
        let child = doc.child(parent, n as usize)?;
        self.cursor.push(child, Some(n));
        Ok(())
    }

    fn push_temporary(&mut self, temp: u32) -> Result<(), ChangeError> {
        let node = self.temporaries.get(temp)?;
        self.cursor.push(node, None);
        Ok(())
    }

    fn insert_before(&mut self, doc: &mut DomTree) -> Result<(), ChangeError> {
        let before = self.cursor.pop_node("insertBefore")?;
        let after = self.cursor.pop_node("insertBefore")?;
        let parent = doc
            .get(after.node)
            .map(|n| n.parent)
            .unwrap_or(NodeId::NONE);
        if !parent.is_valid() {
            return Err(ChangeError::Dom(DomError::NotAChild));
        }
        let index = doc.insert_before(parent, before.node, after.node)?;
        self.cursor.push(before.node, Some(index as u32));
        Ok(())
    }

    fn pop_push_reverse_child(&mut self, doc: &DomTree, n: u32) -> Result<(), ChangeError> {
        self.cursor.pop("popPushReverseChild")?;
        let parent = self.cursor.top("popPushReverseChild")?;
        let count = doc.child_count(parent)?;
        if (n as usize) >= count {
            return Err(ChangeError::Dom(DomError::IndexOutOfBounds));
        }
        let index = count - 1 - n as usize;
        let child = doc.child(parent, index)?;
        self.cursor.push(child, Some(index as u32));
        Ok(())
    }

    fn remove_child(&mut self, doc: &mut DomTree, n: u32) -> Result<(), ChangeError> {
        let parent = self.cursor.top("removeChild")?;
        let child = doc.child(parent, n as usize)?;
        self.free_subtree(doc, child)?;
        doc.remove(child)?;
        Ok(())
    }

    fn set_class(&mut self, doc: &mut DomTree, class_id: u32) -> Result<(), ChangeError> {
        let node = self.cursor.top("setClass")?;
        let class = self.strings.get(class_id)?;
        doc.set_class_name(node, class)?;
        Ok(())
    }

    fn save_template(&mut self, doc: &mut DomTree, id: u32) -> Result<(), ChangeError> {
        let node = self.cursor.top("saveTemplate")?;
        let prototype = doc.clone_node(node, true)?;
        self.templates.save(id, prototype);
        Ok(())
    }

    fn push_template(&mut self, doc: &mut DomTree, id: u32) -> Result<(), ChangeError> {
        let prototype = self.templates.get(id)?;
        let clone = doc.clone_node(prototype, true)?;
        self.cursor.push(clone, None);
        Ok(())
    }
}
