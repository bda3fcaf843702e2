//! Change-list encoder
//!
//! The reference writer for the wire format. Instructions are appended as
//! 32-bit words; inline strings land in a data region behind the
//! instruction words, and their pointer operands are patched at finish time
//! so the encoded image is one self-contained buffer.
//!
//! The guest-side equivalent writes straight into wasm linear memory; this
//! encoder exists for hosts, tests and tools that need to produce the same
//! byte stream without a guest.

use fxhash::FxHashMap;

use crate::interpreter::ChangeListRange;
use crate::memory::SharedMemory;
use crate::opcode::Opcode;

/// Builds an encoded change list instruction by instruction
#[derive(Debug, Default)]
pub struct ChangeListEncoder {
    words: Vec<u32>,
    data: Vec<u8>,
    /// Word indices holding data-relative string pointers to patch
    patches: Vec<usize>,
    /// Word boundaries where the stream splits into separate ranges
    range_marks: Vec<usize>,
    interned: FxHashMap<String, u32>,
    next_string_id: u32,
}

impl ChangeListEncoder {
    pub fn new() -> Self {
        Default::default()
    }

    fn op(&mut self, op: Opcode) {
        self.words.push(op.to_word());
    }

    fn word(&mut self, word: u32) {
        self.words.push(word);
    }

    /// Append a (pointer, length) text operand; the pointer is patched to
    /// its final location in `finish`.
    fn text(&mut self, text: &str) {
        self.patches.push(self.words.len());
        self.words.push(self.data.len() as u32);
        self.words.push(text.len() as u32);
        self.data.extend_from_slice(text.as_bytes());
    }

    /// Intern a string, emitting `addCachedString` the first time it is
    /// seen and returning its id either way
    pub fn ensure_string(&mut self, string: &str) -> u32 {
        if let Some(&id) = self.interned.get(string) {
            return id;
        }
        let id = self.next_string_id;
        self.next_string_id += 1;
        self.add_cached_string(string, id);
        self.interned.insert(string.to_string(), id);
        id
    }

    /// End the current range; subsequent instructions go into a new one
    pub fn split_range(&mut self) {
        self.range_marks.push(self.words.len());
    }

    pub fn set_text(&mut self, text: &str) {
        self.op(Opcode::SetText);
        self.text(text);
    }

    pub fn remove_self_and_next_siblings(&mut self) {
        self.op(Opcode::RemoveSelfAndNextSiblings);
    }

    pub fn replace_with(&mut self) {
        self.op(Opcode::ReplaceWith);
    }

    pub fn set_attribute(&mut self, name_id: u32, value_id: u32) {
        self.op(Opcode::SetAttribute);
        self.word(name_id);
        self.word(value_id);
    }

    pub fn remove_attribute(&mut self, name_id: u32) {
        self.op(Opcode::RemoveAttribute);
        self.word(name_id);
    }

    pub fn push_first_child(&mut self) {
        self.op(Opcode::PushFirstChild);
    }

    pub fn pop_push_next_sibling(&mut self) {
        self.op(Opcode::PopPushNextSibling);
    }

    pub fn pop(&mut self) {
        self.op(Opcode::Pop);
    }

    pub fn append_child(&mut self) {
        self.op(Opcode::AppendChild);
    }

    pub fn create_text_node(&mut self, text: &str) {
        self.op(Opcode::CreateTextNode);
        self.text(text);
    }

    pub fn create_element(&mut self, tag_id: u32) {
        self.op(Opcode::CreateElement);
        self.word(tag_id);
    }

    pub fn new_event_listener(&mut self, event_id: u32, a: u32, b: u32) {
        self.op(Opcode::NewEventListener);
        self.word(event_id);
        self.word(a);
        self.word(b);
    }

    pub fn update_event_listener(&mut self, event_id: u32, a: u32, b: u32) {
        self.op(Opcode::UpdateEventListener);
        self.word(event_id);
        self.word(a);
        self.word(b);
    }

    pub fn remove_event_listener(&mut self, event_id: u32) {
        self.op(Opcode::RemoveEventListener);
        self.word(event_id);
    }

    pub fn add_cached_string(&mut self, string: &str, id: u32) {
        self.op(Opcode::AddCachedString);
        self.text(string);
        self.word(id);
    }

    pub fn drop_cached_string(&mut self, id: u32) {
        self.op(Opcode::DropCachedString);
        self.word(id);
    }

    pub fn create_element_ns(&mut self, tag_id: u32, ns_id: u32) {
        self.op(Opcode::CreateElementNs);
        self.word(tag_id);
        self.word(ns_id);
    }

    pub fn set_attribute_ns(&mut self, name_id: u32, value_id: u32) {
        self.op(Opcode::SetAttributeNs);
        self.word(name_id);
        self.word(value_id);
    }

    pub fn save_children_to_temporaries(&mut self, temp_base: u32, start: u32, end: u32) {
        self.op(Opcode::SaveChildrenToTemporaries);
        self.word(temp_base);
        self.word(start);
        self.word(end);
    }

    pub fn push_child(&mut self, n: u32) {
        self.op(Opcode::PushChild);
        self.word(n);
    }

    pub fn push_temporary(&mut self, temp: u32) {
        self.op(Opcode::PushTemporary);
        self.word(temp);
    }

    pub fn insert_before(&mut self) {
        self.op(Opcode::InsertBefore);
    }

    pub fn pop_push_reverse_child(&mut self, n: u32) {
        self.op(Opcode::PopPushReverseChild);
        self.word(n);
    }

    pub fn remove_child(&mut self, n: u32) {
        self.op(Opcode::RemoveChild);
        self.word(n);
    }

    pub fn set_class(&mut self, class_id: u32) {
        self.op(Opcode::SetClass);
        self.word(class_id);
    }

    pub fn save_template(&mut self, id: u32) {
        self.op(Opcode::SaveTemplate);
        self.word(id);
    }

    pub fn push_template(&mut self, id: u32) {
        self.op(Opcode::PushTemplate);
        self.word(id);
    }

    /// Seal the stream into a contiguous memory image plus the ranges to
    /// submit, in order
    pub fn finish(mut self) -> EncodedChangeList {
        let base = (self.words.len() * 4) as u32;
        for patch in &self.patches {
            self.words[*patch] += base;
        }

        let mut bytes = Vec::with_capacity(self.words.len() * 4 + self.data.len());
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.extend_from_slice(&self.data);

        let mut ranges = Vec::new();
        let mut start = 0usize;
        for boundary in self.range_marks.iter().copied().chain([self.words.len()]) {
            if boundary > start {
                ranges.push(ChangeListRange {
                    offset: (start * 4) as u32,
                    length: ((boundary - start) * 4) as u32,
                });
            }
            start = boundary;
        }

        tracing::trace!(
            words = self.words.len(),
            data_bytes = self.data.len(),
            ranges = ranges.len(),
            "sealed change list"
        );
        EncodedChangeList { bytes, ranges }
    }
}

/// A sealed change list: one contiguous buffer plus its submission ranges
#[derive(Debug, Clone)]
pub struct EncodedChangeList {
    bytes: Vec<u8>,
    ranges: Vec<ChangeListRange>,
}

impl EncodedChangeList {
    /// The ranges to submit, in order
    pub fn ranges(&self) -> &[ChangeListRange] {
        &self.ranges
    }

    /// The encoded memory image
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl SharedMemory for EncodedChangeList {
    fn buffer(&self) -> &[u8] {
        &self.bytes
    }
}
