//! Change-list opcodes
//!
//! One 32-bit word selects the operation; the operation fixes how many
//! operand words follow. There is no per-instruction framing, so decoding
//! an unknown opcode poisons the rest of the range and is a fatal protocol
//! violation.

/// Change-list operations, numbered as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `(pointer, length)`: set the current node's text content
    SetText = 0,
    /// Pop a node, remove it and every following sibling
    RemoveSelfAndNextSiblings = 1,
    /// Pop the replacement, pop the old node, swap them, push the replacement
    ReplaceWith = 2,
    /// `(name_id, value_id)`: set an attribute on the current node
    SetAttribute = 3,
    /// `(name_id)`: remove an attribute from the current node
    RemoveAttribute = 4,
    /// Push the current node's first child
    PushFirstChild = 5,
    /// Pop a node, push its next sibling
    PopPushNextSibling = 6,
    /// Pop
    Pop = 7,
    /// Pop a node, append it to the current node
    AppendChild = 8,
    /// `(pointer, length)`: push a new text node
    CreateTextNode = 9,
    /// `(tag_id)`: push a new element
    CreateElement = 10,
    /// `(event_id, a, b)`: annotate the current node and register the shared handler
    NewEventListener = 11,
    /// `(event_id, a, b)`: overwrite the annotation payloads in place
    UpdateEventListener = 12,
    /// `(event_id)`: drop the annotation and the handler registration
    RemoveEventListener = 13,
    /// `(pointer, length, id)`: intern a string under a guest-chosen id
    AddCachedString = 14,
    /// `(id)`: drop an interned string
    DropCachedString = 15,
    /// `(tag_id, ns_id)`: push a new namespaced element
    CreateElementNs = 16,
    /// `(name_id, value_id)`: set an attribute in the null namespace
    SetAttributeNs = 17,
    /// `(temp_base, start, end)`: save a child range into the temporaries table
    SaveChildrenToTemporaries = 18,
    /// `(n)`: push the current node's n-th child
    PushChild = 19,
    /// `(temp)`: push a saved temporary
    PushTemporary = 20,
    /// Pop the node to insert, pop the reference, insert before it, push the inserted node
    InsertBefore = 21,
    /// `(n)`: pop, then push the current node's n-th from last child
    PopPushReverseChild = 22,
    /// `(n)`: remove the current node's n-th child
    RemoveChild = 23,
    /// `(class_id)`: set the current node's class
    SetClass = 24,
    /// `(id)`: deep-clone the current node as a template prototype
    SaveTemplate = 25,
    /// `(id)`: push a fresh deep clone of a template prototype
    PushTemplate = 26,
}

impl Opcode {
    /// Decode a wire word
    pub fn from_word(word: u32) -> Option<Self> {
        Some(match word {
            0 => Self::SetText,
            1 => Self::RemoveSelfAndNextSiblings,
            2 => Self::ReplaceWith,
            3 => Self::SetAttribute,
            4 => Self::RemoveAttribute,
            5 => Self::PushFirstChild,
            6 => Self::PopPushNextSibling,
            7 => Self::Pop,
            8 => Self::AppendChild,
            9 => Self::CreateTextNode,
            10 => Self::CreateElement,
            11 => Self::NewEventListener,
            12 => Self::UpdateEventListener,
            13 => Self::RemoveEventListener,
            14 => Self::AddCachedString,
            15 => Self::DropCachedString,
            16 => Self::CreateElementNs,
            17 => Self::SetAttributeNs,
            18 => Self::SaveChildrenToTemporaries,
            19 => Self::PushChild,
            20 => Self::PushTemporary,
            21 => Self::InsertBefore,
            22 => Self::PopPushReverseChild,
            23 => Self::RemoveChild,
            24 => Self::SetClass,
            25 => Self::SaveTemplate,
            26 => Self::PushTemplate,
            _ => return None,
        })
    }

    /// The wire word for this operation
    pub fn to_word(self) -> u32 {
        self as u32
    }

    /// Number of operand words following the opcode word
    pub fn operand_words(self) -> usize {
        match self {
            Self::RemoveSelfAndNextSiblings
            | Self::ReplaceWith
            | Self::PushFirstChild
            | Self::PopPushNextSibling
            | Self::Pop
            | Self::AppendChild
            | Self::InsertBefore => 0,
            Self::RemoveAttribute
            | Self::CreateElement
            | Self::RemoveEventListener
            | Self::DropCachedString
            | Self::PushChild
            | Self::PushTemporary
            | Self::PopPushReverseChild
            | Self::RemoveChild
            | Self::SetClass
            | Self::SaveTemplate
            | Self::PushTemplate => 1,
            Self::SetText
            | Self::SetAttribute
            | Self::CreateTextNode
            | Self::CreateElementNs
            | Self::SetAttributeNs => 2,
            Self::NewEventListener
            | Self::UpdateEventListener
            | Self::AddCachedString
            | Self::SaveChildrenToTemporaries => 3,
        }
    }

    /// Name used in errors and trace output
    pub fn name(self) -> &'static str {
        match self {
            Self::SetText => "setText",
            Self::RemoveSelfAndNextSiblings => "removeSelfAndNextSiblings",
            Self::ReplaceWith => "replaceWith",
            Self::SetAttribute => "setAttribute",
            Self::RemoveAttribute => "removeAttribute",
            Self::PushFirstChild => "pushFirstChild",
            Self::PopPushNextSibling => "popPushNextSibling",
            Self::Pop => "pop",
            Self::AppendChild => "appendChild",
            Self::CreateTextNode => "createTextNode",
            Self::CreateElement => "createElement",
            Self::NewEventListener => "newEventListener",
            Self::UpdateEventListener => "updateEventListener",
            Self::RemoveEventListener => "removeEventListener",
            Self::AddCachedString => "addCachedString",
            Self::DropCachedString => "dropCachedString",
            Self::CreateElementNs => "createElementNS",
            Self::SetAttributeNs => "setAttributeNS",
            Self::SaveChildrenToTemporaries => "saveChildrenToTemporaries",
            Self::PushChild => "pushChild",
            Self::PushTemporary => "pushTemporary",
            Self::InsertBefore => "insertBefore",
            Self::PopPushReverseChild => "popPushReverseChild",
            Self::RemoveChild => "removeChild",
            Self::SetClass => "setClass",
            Self::SaveTemplate => "saveTemplate",
            Self::PushTemplate => "pushTemplate",
        }
    }
}
