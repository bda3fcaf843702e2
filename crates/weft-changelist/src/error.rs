//! Interpreter errors
//!
//! Protocol violations are fail-fast: the frame is abandoned and the
//! interpreter may be left mid-mutation, so hosts should unmount after one.

use weft_dom::DomError;

/// Errors surfaced by the change-list interpreter
#[derive(Debug, thiserror::Error)]
pub enum ChangeError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),

    #[error("change list ended while reading operands of {0}")]
    TruncatedChangeList(&'static str),

    #[error("range ({offset}, {length}) is not 32-bit word aligned")]
    MisalignedRange { offset: u32, length: u32 },

    #[error("range ({offset}, {length}) lies outside shared memory of {size} bytes")]
    RangeOutOfBounds { offset: u32, length: u32, size: usize },

    #[error("text operand ({pointer}, {length}) lies outside shared memory of {size} bytes")]
    TextOutOfBounds { pointer: u32, length: u32, size: usize },

    #[error("{0} on an empty traversal cursor")]
    CursorUnderflow(&'static str),

    #[error("{0} reached a null node reference")]
    NullNode(&'static str),

    #[error("unknown cached string id {0}")]
    UnknownString(u32),

    #[error("unknown template id {0}")]
    UnknownTemplate(u32),

    #[error("temporary slot {0} is empty")]
    EmptyTemporary(u32),

    #[error("no events trampoline installed")]
    NoTrampoline,

    #[error("interpreter used after unmount")]
    Unmounted,

    #[error(transparent)]
    Dom(#[from] DomError),
}
