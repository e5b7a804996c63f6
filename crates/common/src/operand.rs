//! Instruction operands and their source spans.

use crate::slot::{SlotId, FRAME_POINTER};

/// Byte range of a token inside the raw log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset from the start of the line.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Span {
    /// Create a span.
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Span covering `start..end`.
    pub fn from_range(start: usize, end: usize) -> Self {
        Self {
            offset: start,
            len: end.saturating_sub(start),
        }
    }

    /// One past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The text this span covers in `line`, if it lies on char boundaries.
    pub fn slice<'a>(&self, line: &'a str) -> Option<&'a str> {
        line.get(self.offset..self.end())
    }
}

/// A `*(<width> *)(<reg> <offset>)` memory reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemRef {
    /// Address register number.
    pub base: u8,
    /// Signed byte offset from the base.
    pub offset: i32,
}

/// What an operand refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// `r0`..`r10`, or a `w` alias.
    Register(u8),
    /// Memory addressed through `r10`; identified exactly by its offset.
    FramePointerSlot(MemRef),
    /// Any other memory reference. Collapses to the shared `MEM` slot.
    Memory(MemRef),
    /// Decimal or hex literal.
    Immediate(i64),
}

/// A parsed operand with its size and location in the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operand {
    pub kind: OperandKind,
    /// Access width in bytes: 1, 2, 4 or 8.
    pub size: u8,
    pub span: Span,
}

impl Operand {
    /// Register operand. `size` is 4 for `w` aliases, 8 otherwise.
    pub fn register(n: u8, size: u8, span: Span) -> Self {
        Self {
            kind: OperandKind::Register(n),
            size,
            span,
        }
    }

    /// Memory operand; frame-pointer based references become stack slots.
    pub fn memory(memref: MemRef, size: u8, span: Span) -> Self {
        let kind = if memref.base == FRAME_POINTER {
            OperandKind::FramePointerSlot(memref)
        } else {
            OperandKind::Memory(memref)
        };
        Self { kind, size, span }
    }

    /// Immediate literal operand.
    pub fn immediate(value: i64, span: Span) -> Self {
        Self {
            kind: OperandKind::Immediate(value),
            size: 8,
            span,
        }
    }

    /// Storage slot this operand names. `None` for immediates.
    pub fn slot(&self) -> Option<SlotId> {
        match self.kind {
            OperandKind::Register(n) => Some(SlotId::Register(n)),
            OperandKind::FramePointerSlot(m) => Some(SlotId::Stack(m.offset)),
            OperandKind::Memory(_) => Some(SlotId::Memory),
            OperandKind::Immediate(_) => None,
        }
    }

    /// Identifier string: the slot id, or the immediate's decimal value.
    pub fn id(&self) -> String {
        match (self.slot(), self.kind) {
            (Some(slot), _) => slot.to_string(),
            (None, OperandKind::Immediate(v)) => v.to_string(),
            (None, _) => String::new(),
        }
    }

    /// Memory reference, for stack and memory operands.
    pub fn memref(&self) -> Option<MemRef> {
        match self.kind {
            OperandKind::FramePointerSlot(m) | OperandKind::Memory(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self.kind, OperandKind::Immediate(_))
    }

    /// True only for non-stack memory, whose address register is itself read.
    pub fn is_memory(&self) -> bool {
        matches!(self.kind, OperandKind::Memory(_))
    }
}
