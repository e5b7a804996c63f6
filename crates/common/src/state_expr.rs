//! Facts reported in the verifier's trailing state comment.

use crate::operand::Span;
use crate::slot::SlotId;

/// One `key=value` fact, e.g. `R2_w=1` or `fp-8=mmmmmmmm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateExpression {
    pub id: SlotId,
    /// Raw value text; may contain balanced parentheses (`scalar(id=3)`).
    pub value: String,
    /// The key carried the `_w` suffix: this line wrote the slot.
    pub written: bool,
    /// Call frame the fact applies to (`frame1: ...`), 0 by default.
    pub frame: usize,
    /// The whole `key=value` token.
    pub span: Span,
}

impl StateExpression {
    pub fn new(id: SlotId, value: impl Into<String>, written: bool, frame: usize) -> Self {
        Self {
            id,
            value: value.into(),
            written,
            frame,
            span: Span::default(),
        }
    }
}
