//! Decode errors for opcode bytes and slot identifiers.

use thiserror::Error;

/// Errors that occur while decoding the compact pieces of a log line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Opcode text is not exactly two hex digits.
    #[error("invalid opcode byte '{0}' (expected two hex digits)")]
    InvalidOpcode(String),

    /// Text does not name a register, stack slot or `MEM`.
    #[error("invalid slot id '{0}'")]
    InvalidSlotId(String),

    /// Register number outside `r0`..`r10`.
    #[error("register number {0} out of range (r0-r10)")]
    RegisterOutOfRange(u32),
}
