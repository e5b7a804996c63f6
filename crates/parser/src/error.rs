//! Reasons a log line does not parse as an instruction.
//!
//! None of these abort a run: the line parser records the reason on the
//! line and moves on.

use thiserror::Error;
use vlog_common::DecodeError;

/// Why a line (or part of one) did not match the grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Blank or whitespace-only line.
    #[error("empty line")]
    Empty,

    /// The line does not start with `<pc>:`.
    #[error("byte {offset}: expected program counter")]
    MissingProgramCounter { offset: usize },

    /// A required punctuation character was not found.
    #[error("byte {offset}: expected '{expected}'")]
    ExpectedChar { offset: usize, expected: char },

    /// The text inside `(..)` is not an opcode byte.
    #[error("byte {offset}: {source}")]
    BadOpcode {
        offset: usize,
        #[source]
        source: DecodeError,
    },

    /// Jump-class opcode whose operation code is unassigned.
    #[error("byte {offset}: unassigned jump operation code {code:#x}")]
    UnassignedJumpCode { offset: usize, code: u8 },

    /// No register, memory reference or immediate at a required position.
    #[error("byte {offset}: expected operand")]
    ExpectedOperand { offset: usize },

    /// No assignment or comparison operator.
    #[error("byte {offset}: expected operator")]
    ExpectedOperator { offset: usize },

    /// A keyword (`call`, `goto`, `if`) was missing.
    #[error("byte {offset}: expected '{keyword}'")]
    ExpectedKeyword {
        offset: usize,
        keyword: &'static str,
    },

    /// Jump or call without a target.
    #[error("byte {offset}: expected jump target")]
    MissingTarget { offset: usize },

    /// Unconsumed text after the instruction body.
    #[error("byte {offset}: unexpected text '{text}'")]
    TrailingText { offset: usize, text: String },
}

impl ParseError {
    /// Byte offset the error points at, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::Empty => None,
            ParseError::MissingProgramCounter { offset }
            | ParseError::ExpectedChar { offset, .. }
            | ParseError::BadOpcode { offset, .. }
            | ParseError::UnassignedJumpCode { offset, .. }
            | ParseError::ExpectedOperand { offset }
            | ParseError::ExpectedOperator { offset }
            | ParseError::ExpectedKeyword { offset, .. }
            | ParseError::MissingTarget { offset }
            | ParseError::TrailingText { offset, .. } => Some(*offset),
        }
    }
}
