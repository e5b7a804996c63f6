//! Parser for eBPF verifier level-1 logs.
//!
//! Each line is parsed on its own; nothing here keeps state between lines.
//!
//! # Usage
//!
//! ```
//! use vlog_parser::{parse_line, Classification};
//!
//! let line = parse_line("0: (b7) r2 = 1                        ; R2_w=1");
//! assert_eq!(line.classification(), Classification::Instruction);
//! assert_eq!(line.state_expressions()[0].value, "1");
//!
//! let junk = parse_line("processed 12 insns");
//! assert_eq!(junk.classification(), Classification::Unrecognized);
//! ```
//!
//! # Grammar
//!
//! ```text
//! line    := ws* pc ':' ws* '(' hh ')' ws* body ws* (';' comment)?
//! body    := alu | call | cond | goto | 'exit'
//! comment := ('frame' N ': ')? (key '=' value)*
//! ```
//!
//! Failure at any point yields [`Classification::Unrecognized`]; the raw
//! text is always kept.

pub mod comment;
pub mod error;
pub mod line;

mod cursor;
mod grammar;
mod operand;

pub use comment::parse_state_comment;
pub use error::ParseError;
pub use line::{parse_line, Classification, LineKind, ParsedLine};
