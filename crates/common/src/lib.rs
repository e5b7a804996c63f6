//! Shared types for eBPF verifier log analysis.
//!
//! - [`OpcodeByte`]: the `(hh)` opcode byte split into class, code and source
//! - [`SlotId`]: canonical register / stack-slot / `MEM` identifiers
//! - [`Operand`] and [`Span`]: operands with their location in the raw line
//! - [`Instruction`]: ALU or jump payload with semantic read/write sets
//! - [`StateExpression`]: one `key=value` fact from a state comment
//! - [`DecodeError`]: errors from decoding opcode bytes and slot ids

pub mod error;
pub mod instruction;
pub mod opcode;
pub mod operand;
pub mod slot;
pub mod state_expr;

// Re-export commonly used types at the crate root.
pub use error::DecodeError;
pub use instruction::{
    AluOperator, AluPayload, ByteOrder, Comparator, Condition, Instruction, JumpKind, JumpPayload,
    Payload, SourceModifier,
};
pub use opcode::{InstructionClass, JumpOp, OpcodeByte, OperandSource};
pub use operand::{MemRef, Operand, OperandKind, Span};
pub use slot::SlotId;
pub use state_expr::StateExpression;
