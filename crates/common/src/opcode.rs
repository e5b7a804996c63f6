//! Opcode byte decoding for eBPF instructions as printed by the verifier.
//!
//! The verifier prints each instruction's opcode byte as two hex digits in
//! parentheses, e.g. `(b7)`. The byte splits into:
//!
//! ```text
//! bits 7-4: operation code
//! bit  3:   source (1 = register, 0 = immediate)
//! bits 2-0: instruction class
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;

/// Instruction class, the low three bits of the opcode byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionClass {
    /// Non-standard loads (64-bit immediate, legacy packet access).
    Ld = 0x0,
    /// Load into register from memory.
    Ldx = 0x1,
    /// Store immediate to memory.
    St = 0x2,
    /// Store register to memory (and atomics).
    Stx = 0x3,
    /// 32-bit arithmetic.
    Alu = 0x4,
    /// 64-bit jumps, calls and exit.
    Jmp = 0x5,
    /// 32-bit conditional jumps.
    Jmp32 = 0x6,
    /// 64-bit arithmetic.
    Alu64 = 0x7,
}

/// All classes, in encoding order.
pub const ALL_CLASSES: [InstructionClass; 8] = [
    InstructionClass::Ld,
    InstructionClass::Ldx,
    InstructionClass::St,
    InstructionClass::Stx,
    InstructionClass::Alu,
    InstructionClass::Jmp,
    InstructionClass::Jmp32,
    InstructionClass::Alu64,
];

impl InstructionClass {
    /// Decode the class from the low three bits of `sclass`.
    pub fn from_bits(sclass: u8) -> Self {
        ALL_CLASSES[(sclass & 0x7) as usize]
    }

    /// Returns true for the two jump classes.
    pub fn is_jump(self) -> bool {
        matches!(self, InstructionClass::Jmp | InstructionClass::Jmp32)
    }

    /// Kernel-style mnemonic (`BPF_ALU64`, ...).
    pub fn name(self) -> &'static str {
        match self {
            InstructionClass::Ld => "BPF_LD",
            InstructionClass::Ldx => "BPF_LDX",
            InstructionClass::St => "BPF_ST",
            InstructionClass::Stx => "BPF_STX",
            InstructionClass::Alu => "BPF_ALU",
            InstructionClass::Jmp => "BPF_JMP",
            InstructionClass::Jmp32 => "BPF_JMP32",
            InstructionClass::Alu64 => "BPF_ALU64",
        }
    }
}

/// Where the second operand of an instruction comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandSource {
    /// `BPF_X`: source register.
    Register,
    /// `BPF_K`: 32-bit immediate.
    Immediate,
}

/// Operation codes of the jump classes (high nibble).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpOp {
    Ja = 0x0,
    Jeq = 0x1,
    Jgt = 0x2,
    Jge = 0x3,
    Jset = 0x4,
    Jne = 0x5,
    Jsgt = 0x6,
    Jsge = 0x7,
    Call = 0x8,
    Exit = 0x9,
    Jlt = 0xa,
    Jle = 0xb,
    Jslt = 0xc,
    Jsle = 0xd,
}

impl JumpOp {
    /// Decode a jump operation code. Codes 0xe and 0xf are unassigned.
    pub fn from_code(code: u8) -> Option<Self> {
        let op = match code {
            0x0 => JumpOp::Ja,
            0x1 => JumpOp::Jeq,
            0x2 => JumpOp::Jgt,
            0x3 => JumpOp::Jge,
            0x4 => JumpOp::Jset,
            0x5 => JumpOp::Jne,
            0x6 => JumpOp::Jsgt,
            0x7 => JumpOp::Jsge,
            0x8 => JumpOp::Call,
            0x9 => JumpOp::Exit,
            0xa => JumpOp::Jlt,
            0xb => JumpOp::Jle,
            0xc => JumpOp::Jslt,
            0xd => JumpOp::Jsle,
            _ => return None,
        };
        Some(op)
    }

    /// Returns true for the codes printed as `if <l> <cmp> <r> goto <t>`.
    pub fn is_conditional(self) -> bool {
        !matches!(self, JumpOp::Ja | JumpOp::Call | JumpOp::Exit)
    }
}

/// A decoded opcode byte: `{class, operation code, operand source}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodeByte {
    /// The byte as printed.
    pub raw: u8,
    /// Low three bits.
    pub class: InstructionClass,
    /// High nibble.
    pub code: u8,
    /// Bit 3.
    pub source: OperandSource,
}

impl OpcodeByte {
    /// Split a raw opcode byte into its fields.
    pub fn decode(raw: u8) -> Self {
        let code = raw >> 4;
        let sclass = raw & 0x0f;
        let source = if sclass & 0x8 != 0 {
            OperandSource::Register
        } else {
            OperandSource::Immediate
        };
        Self {
            raw,
            class: InstructionClass::from_bits(sclass),
            code,
            source,
        }
    }

    /// The jump operation, if this is a jump-class opcode with an assigned code.
    pub fn jump_op(&self) -> Option<JumpOp> {
        if self.class.is_jump() {
            JumpOp::from_code(self.code)
        } else {
            None
        }
    }
}

impl FromStr for OpcodeByte {
    type Err = DecodeError;

    /// Parse exactly two hex digits, as printed inside `(..)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DecodeError::InvalidOpcode(s.to_string()));
        }
        let raw =
            u8::from_str_radix(s, 16).map_err(|_| DecodeError::InvalidOpcode(s.to_string()))?;
        Ok(Self::decode(raw))
    }
}

impl fmt::Display for OpcodeByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.raw)
    }
}
