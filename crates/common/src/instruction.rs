//! Structured instructions recovered from verifier log lines.
//!
//! Reads and writes are semantic slot sets, not syntactic ones: `r1 += r2`
//! reads its own destination, a helper call reads `r1`..`r5` even though
//! none of them appear in the text.

use std::collections::BTreeSet;
use std::fmt;

use crate::opcode::OpcodeByte;
use crate::operand::{Operand, Span};
use crate::slot::{SlotId, CALLEE_SAVED_REGISTERS, RETURN_REGISTER, SCRATCH_REGISTERS};

/// Assignment operators, as printed by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOperator {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Lsh,
    Rsh,
    Arsh,
    /// `s<<=`, accepted for symmetry with `s>>=`.
    SignedLsh,
}

/// All operators, longest symbol first. Matching must walk this order so
/// that `<<=` wins over a shorter prefix.
pub const ALL_ALU_OPERATORS: [AluOperator; 13] = [
    AluOperator::Arsh,
    AluOperator::SignedLsh,
    AluOperator::Lsh,
    AluOperator::Rsh,
    AluOperator::Add,
    AluOperator::Sub,
    AluOperator::Mul,
    AluOperator::Div,
    AluOperator::Mod,
    AluOperator::And,
    AluOperator::Or,
    AluOperator::Xor,
    AluOperator::Assign,
];

impl AluOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            AluOperator::Assign => "=",
            AluOperator::Add => "+=",
            AluOperator::Sub => "-=",
            AluOperator::Mul => "*=",
            AluOperator::Div => "/=",
            AluOperator::Mod => "%=",
            AluOperator::And => "&=",
            AluOperator::Or => "|=",
            AluOperator::Xor => "^=",
            AluOperator::Lsh => "<<=",
            AluOperator::Rsh => ">>=",
            AluOperator::Arsh => "s>>=",
            AluOperator::SignedLsh => "s<<=",
        }
    }

    /// Compound assignment reads its destination.
    pub fn is_compound(self) -> bool {
        self != AluOperator::Assign
    }
}

/// Comparison operators of conditional jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    SignedGt,
    SignedGe,
    SignedLt,
    SignedLe,
    /// `JSET`: bit test.
    BitTest,
}

/// All comparators, longest symbol first.
pub const ALL_COMPARATORS: [Comparator; 11] = [
    Comparator::SignedGe,
    Comparator::SignedLe,
    Comparator::Eq,
    Comparator::Ne,
    Comparator::Ge,
    Comparator::Le,
    Comparator::SignedGt,
    Comparator::SignedLt,
    Comparator::Gt,
    Comparator::Lt,
    Comparator::BitTest,
];

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::SignedGt => "s>",
            Comparator::SignedGe => "s>=",
            Comparator::SignedLt => "s<",
            Comparator::SignedLe => "s<=",
            Comparator::BitTest => "&",
        }
    }
}

/// Prefix the verifier prints in front of a source operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceModifier {
    /// `r1 = -r1`
    Negate,
    /// `r1 = be16 r1`, `le32`, `bswap64`, ...; the width in bits.
    ByteSwap { order: ByteOrder, bits: u8 },
    /// `r1 = (s8)r2`; the source width in bits.
    SignExtend(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Big,
    Little,
    /// Unconditional swap (`bswap`).
    Swap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AluPayload {
    pub operator: AluOperator,
    pub dst: Operand,
    pub src: Operand,
    pub modifier: Option<SourceModifier>,
    /// `lock` prefix: atomic read-modify-write on memory.
    pub atomic: bool,
}

impl AluPayload {
    /// Slots this assignment reads.
    ///
    /// The destination iff the operator is compound; the address register of
    /// every non-stack memory operand; the source unless it is an immediate.
    pub fn reads(&self) -> BTreeSet<SlotId> {
        let mut reads = BTreeSet::new();
        if self.operator.is_compound() {
            reads.extend(self.dst.slot());
        }
        for op in [&self.dst, &self.src] {
            if op.is_memory() {
                if let Some(m) = op.memref() {
                    reads.insert(SlotId::Register(m.base));
                }
            }
        }
        if !self.src.is_immediate() {
            reads.extend(self.src.slot());
        }
        reads
    }

    /// Exactly the destination slot.
    pub fn writes(&self) -> BTreeSet<SlotId> {
        self.dst.slot().into_iter().collect()
    }
}

/// What kind of control transfer a jump-class instruction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpKind {
    UnconditionalGoto,
    ConditionalGoto,
    HelperCall,
    Bpf2BpfCall,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub left: Operand,
    pub comparator: Comparator,
    pub right: Operand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpPayload {
    pub kind: JumpKind,
    /// `pc+3`, `bpf_probe_read_user#112`; empty for `exit`.
    pub target: String,
    pub target_span: Option<Span>,
    pub condition: Option<Condition>,
}

impl JumpPayload {
    pub fn reads(&self) -> BTreeSet<SlotId> {
        match self.kind {
            JumpKind::HelperCall | JumpKind::Bpf2BpfCall => scratch_registers(),
            JumpKind::ConditionalGoto => self
                .condition
                .iter()
                .flat_map(|c| [c.left.slot(), c.right.slot()])
                .flatten()
                .collect(),
            JumpKind::UnconditionalGoto | JumpKind::Exit => BTreeSet::new(),
        }
    }

    /// A helper may clobber any scratch register; a subprogram may clobber
    /// any callee-saved one.
    pub fn writes(&self) -> BTreeSet<SlotId> {
        let mut writes = BTreeSet::new();
        match self.kind {
            JumpKind::HelperCall => {
                writes.insert(SlotId::Register(RETURN_REGISTER));
                writes.extend(scratch_registers());
            }
            JumpKind::Bpf2BpfCall => {
                writes.insert(SlotId::Register(RETURN_REGISTER));
                writes.extend(CALLEE_SAVED_REGISTERS.iter().map(|&r| SlotId::Register(r)));
            }
            _ => {}
        }
        writes
    }

    /// Relative offset of a `pc+N` / `pc-N` target.
    pub fn pc_offset(&self) -> Option<i64> {
        parse_pc_offset(&self.target)
    }
}

/// Parse `pc+N` / `pc-N`.
pub fn parse_pc_offset(target: &str) -> Option<i64> {
    let rest = target.strip_prefix("pc")?;
    let sign = rest.chars().next()?;
    if sign != '+' && sign != '-' {
        return None;
    }
    if rest.len() < 2 || !rest[1..].bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

fn scratch_registers() -> BTreeSet<SlotId> {
    SCRATCH_REGISTERS
        .iter()
        .map(|&r| SlotId::Register(r))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Alu(AluPayload),
    Jump(JumpPayload),
}

/// One decoded instruction line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Program counter; absent only for synthesized instructions.
    pub pc: Option<u64>,
    pub opcode: OpcodeByte,
    pub reads: BTreeSet<SlotId>,
    pub writes: BTreeSet<SlotId>,
    pub payload: Payload,
    /// The instruction text between the opcode and the state comment.
    pub span: Span,
}

impl Instruction {
    /// Build an instruction, deriving reads and writes from the payload.
    pub fn new(pc: Option<u64>, opcode: OpcodeByte, payload: Payload, span: Span) -> Self {
        let (reads, writes) = match &payload {
            Payload::Alu(alu) => (alu.reads(), alu.writes()),
            Payload::Jump(jump) => (jump.reads(), jump.writes()),
        };
        Self {
            pc,
            opcode,
            reads,
            writes,
            payload,
            span,
        }
    }

    pub fn alu(&self) -> Option<&AluPayload> {
        match &self.payload {
            Payload::Alu(alu) => Some(alu),
            Payload::Jump(_) => None,
        }
    }

    pub fn jump(&self) -> Option<&JumpPayload> {
        match &self.payload {
            Payload::Jump(jump) => Some(jump),
            Payload::Alu(_) => None,
        }
    }

    pub fn jump_kind(&self) -> Option<JumpKind> {
        self.jump().map(|j| j.kind)
    }

    pub fn is_subprogram_call(&self) -> bool {
        self.jump_kind() == Some(JumpKind::Bpf2BpfCall)
    }

    pub fn is_exit(&self) -> bool {
        self.jump_kind() == Some(JumpKind::Exit)
    }

    /// Absolute program counter of a `pc±N` jump or call target.
    pub fn branch_target(&self) -> Option<u64> {
        let pc = i64::try_from(self.pc?).ok()?;
        let target = pc.checked_add(self.jump()?.pc_offset()?)?.checked_add(1)?;
        u64::try_from(target).ok()
    }

    /// Every operand with its span, in textual order.
    pub fn operands(&self) -> Vec<&Operand> {
        match &self.payload {
            Payload::Alu(alu) => vec![&alu.dst, &alu.src],
            Payload::Jump(jump) => jump
                .condition
                .iter()
                .flat_map(|c| [&c.left, &c.right])
                .collect(),
        }
    }
}

impl fmt::Display for JumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JumpKind::UnconditionalGoto => "goto",
            JumpKind::ConditionalGoto => "conditional goto",
            JumpKind::HelperCall => "helper call",
            JumpKind::Bpf2BpfCall => "subprogram call",
            JumpKind::Exit => "exit",
        };
        f.write_str(name)
    }
}
