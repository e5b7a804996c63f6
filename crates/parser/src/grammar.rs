//! Instruction grammar: dispatches on the opcode's class and operation code.
//!
//! - LD/LDX/ST/STX/ALU/ALU64: `[lock] <dst> <operator> [modifier]<src>`
//! - JMP/JMP32 `call`: `call <target>`
//! - JMP/JMP32 conditional: `if <left> <cmp> <right> goto <target>`
//! - JMP/JMP32 `ja`: `goto <target>`
//! - JMP `exit`: `exit`

use crate::cursor::{is_ident_byte, Cursor};
use crate::error::ParseError;
use crate::operand::{parse_operand, parse_register, parse_source_modifier, Position};
use vlog_common::instruction::{parse_pc_offset, ALL_ALU_OPERATORS, ALL_COMPARATORS};
use vlog_common::{
    AluPayload, Condition, Instruction, JumpKind, JumpOp, JumpPayload, OpcodeByte, Payload, Span,
};

/// Parse the instruction text that follows `(hh) `.
///
/// On success the cursor sits right after the last consumed token; trailing
/// whitespace and any comment are left to the caller.
pub(crate) fn parse_instruction(
    c: &mut Cursor,
    pc: Option<u64>,
    opcode: OpcodeByte,
) -> Result<Instruction, ParseError> {
    let start = c.pos();
    let payload = if opcode.class.is_jump() {
        let op = opcode
            .jump_op()
            .ok_or(ParseError::UnassignedJumpCode {
                offset: start,
                code: opcode.code,
            })?;
        Payload::Jump(parse_jump(c, op)?)
    } else {
        Payload::Alu(parse_alu(c)?)
    };
    Ok(Instruction::new(pc, opcode, payload, c.span_from(start)))
}

fn parse_alu(c: &mut Cursor) -> Result<AluPayload, ParseError> {
    let atomic = c
        .attempt(|c| {
            if c.eat_keyword("lock") && c.skip_whitespace() > 0 {
                Ok(())
            } else {
                Err(())
            }
        })
        .is_ok();

    let dst = parse_operand(c, Position::Destination)?;
    c.skip_whitespace();
    let operator = c
        .eat_longest(&ALL_ALU_OPERATORS, |op| op.symbol())
        .ok_or(ParseError::ExpectedOperator { offset: c.pos() })?;
    c.skip_whitespace();
    let modifier = parse_source_modifier(c);
    let src = parse_operand(c, Position::Source)?;

    Ok(AluPayload {
        operator,
        dst,
        src,
        modifier,
        atomic,
    })
}

fn parse_jump(c: &mut Cursor, op: JumpOp) -> Result<JumpPayload, ParseError> {
    match op {
        JumpOp::Call => parse_call(c),
        JumpOp::Exit => {
            // Nothing but the keyword; the simulator does the rest.
            c.eat_keyword("exit");
            Ok(JumpPayload {
                kind: JumpKind::Exit,
                target: String::new(),
                target_span: None,
                condition: None,
            })
        }
        JumpOp::Ja => {
            expect_goto(c)?;
            let (target, span) = parse_target(c)?;
            Ok(JumpPayload {
                kind: JumpKind::UnconditionalGoto,
                target,
                target_span: Some(span),
                condition: None,
            })
        }
        _ => parse_conditional(c),
    }
}

/// `call pc+N` is a subprogram call; anything else (`name#id`) is a helper.
fn parse_call(c: &mut Cursor) -> Result<JumpPayload, ParseError> {
    expect_keyword(c, "call")?;
    let (target, span) = parse_target(c)?;
    let kind = if parse_pc_offset(&target).is_some() {
        JumpKind::Bpf2BpfCall
    } else {
        JumpKind::HelperCall
    };
    Ok(JumpPayload {
        kind,
        target,
        target_span: Some(span),
        condition: None,
    })
}

fn parse_conditional(c: &mut Cursor) -> Result<JumpPayload, ParseError> {
    expect_keyword(c, "if")?;
    let left = c.attempt(parse_register)?;
    c.skip_whitespace();
    let comparator = c
        .eat_longest(&ALL_COMPARATORS, |cmp| cmp.symbol())
        .ok_or(ParseError::ExpectedOperator { offset: c.pos() })?;
    c.skip_whitespace();
    let right = parse_operand(c, Position::Source)?;
    if c.skip_whitespace() == 0 {
        return Err(ParseError::ExpectedKeyword {
            offset: c.pos(),
            keyword: "goto",
        });
    }
    expect_goto(c)?;
    let (target, span) = parse_target(c)?;

    Ok(JumpPayload {
        kind: JumpKind::ConditionalGoto,
        target,
        target_span: Some(span),
        condition: Some(Condition {
            left,
            comparator,
            right,
        }),
    })
}

/// `goto` or the long-jump form `gotol`.
fn expect_goto(c: &mut Cursor) -> Result<(), ParseError> {
    if c.eat_keyword("gotol") {
        return require_whitespace(c);
    }
    expect_keyword(c, "goto")
}

fn expect_keyword(c: &mut Cursor, keyword: &'static str) -> Result<(), ParseError> {
    if !c.eat_keyword(keyword) {
        return Err(ParseError::ExpectedKeyword {
            offset: c.pos(),
            keyword,
        });
    }
    require_whitespace(c)
}

fn require_whitespace(c: &mut Cursor) -> Result<(), ParseError> {
    if c.skip_whitespace() == 0 {
        return Err(ParseError::MissingTarget { offset: c.pos() });
    }
    Ok(())
}

/// A jump target: one token up to whitespace or the comment separator.
fn parse_target(c: &mut Cursor) -> Result<(String, Span), ParseError> {
    let start = c.pos();
    let text = c.take_while(|b| is_ident_byte(b) || matches!(b, b'+' | b'-' | b'#' | b'.'));
    if text.is_empty() {
        return Err(ParseError::MissingTarget { offset: start });
    }
    Ok((text.to_string(), c.span_from(start)))
}
