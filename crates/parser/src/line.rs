//! Line parser: `<pc>: (<hh>) <instruction>[ ; <state comment>]`.

use tracing::trace;

use crate::comment::parse_state_comment;
use crate::cursor::Cursor;
use crate::error::ParseError;
use crate::grammar::parse_instruction;
use vlog_common::{Instruction, OpcodeByte, Span, StateExpression};

/// Coarse category of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// A decoded instruction; the only kind that advances machine state.
    Instruction,
    /// A `; <C source> @ file.c:12` annotation.
    SourceComment,
    /// Anything else. Kept verbatim.
    Unrecognized,
}

/// What a line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Instruction {
        instruction: Instruction,
        state: Vec<StateExpression>,
    },
    SourceComment {
        /// The annotation text after `;`.
        text: Span,
    },
    Unrecognized(ParseError),
}

/// One log line, parsed. The raw text is always preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub raw: String,
    pub kind: LineKind,
}

impl ParsedLine {
    pub fn classification(&self) -> Classification {
        match self.kind {
            LineKind::Instruction { .. } => Classification::Instruction,
            LineKind::SourceComment { .. } => Classification::SourceComment,
            LineKind::Unrecognized(_) => Classification::Unrecognized,
        }
    }

    pub fn instruction(&self) -> Option<&Instruction> {
        match &self.kind {
            LineKind::Instruction { instruction, .. } => Some(instruction),
            _ => None,
        }
    }

    /// Facts from the state comment; empty unless this is an instruction.
    pub fn state_expressions(&self) -> &[StateExpression] {
        match &self.kind {
            LineKind::Instruction { state, .. } => state,
            _ => &[],
        }
    }

    /// Why the line was not recognized.
    pub fn error(&self) -> Option<&ParseError> {
        match &self.kind {
            LineKind::Unrecognized(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_instruction(&self) -> bool {
        self.classification() == Classification::Instruction
    }
}

/// Parse exactly one line. Never fails: malformed input is classified
/// [`Classification::Unrecognized`] with the reason attached.
pub fn parse_line(raw: &str) -> ParsedLine {
    let raw = raw.trim_end_matches(['\n', '\r']);
    let kind = match classify(raw) {
        Ok(kind) => kind,
        Err(e) => {
            trace!(reason = %e, line = raw, "unrecognized line");
            LineKind::Unrecognized(e)
        }
    };
    ParsedLine {
        raw: raw.to_string(),
        kind,
    }
}

fn classify(raw: &str) -> Result<LineKind, ParseError> {
    let mut c = Cursor::new(raw);
    c.skip_whitespace();
    if c.is_at_end() {
        return Err(ParseError::Empty);
    }
    if c.eat(";") {
        c.skip_whitespace();
        let start = c.pos();
        let text = raw[start..].trim_end();
        return Ok(LineKind::SourceComment {
            text: Span::new(start, text.len()),
        });
    }

    let pc = parse_pc(&mut c)?;
    expect_char(&mut c, ':')?;
    c.skip_whitespace();
    let opcode = parse_opcode(&mut c)?;
    c.skip_whitespace();

    let instruction = parse_instruction(&mut c, Some(pc), opcode)?;

    c.skip_whitespace();
    let state = if c.is_at_end() {
        Vec::new()
    } else if c.eat(";") {
        parse_state_comment(raw, c.pos())
    } else {
        return Err(ParseError::TrailingText {
            offset: c.pos(),
            text: c.rest().trim_end().to_string(),
        });
    };

    Ok(LineKind::Instruction { instruction, state })
}

fn parse_pc(c: &mut Cursor) -> Result<u64, ParseError> {
    let offset = c.pos();
    c.take_while(|b| b.is_ascii_digit())
        .parse()
        .map_err(|_| ParseError::MissingProgramCounter { offset })
}

/// `(hh)`: exactly two hex digits between parentheses.
fn parse_opcode(c: &mut Cursor) -> Result<OpcodeByte, ParseError> {
    expect_char(c, '(')?;
    let offset = c.pos();
    let text = c.take_while(|b| b != b')' && b != b' ');
    let opcode = text
        .parse::<OpcodeByte>()
        .map_err(|source| ParseError::BadOpcode { offset, source })?;
    expect_char(c, ')')?;
    Ok(opcode)
}

fn expect_char(c: &mut Cursor, expected: char) -> Result<(), ParseError> {
    let mut buf = [0u8; 4];
    if c.eat(expected.encode_utf8(&mut buf)) {
        return Ok(());
    }
    Err(ParseError::ExpectedChar {
        offset: c.pos(),
        expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlog_common::{AluOperator, JumpKind, OperandKind, SlotId};

    #[test]
    fn mov_with_state() {
        let line = parse_line("0: (b7) r2 = 1                        ; R2_w=1");
        assert_eq!(line.classification(), Classification::Instruction);
        let instr = line.instruction().unwrap();
        assert_eq!(instr.pc, Some(0));
        let alu = instr.alu().unwrap();
        assert_eq!(alu.operator, AluOperator::Assign);
        assert_eq!(alu.dst.id(), "r2");
        assert_eq!(instr.writes.iter().copied().collect::<Vec<_>>(), [SlotId::Register(2)]);
        let state = line.state_expressions();
        assert_eq!(state.len(), 1);
        assert_eq!(state[0].id.to_string(), "r2");
        assert_eq!(state[0].value, "1");
    }

    #[test]
    fn stack_store_with_three_facts() {
        let line = parse_line("1: (7b) *(u64 *)(r10 -24) = r2        ; R2_w=1 R10=fp0 fp-24_w=1");
        let alu = line.instruction().unwrap().alu().unwrap();
        assert_eq!(alu.dst.id(), "fp-24");
        assert!(matches!(alu.dst.kind, OperandKind::FramePointerSlot(_)));
        assert_eq!(alu.dst.size, 8);
        assert_eq!(alu.src.id(), "r2");
        assert_eq!(line.state_expressions().len(), 3);
    }

    #[test]
    fn helper_call_without_comment() {
        let line = parse_line("7: (85) call bpf_probe_read_user#112");
        let instr = line.instruction().unwrap();
        assert_eq!(instr.jump_kind(), Some(JumpKind::HelperCall));
        assert_eq!(instr.jump().unwrap().target, "bpf_probe_read_user#112");
        assert!(line.state_expressions().is_empty());
    }

    #[test]
    fn spans_point_into_raw_line() {
        let raw = "12: (0f) r1 += r3 ; R1_w=pkt(r=0)";
        let line = parse_line(raw);
        let instr = line.instruction().unwrap();
        let alu = instr.alu().unwrap();
        assert_eq!(alu.dst.span.slice(raw), Some("r1"));
        assert_eq!(alu.src.span.slice(raw), Some("r3"));
        assert_eq!(instr.span.slice(raw), Some("r1 += r3"));
    }

    #[test]
    fn leading_whitespace_and_crlf() {
        let line = parse_line("   3: (95) exit\r\n");
        assert!(line.instruction().unwrap().is_exit());
        assert_eq!(line.raw, "   3: (95) exit");
    }

    #[test]
    fn source_comment_line() {
        let raw = "; int x = bpf_get_prandom_u32(); @ prog.c:12";
        let line = parse_line(raw);
        assert_eq!(line.classification(), Classification::SourceComment);
        match &line.kind {
            LineKind::SourceComment { text } => {
                assert_eq!(text.slice(raw), Some("int x = bpf_get_prandom_u32(); @ prog.c:12"));
            }
            other => panic!("expected source comment, got {other:?}"),
        }
        assert!(line.instruction().is_none());
    }

    #[test]
    fn unrecognized_lines_keep_raw_text() {
        for (raw, expected) in [
            ("", ParseError::Empty),
            (
                "processed 12 insns (limit 1000000)",
                ParseError::MissingProgramCounter { offset: 0 },
            ),
            (
                "from 4 to 6: R0=1 R10=fp0",
                ParseError::MissingProgramCounter { offset: 0 },
            ),
            (
                "6: R0=1 R10=fp0",
                ParseError::ExpectedChar {
                    offset: 3,
                    expected: '(',
                },
            ),
        ] {
            let line = parse_line(raw);
            assert_eq!(line.classification(), Classification::Unrecognized);
            assert_eq!(line.raw, raw);
            assert_eq!(line.error(), Some(&expected));
            assert!(line.state_expressions().is_empty());
        }
    }

    #[test]
    fn bad_opcode_and_bad_body() {
        let line = parse_line("4: (zz) r1 = 0");
        assert!(matches!(line.error(), Some(ParseError::BadOpcode { offset: 4, .. })));

        let line = parse_line("4: (b7) r1 = map[id:3]");
        assert!(matches!(line.error(), Some(ParseError::ExpectedOperand { .. })));

        let line = parse_line("4: (b7) r1 = 0 garbage");
        assert!(matches!(line.error(), Some(ParseError::TrailingText { .. })));
    }

    #[test]
    fn reparse_is_structurally_equal() {
        let raw = "9: (bf) r6 = r1                       ; R1=ctx() R6_w=ctx()";
        assert_eq!(parse_line(raw), parse_line(raw));
    }
}
