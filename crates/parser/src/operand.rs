//! Operand matchers: register, memory reference, immediate.

use crate::cursor::{is_ident_byte, Cursor};
use crate::error::ParseError;
use vlog_common::instruction::{ByteOrder, SourceModifier};
use vlog_common::slot::MAX_REGISTER;
use vlog_common::{MemRef, Operand, OperandKind};

/// Which side of an assignment or comparison is being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    /// Registers and memory only.
    Destination,
    /// Registers, memory, or an immediate.
    Source,
}

/// Memory access widths, as printed in `*(u32 *)`.
const WIDTHS: [(&str, u8); 4] = [("u16", 2), ("u32", 4), ("u64", 8), ("u8", 1)];

/// Byte-swap prefixes, longest first.
const BYTE_SWAPS: [(&str, ByteOrder, u8); 9] = [
    ("bswap16", ByteOrder::Swap, 16),
    ("bswap32", ByteOrder::Swap, 32),
    ("bswap64", ByteOrder::Swap, 64),
    ("be16", ByteOrder::Big, 16),
    ("be32", ByteOrder::Big, 32),
    ("be64", ByteOrder::Big, 64),
    ("le16", ByteOrder::Little, 16),
    ("le32", ByteOrder::Little, 32),
    ("le64", ByteOrder::Little, 64),
];

/// Sign-extension casts of `movsx`.
const SIGN_EXTENDS: [(&str, u8); 3] = [("(s8)", 8), ("(s16)", 16), ("(s32)", 32)];

/// Try each alternative in priority order: register, memory, immediate.
///
/// The individual matchers may leave the cursor mid-token on failure; this
/// function (and every other caller) runs them under [`Cursor::attempt`].
pub(crate) fn parse_operand(c: &mut Cursor, position: Position) -> Result<Operand, ParseError> {
    let offset = c.pos();
    if let Ok(op) = c.attempt(parse_register) {
        return Ok(op);
    }
    if let Ok(op) = c.attempt(parse_memory) {
        return Ok(op);
    }
    if position == Position::Source {
        if let Ok(op) = c.attempt(parse_immediate) {
            return Ok(op);
        }
    }
    Err(ParseError::ExpectedOperand { offset })
}

/// `r0`..`r10`, or `w0`..`w9` (size 4). The whole identifier must match.
pub(crate) fn parse_register(c: &mut Cursor) -> Result<Operand, ParseError> {
    let start = c.pos();
    let err = || ParseError::ExpectedOperand { offset: start };

    let (size, max) = match c.peek() {
        Some(b'r') => (8, MAX_REGISTER),
        Some(b'w') => (4, MAX_REGISTER - 1),
        _ => return Err(err()),
    };
    c.eat(if size == 8 { "r" } else { "w" });
    let digits = c.take_while(|b| b.is_ascii_digit());
    if digits.is_empty() || digits.len() > 2 || c.peek().is_some_and(is_ident_byte) {
        return Err(err());
    }
    let n: u8 = digits.parse().map_err(|_| err())?;
    if n > max {
        return Err(err());
    }
    Ok(Operand::register(n, size, c.span_from(start)))
}

/// `*(<width> *)(<reg> <±offset>)`.
pub(crate) fn parse_memory(c: &mut Cursor) -> Result<Operand, ParseError> {
    let start = c.pos();
    let err = || ParseError::ExpectedOperand { offset: start };

    if !c.eat("*(") {
        return Err(err());
    }
    c.skip_whitespace();
    let size = WIDTHS
        .iter()
        .find(|(name, _)| c.eat_keyword(name))
        .map(|&(_, size)| size)
        .ok_or_else(err)?;
    c.skip_whitespace();
    if !c.eat("*)") {
        return Err(err());
    }
    c.skip_whitespace();
    if !c.eat("(") {
        return Err(err());
    }
    c.skip_whitespace();
    let base = match parse_register(c)?.kind {
        OperandKind::Register(n) => n,
        _ => return Err(err()),
    };
    c.skip_whitespace();
    let offset = parse_signed_offset(c).ok_or_else(err)?;
    c.skip_whitespace();
    if !c.eat(")") {
        return Err(err());
    }

    Ok(Operand::memory(MemRef { base, offset }, size, c.span_from(start)))
}

fn parse_signed_offset(c: &mut Cursor) -> Option<i32> {
    let negative = match c.peek() {
        Some(b'-') => true,
        Some(b'+') => false,
        _ => return None,
    };
    c.eat(if negative { "-" } else { "+" });
    let magnitude: i64 = c.take_while(|b| b.is_ascii_digit()).parse().ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}

/// Decimal (optionally negative) or `0x` hex literal, with an optional
/// ` ll` suffix (64-bit immediate load).
pub(crate) fn parse_immediate(c: &mut Cursor) -> Result<Operand, ParseError> {
    let start = c.pos();
    let err = || ParseError::ExpectedOperand { offset: start };

    let negative = c.eat("-");
    let value = if c.eat("0x") || c.eat("0X") {
        let hex = c.take_while(|b| b.is_ascii_hexdigit());
        u64::from_str_radix(hex, 16).map_err(|_| err())? as i64
    } else {
        let digits = c.take_while(|b| b.is_ascii_digit());
        match digits.parse::<i64>() {
            Ok(v) => v,
            Err(_) => digits.parse::<u64>().map_err(|_| err())? as i64,
        }
    };
    if c.peek().is_some_and(is_ident_byte) {
        return Err(err());
    }
    let span = c.span_from(start);
    let _ = c.attempt(|c| {
        if c.skip_whitespace() > 0 && c.eat_keyword("ll") {
            Ok(())
        } else {
            Err(())
        }
    });

    let value = if negative { value.wrapping_neg() } else { value };
    Ok(Operand::immediate(value, span))
}

/// Optional prefix in front of a source operand.
pub(crate) fn parse_source_modifier(c: &mut Cursor) -> Option<SourceModifier> {
    if c.peek() == Some(b'-') && matches!(c.peek_at(1), Some(b'r' | b'w')) {
        c.eat("-");
        return Some(SourceModifier::Negate);
    }
    for &(word, order, bits) in &BYTE_SWAPS {
        let hit = c.attempt(|c| {
            if c.eat_keyword(word) && c.skip_whitespace() > 0 {
                Ok(())
            } else {
                Err(())
            }
        });
        if hit.is_ok() {
            return Some(SourceModifier::ByteSwap { order, bits });
        }
    }
    for &(cast, bits) in &SIGN_EXTENDS {
        if c.eat(cast) {
            c.skip_whitespace();
            return Some(SourceModifier::SignExtend(bits));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlog_common::Span;

    fn operand(text: &str, position: Position) -> Result<Operand, ParseError> {
        let mut c = Cursor::new(text);
        parse_operand(&mut c, position)
    }

    #[test]
    fn registers_and_aliases() {
        let op = operand("r10", Position::Destination).unwrap();
        assert_eq!(op.kind, OperandKind::Register(10));
        assert_eq!(op.size, 8);

        let op = operand("w3", Position::Source).unwrap();
        assert_eq!(op.kind, OperandKind::Register(3));
        assert_eq!(op.size, 4);

        assert!(operand("r11", Position::Source).is_err());
        assert!(operand("w10", Position::Destination).is_err());
        assert!(operand("r1x", Position::Destination).is_err());
    }

    #[test]
    fn memory_widths_and_offsets() {
        let op = operand("*(u32 *)(r10 -64)", Position::Destination).unwrap();
        assert_eq!(op.size, 4);
        assert_eq!(
            op.kind,
            OperandKind::FramePointerSlot(MemRef {
                base: 10,
                offset: -64
            })
        );

        let op = operand("*(u8 *)(r7 +13)", Position::Source).unwrap();
        assert_eq!(op.size, 1);
        assert_eq!(op.kind, OperandKind::Memory(MemRef { base: 7, offset: 13 }));
        assert_eq!(op.span, Span::new(0, 15));
    }

    #[test]
    fn memory_without_sign_is_rejected() {
        assert!(operand("*(u64 *)(r1 8)", Position::Source).is_err());
        assert!(operand("*(u128 *)(r1 +8)", Position::Source).is_err());
    }

    #[test]
    fn immediates_only_in_source_position() {
        let op = operand("-1", Position::Source).unwrap();
        assert_eq!(op.kind, OperandKind::Immediate(-1));
        assert_eq!(
            operand("1", Position::Destination),
            Err(ParseError::ExpectedOperand { offset: 0 })
        );
    }

    #[test]
    fn hex_and_unsigned_overflow() {
        let op = operand("0xffffffff", Position::Source).unwrap();
        assert_eq!(op.kind, OperandKind::Immediate(0xffff_ffff));
        let op = operand("18446744073709551615", Position::Source).unwrap();
        assert_eq!(op.kind, OperandKind::Immediate(-1));
    }

    #[test]
    fn ll_suffix_is_consumed_but_not_spanned() {
        let mut c = Cursor::new("0x1234 ll ; R1=1");
        let op = parse_immediate(&mut c).unwrap();
        assert_eq!(op.span, Span::new(0, 6));
        assert_eq!(c.rest(), " ; R1=1");
    }

    #[test]
    fn modifiers() {
        let mut c = Cursor::new("-r1");
        assert_eq!(parse_source_modifier(&mut c), Some(SourceModifier::Negate));
        assert_eq!(c.rest(), "r1");

        let mut c = Cursor::new("be16 r2");
        assert_eq!(
            parse_source_modifier(&mut c),
            Some(SourceModifier::ByteSwap {
                order: ByteOrder::Big,
                bits: 16
            })
        );
        assert_eq!(c.rest(), "r2");

        let mut c = Cursor::new("(s16)r3");
        assert_eq!(parse_source_modifier(&mut c), Some(SourceModifier::SignExtend(16)));

        let mut c = Cursor::new("-5");
        assert_eq!(parse_source_modifier(&mut c), None);
        assert_eq!(c.pos(), 0);
    }
}
