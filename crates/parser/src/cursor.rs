//! Byte cursor over a single log line.
//!
//! Every matcher either consumes input and succeeds, or fails and leaves
//! the position where it was. [`Cursor::attempt`] gives the same guarantee
//! to composite matchers.

use vlog_common::Span;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    pub(crate) fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + ahead).copied()
    }

    /// Span from `start` to the current position.
    pub(crate) fn span_from(&self, start: usize) -> Span {
        Span::from_range(start, self.pos)
    }

    /// Skip spaces and tabs; returns how many bytes were skipped.
    pub(crate) fn skip_whitespace(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Consume `literal` if the input starts with it.
    pub(crate) fn eat(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    /// Consume a keyword: the literal followed by a non-identifier byte.
    pub(crate) fn eat_keyword(&mut self, keyword: &str) -> bool {
        let saved = self.pos;
        if self.eat(keyword) && !self.peek().is_some_and(is_ident_byte) {
            return true;
        }
        self.pos = saved;
        false
    }

    /// Consume the longest table entry the input starts with.
    ///
    /// `table` must already be ordered longest symbol first; the first hit
    /// wins.
    pub(crate) fn eat_longest<T: Copy>(
        &mut self,
        table: &[T],
        symbol: impl Fn(T) -> &'static str,
    ) -> Option<T> {
        let rest = self.rest();
        let hit = table.iter().copied().find(|&t| rest.starts_with(symbol(t)))?;
        self.pos += symbol(hit).len();
        Some(hit)
    }

    /// Consume ASCII bytes while `pred` holds.
    pub(crate) fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Run `f`; on failure, rewind to where it started.
    pub(crate) fn attempt<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let saved = self.pos;
        let result = f(self);
        if result.is_err() {
            self.pos = saved;
        }
        result
    }
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
