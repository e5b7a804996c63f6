//! Incremental ingestion of a verifier log.
//!
//! Lines can arrive one at a time, in arbitrary text chunks, or from a
//! reader. Every line is parsed once, folded into the running machine
//! state, and kept for random access.

use std::io::BufRead;
use std::sync::Arc;

use tracing::info;
use vlog_common::SlotId;
use vlog_parser::{parse_line, Classification, ParsedLine};
use vlog_state::{advance_state, MachineState};

use crate::deps;
use crate::error::LogError;
use crate::limits::ResolveOptions;

/// Line counts by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogSummary {
    pub lines: usize,
    pub instructions: usize,
    pub source_comments: usize,
    pub unrecognized: usize,
    /// Deepest call frame reached.
    pub max_frame: usize,
}

/// A parsed verifier log with one machine-state snapshot per instruction
/// line.
#[derive(Debug, Clone)]
pub struct VerifierLog {
    lines: Vec<ParsedLine>,
    /// Snapshots in production order.
    states: Vec<Arc<MachineState>>,
    /// For each line, the index into `states` of the nearest snapshot at or
    /// before it.
    nearest: Vec<Option<usize>>,
    current: Arc<MachineState>,
    /// Text after the last newline fed so far.
    pending: String,
    summary: LogSummary,
    options: ResolveOptions,
}

impl Default for VerifierLog {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifierLog {
    pub fn new() -> Self {
        Self::with_options(ResolveOptions::default())
    }

    pub fn with_options(options: ResolveOptions) -> Self {
        Self {
            lines: Vec::new(),
            states: Vec::new(),
            nearest: Vec::new(),
            current: Arc::new(MachineState::initial()),
            pending: String::new(),
            summary: LogSummary::default(),
            options,
        }
    }

    /// Read a whole log. Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] if the reader fails.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, LogError> {
        let mut log = Self::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            log.push_line(&String::from_utf8_lossy(&buf));
        }
        log.finish();
        Ok(log)
    }

    /// Parse and fold one complete line. Returns its index.
    pub fn push_line(&mut self, raw: &str) -> usize {
        let index = self.lines.len();
        let parsed = parse_line(raw);

        let nearest = match advance_state(&self.current, index, &parsed) {
            Some(state) => {
                self.summary.max_frame = self.summary.max_frame.max(state.frame());
                let state = Arc::new(state);
                self.current = Arc::clone(&state);
                self.states.push(state);
                Some(self.states.len() - 1)
            }
            None => self.nearest.last().copied().flatten(),
        };
        self.nearest.push(nearest);

        self.summary.lines += 1;
        match parsed.classification() {
            Classification::Instruction => self.summary.instructions += 1,
            Classification::SourceComment => self.summary.source_comments += 1,
            Classification::Unrecognized => self.summary.unrecognized += 1,
        }
        self.lines.push(parsed);
        index
    }

    /// Feed an arbitrary chunk of text. Complete lines are processed now;
    /// a trailing partial line waits for the next chunk or [`finish`].
    ///
    /// [`finish`]: VerifierLog::finish
    pub fn feed(&mut self, chunk: &str) {
        let mut buffer = std::mem::take(&mut self.pending);
        // `pending` never holds a newline, so only the new chunk is scanned.
        let mut scan = buffer.len();
        buffer.push_str(chunk);

        let mut start = 0;
        while let Some(offset) = buffer[scan..].find('\n') {
            let end = scan + offset + 1;
            self.push_line(&buffer[start..end]);
            start = end;
            scan = end;
        }
        buffer.drain(..start);
        self.pending = buffer;
    }

    /// Flush a pending partial line and log a summary.
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.push_line(&line);
        }
        info!(
            lines = self.summary.lines,
            instructions = self.summary.instructions,
            unrecognized = self.summary.unrecognized,
            max_frame = self.summary.max_frame,
            "verifier log loaded"
        );
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&ParsedLine> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> impl Iterator<Item = &ParsedLine> {
        self.lines.iter()
    }

    /// The state as of `index`: the snapshot of the nearest instruction
    /// line at or before it.
    pub fn state_at(&self, index: usize) -> Option<&MachineState> {
        let k = (*self.nearest.get(index)?)?;
        self.states.get(k).map(|s| &**s)
    }

    /// Shared handle to the state as of `index`.
    pub fn snapshot(&self, index: usize) -> Option<Arc<MachineState>> {
        let k = (*self.nearest.get(index)?)?;
        self.states.get(k).cloned()
    }

    /// The running state after everything fed so far.
    pub fn current(&self) -> &MachineState {
        &self.current
    }

    /// Lines where `slot`'s value at `index` came from, nearest first.
    pub fn resolve_dependencies(&self, index: usize, slot: SlotId) -> Vec<usize> {
        deps::resolve_dependencies(self, index, slot, &self.options)
    }

    /// Lines that could not be parsed, with their indices.
    pub fn unrecognized(&self) -> impl Iterator<Item = (usize, &ParsedLine)> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.classification() == Classification::Unrecognized)
    }

    pub fn summary(&self) -> LogSummary {
        self.summary
    }

}
