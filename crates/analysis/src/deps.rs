//! Use-def dependency chains.
//!
//! A chain starts at the line that last wrote `slot` as seen from the
//! query line and walks backward through single-source writers. An
//! instruction that reads zero or several slots ends the chain.

use vlog_common::SlotId;

use crate::limits::ResolveOptions;
use crate::log::VerifierLog;

/// Lines that produced the value of `slot` seen at `line`, nearest first.
///
/// Writer indices strictly decrease along the chain, so the walk always
/// terminates; `options.max_depth` caps its length.
pub fn resolve_dependencies(
    log: &VerifierLog,
    line: usize,
    slot: SlotId,
    options: &ResolveOptions,
) -> Vec<usize> {
    let mut chain = Vec::new();
    let mut line = line;
    let mut slot = slot;

    while chain.len() < options.max_depth {
        let Some(writer) = writer_of(log, line, slot) else {
            break;
        };
        chain.push(writer);

        let Some(instruction) = log.line(writer).and_then(|l| l.instruction()) else {
            break;
        };
        let mut reads = instruction.reads.iter();
        match (reads.next(), reads.next()) {
            (Some(&next), None) => {
                slot = next;
                line = writer;
            }
            _ => break,
        }
    }
    chain
}

/// Last writer of `slot` strictly before `line`.
///
/// The state at `line` is consulted first; when `line` itself wrote the
/// slot, the nearest state before it answers instead.
fn writer_of(log: &VerifierLog, line: usize, slot: SlotId) -> Option<usize> {
    let writer = log.state_at(line)?.last_write(slot)?;
    if writer < line {
        return Some(writer);
    }
    let before = line.checked_sub(1)?;
    let writer = log.state_at(before)?.last_write(slot)?;
    (writer < line).then_some(writer)
}
