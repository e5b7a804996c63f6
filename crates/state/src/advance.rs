//! The state transition: one instruction line in, one snapshot out.
//!
//! A snapshot depends only on the previous snapshot and the line itself.
//! Calls and exits move between frames; everything else edits slots in
//! place.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use vlog_common::slot::{CALLEE_SAVED_REGISTERS, FRAME_POINTER, RETURN_REGISTER, SCRATCH_REGISTERS};
use vlog_common::{Instruction, JumpKind, SlotId, StateExpression};
use vlog_parser::{LineKind, ParsedLine};

use crate::machine::{Effect, MachineState, SlotState, FRAME_POINTER_VALUE};

/// Advance `previous` by one parsed line.
///
/// Returns `None` for lines that are not instructions; those do not move
/// the simulated machine.
pub fn advance_state(
    previous: &MachineState,
    line_index: usize,
    line: &ParsedLine,
) -> Option<MachineState> {
    match &line.kind {
        LineKind::Instruction { instruction, state } => Some(advance_instruction(
            previous,
            line_index,
            instruction,
            state,
        )),
        LineKind::SourceComment { .. } | LineKind::Unrecognized(_) => None,
    }
}

/// Apply an instruction and the facts reported on its line.
pub fn advance_instruction(
    previous: &MachineState,
    line_index: usize,
    instruction: &Instruction,
    expressions: &[StateExpression],
) -> MachineState {
    let mut next = match instruction.jump_kind() {
        Some(JumpKind::Bpf2BpfCall) => enter_subprogram(previous, line_index),
        Some(JumpKind::Exit) => leave_subprogram(previous, line_index),
        _ => step(previous, instruction, line_index),
    };
    next.pc = instruction.pc;
    next.line = Some(line_index);
    apply_expressions(&mut next, expressions, line_index);
    next
}

/// Copy of `previous` with every effect cleared.
fn carry_values(previous: &MachineState) -> MachineState {
    let mut next = previous.clone();
    for slot in next.slots.values_mut() {
        slot.effect = Effect::None;
    }
    next
}

fn step(previous: &MachineState, instruction: &Instruction, line_index: usize) -> MachineState {
    let mut next = carry_values(previous);
    for &id in &instruction.reads {
        let slot = next.slots.entry(id).or_default();
        slot.effect = slot.effect.with_read();
    }
    for &id in &instruction.writes {
        let slot = next.slots.entry(id).or_default();
        slot.effect = slot.effect.with_write();
        slot.value = None;
        next.last_write.insert(id, line_index);
    }
    next
}

/// Push the caller and open a fresh frame.
///
/// Arguments `r1`..`r5` flow in unchanged; `r0` and the callee-saved
/// registers start unknown; the new frame has no stack slots.
fn enter_subprogram(previous: &MachineState, line_index: usize) -> MachineState {
    let mut slots = BTreeMap::new();
    let mut last_write = BTreeMap::new();

    for r in SCRATCH_REGISTERS {
        let id = SlotId::Register(r);
        let value = previous.value(id).map(str::to_string);
        slots.insert(
            id,
            SlotState {
                value,
                effect: Effect::Read,
            },
        );
        if let Some(line) = previous.last_write(id) {
            last_write.insert(id, line);
        }
    }
    for r in std::iter::once(RETURN_REGISTER).chain(CALLEE_SAVED_REGISTERS) {
        let id = SlotId::Register(r);
        slots.insert(id, SlotState::unknown(Effect::Write));
        last_write.insert(id, line_index);
    }
    slots.insert(
        SlotId::Register(FRAME_POINTER),
        SlotState::known(FRAME_POINTER_VALUE),
    );

    let mut callers = previous.callers.clone();
    callers.push(Arc::new(previous.clone()));
    let frame = previous.frame + 1;
    debug!(line = line_index, frame, "entering subprogram");

    MachineState {
        slots,
        last_write,
        frame,
        pc: previous.pc,
        line: previous.line,
        callers,
    }
}

/// Pop back to the caller, carrying `r0` out of the exiting frame.
fn leave_subprogram(previous: &MachineState, line_index: usize) -> MachineState {
    let parent = match previous.caller() {
        Some(caller) => carry_values(caller),
        None => {
            // The main program's own exit lands here as well.
            debug!(
                line = line_index,
                "exit with no caller; continuing from the initial state"
            );
            MachineState::initial()
        }
    };
    let mut next = parent;

    let r0 = SlotId::Register(RETURN_REGISTER);
    next.slots.insert(
        r0,
        SlotState {
            value: previous.value(r0).map(str::to_string),
            effect: Effect::Write,
        },
    );
    next.last_write.insert(r0, line_index);
    for r in SCRATCH_REGISTERS {
        let id = SlotId::Register(r);
        next.slots.insert(id, SlotState::unknown(Effect::Write));
        next.last_write.insert(id, line_index);
    }

    debug!(line = line_index, frame = next.frame, "leaving subprogram");
    next
}

/// Reported facts win over inferred placeholders. Facts for another frame
/// describe a caller's registers and are ignored.
fn apply_expressions(next: &mut MachineState, expressions: &[StateExpression], line_index: usize) {
    for expr in expressions.iter().filter(|e| e.frame == next.frame) {
        let slot = next.slots.entry(expr.id).or_default();
        slot.value = Some(expr.value.clone());
        if expr.written {
            slot.effect = slot.effect.with_write();
            next.last_write.insert(expr.id, line_index);
        }
    }
}
