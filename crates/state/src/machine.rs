//! Machine-state snapshots: slot values, effects, last writers and frames.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use vlog_common::slot::FRAME_POINTER;
use vlog_common::SlotId;

/// Value the verifier prints for the program context in `r1`.
pub const CONTEXT_VALUE: &str = "ctx()";

/// Value of `r10` at the start of every frame.
pub const FRAME_POINTER_VALUE: &str = "fp0";

/// How the line that produced a snapshot touched a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Effect {
    #[default]
    None,
    Read,
    Write,
    /// Read and written by the same line.
    Update,
}

impl Effect {
    /// Combine with a write: a read slot becomes updated.
    pub fn with_write(self) -> Effect {
        match self {
            Effect::Read | Effect::Update => Effect::Update,
            Effect::None | Effect::Write => Effect::Write,
        }
    }

    /// Combine with a read: a written slot becomes updated.
    pub fn with_read(self) -> Effect {
        match self {
            Effect::Write | Effect::Update => Effect::Update,
            Effect::None | Effect::Read => Effect::Read,
        }
    }

    pub fn is_write(self) -> bool {
        matches!(self, Effect::Write | Effect::Update)
    }

    fn tag(self) -> &'static str {
        match self {
            Effect::None => "",
            Effect::Read => "R",
            Effect::Write => "W",
            Effect::Update => "RW",
        }
    }
}

/// One slot in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlotState {
    /// Last known value text; `None` when the slot is known to exist but its
    /// value is unknown.
    pub value: Option<String>,
    pub effect: Effect,
}

impl SlotState {
    pub fn known(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            effect: Effect::None,
        }
    }

    pub fn unknown(effect: Effect) -> Self {
        Self {
            value: None,
            effect,
        }
    }
}

/// Simulated machine state after one instruction line.
///
/// Immutable once built. Caller frames are shared through `Arc`, so a
/// snapshot inside a subprogram holds its whole call chain cheaply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    pub(crate) slots: BTreeMap<SlotId, SlotState>,
    pub(crate) last_write: BTreeMap<SlotId, usize>,
    pub(crate) frame: usize,
    pub(crate) pc: Option<u64>,
    pub(crate) line: Option<usize>,
    pub(crate) callers: Vec<Arc<MachineState>>,
}

impl MachineState {
    /// State before the first line: `r1 = ctx()`, `r10 = fp0`, frame 0.
    pub fn initial() -> Self {
        let mut slots = BTreeMap::new();
        slots.insert(SlotId::Register(1), SlotState::known(CONTEXT_VALUE));
        slots.insert(
            SlotId::Register(FRAME_POINTER),
            SlotState::known(FRAME_POINTER_VALUE),
        );
        Self {
            slots,
            last_write: BTreeMap::new(),
            frame: 0,
            pc: None,
            line: None,
            callers: Vec::new(),
        }
    }

    pub fn slot(&self, id: SlotId) -> Option<&SlotState> {
        self.slots.get(&id)
    }

    /// Known value of a slot, if any.
    pub fn value(&self, id: SlotId) -> Option<&str> {
        self.slots.get(&id)?.value.as_deref()
    }

    /// Effect of the producing line on `id`; `Effect::None` for absent slots.
    pub fn effect(&self, id: SlotId) -> Effect {
        self.slots.get(&id).map(|s| s.effect).unwrap_or_default()
    }

    /// Every tracked slot in id order.
    pub fn slots(&self) -> impl Iterator<Item = (SlotId, &SlotState)> {
        self.slots.iter().map(|(id, s)| (*id, s))
    }

    /// Index of the line that last wrote `id`.
    pub fn last_write(&self, id: SlotId) -> Option<usize> {
        self.last_write.get(&id).copied()
    }

    /// Call-frame depth; 0 in the main program.
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn pc(&self) -> Option<u64> {
        self.pc
    }

    /// Index of the line that produced this snapshot; `None` for the
    /// initial state.
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// The state saved at the innermost pending call.
    pub fn caller(&self) -> Option<&Arc<MachineState>> {
        self.callers.last()
    }

    /// blake3 digest of the canonical rendering, caller frames included.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        self.hash_into(&mut hasher);
        hasher.finalize()
    }

    fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(self.to_string().as_bytes());
        for (id, line) in &self.last_write {
            hasher.update(format!("{id}<{line};").as_bytes());
        }
        for caller in &self.callers {
            hasher.update(b"|");
            caller.hash_into(hasher);
        }
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::initial()
    }
}

/// `frame 1 pc 12: r0=0 [W] r1=ctx() r10=fp0`
impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {}", self.frame)?;
        if let Some(pc) = self.pc {
            write!(f, " pc {pc}")?;
        }
        f.write_str(":")?;
        for (id, slot) in &self.slots {
            write!(f, " {id}={}", slot.value.as_deref().unwrap_or("?"))?;
            if slot.effect != Effect::None {
                write!(f, " [{}]", slot.effect.tag())?;
            }
        }
        Ok(())
    }
}
