//! Storage slot identifiers: registers, frame-pointer stack slots and `MEM`.
//!
//! 32-bit sub-registers (`w0`..`w9`) share the id of their 64-bit parent;
//! only operand size metadata tells them apart.

use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;

/// Highest register number (`r10`, the frame pointer).
pub const MAX_REGISTER: u8 = 10;

/// Frame pointer register number.
pub const FRAME_POINTER: u8 = 10;

/// Return value register.
pub const RETURN_REGISTER: u8 = 0;

/// Argument / caller-saved registers `r1`..`r5`.
pub const SCRATCH_REGISTERS: [u8; 5] = [1, 2, 3, 4, 5];

/// Callee-saved registers `r6`..`r9`.
pub const CALLEE_SAVED_REGISTERS: [u8; 4] = [6, 7, 8, 9];

/// Canonical identifier of a storage slot.
///
/// Ordering is registers (by number), then stack slots (by offset), then
/// `MEM`, which keeps snapshot iteration deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotId {
    /// Register `r0`..`r10`.
    Register(u8),
    /// Stack slot addressed through the frame pointer, e.g. `fp-24`.
    Stack(i32),
    /// Any non-stack memory. Deliberately a single opaque slot.
    Memory,
}

impl SlotId {
    /// The frame pointer register.
    pub const FP: SlotId = SlotId::Register(FRAME_POINTER);

    /// Register slot, rejecting numbers above `r10`.
    pub fn register(n: u8) -> Result<Self, DecodeError> {
        if n > MAX_REGISTER {
            return Err(DecodeError::RegisterOutOfRange(n as u32));
        }
        Ok(SlotId::Register(n))
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Register(n) => write!(f, "r{n}"),
            SlotId::Stack(off) if *off < 0 => write!(f, "fp{off}"),
            SlotId::Stack(off) => write!(f, "fp+{off}"),
            SlotId::Memory => f.write_str("MEM"),
        }
    }
}

impl FromStr for SlotId {
    type Err = DecodeError;

    /// Accepts `r0`..`r10`, `w0`..`w9`, `fp-N`, `fp+N` and `MEM`,
    /// case-insensitively (the verifier prints `R1`, `fp-8`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecodeError::InvalidSlotId(s.to_string());
        let lower = s.to_ascii_lowercase();

        if lower == "mem" {
            return Ok(SlotId::Memory);
        }
        if let Some(off) = lower.strip_prefix("fp") {
            if !(off.starts_with('-') || off.starts_with('+')) {
                return Err(invalid());
            }
            let digits = &off[1..];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let value: i32 = off.parse().map_err(|_| invalid())?;
            return Ok(SlotId::Stack(value));
        }

        let (alias, digits) = match lower.as_bytes().first() {
            Some(b'r') => (false, &lower[1..]),
            Some(b'w') => (true, &lower[1..]),
            _ => return Err(invalid()),
        };
        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let n: u8 = digits.parse().map_err(|_| invalid())?;
        // w10 does not exist: the frame pointer has no 32-bit view.
        if alias && n == FRAME_POINTER {
            return Err(invalid());
        }
        SlotId::register(n)
    }
}
