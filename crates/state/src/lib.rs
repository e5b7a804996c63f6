//! Machine-state simulator for eBPF verifier logs.
//!
//! Folds parsed lines into a sequence of immutable [`MachineState`]
//! snapshots. The simulator does not execute anything: values are the text
//! the verifier reported, and instructions only decide which slots were
//! read, which were written, and which frame is current.
//!
//! # Usage
//!
//! ```
//! use vlog_common::SlotId;
//! use vlog_parser::parse_line;
//! use vlog_state::{advance_state, MachineState};
//!
//! let start = MachineState::initial();
//! let line = parse_line("0: (b7) r2 = 1                        ; R2_w=1");
//! let next = advance_state(&start, 0, &line).unwrap();
//! assert_eq!(next.value(SlotId::Register(2)), Some("1"));
//! assert_eq!(next.last_write(SlotId::Register(2)), Some(0));
//! ```

pub mod advance;
pub mod machine;

pub use advance::{advance_instruction, advance_state};
pub use machine::{Effect, MachineState, SlotState};
