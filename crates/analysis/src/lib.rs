//! Verifier-log analysis: incremental loading and dependency queries.
//!
//! # Usage
//!
//! ```
//! use vlog_analysis::VerifierLog;
//! use vlog_common::SlotId;
//!
//! let mut log = VerifierLog::new();
//! log.feed("0: (b7) r1 = 13\n1: (b7) r7 = 0\n2: (bf) r2 = r1\n");
//! log.finish();
//!
//! assert_eq!(log.resolve_dependencies(2, SlotId::Register(1)), [0]);
//! ```

pub mod deps;
pub mod error;
pub mod limits;
pub mod log;

pub use deps::resolve_dependencies;
pub use error::LogError;
pub use limits::{ResolveOptions, DEFAULT_MAX_DEPENDENCY_DEPTH};
pub use log::{LogSummary, VerifierLog};
