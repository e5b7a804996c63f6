//! Errors raised while loading a log.
//!
//! Malformed lines are not errors; they are kept and classified. Only the
//! input source can fail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to read verifier log: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_error_display() {
        let err = LogError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated"));
        assert_eq!(err.to_string(), "failed to read verifier log: truncated");
    }
}
