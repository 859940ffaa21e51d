//! Structured error types for calltrace
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! A [`ParseError`] describes why one recognized record failed validation or
//! why the module tracker rejected an update. Two conditions are deliberately
//! *not* errors: a foreign record class (signalled by `dispatch` returning
//! `false`) and an unknown or not-yet-implemented record kind (logged and
//! skipped without touching the sticky error latch).

use super::types::Pid;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    /// The payload ends before the kind's fixed prefix does.
    #[error("Short record: need {needed} bytes, have {available}")]
    ShortRecord { needed: usize, available: usize },

    /// The variable part is shorter than the length computed from the
    /// count/size field in the fixed prefix.
    #[error("Truncated payload: expected {expected} bytes, record has {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    /// An invocation batch payload is not a whole number of entries.
    #[error("Invocation batch length {0} is not a multiple of the entry size")]
    MisalignedBatch(usize),

    /// A length-delimited string field holds invalid UTF-8.
    #[error("String field is not valid UTF-8")]
    BadString(#[from] std::str::Utf8Error),

    /// A process-ended record named a process the tracker has never seen.
    #[error("Process {0} was never observed")]
    UnknownProcess(Pid),

    /// A module load overlapped a live module with different identity, and
    /// the tracker is configured to treat conflicts as fatal.
    #[error("Conflicting module info for {pid}: {path}")]
    ModuleConflict { pid: Pid, path: String },

    /// A module unload overlapped an entry whose range does not match, and
    /// the tracker is configured to treat conflicts as fatal.
    #[error("Module unload for {pid} with mismatching range: {path}")]
    RangeMismatch { pid: Pid, path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_record_display() {
        let err = ParseError::ShortRecord { needed: 16, available: 3 };
        assert_eq!(err.to_string(), "Short record: need 16 bytes, have 3");
    }

    #[test]
    fn test_unknown_process_display() {
        let err = ParseError::UnknownProcess(Pid(1234));
        assert_eq!(err.to_string(), "Process PID:1234 was never observed");
    }

    #[test]
    fn test_module_conflict_display() {
        let err = ParseError::ModuleConflict {
            pid: Pid(7),
            path: "/usr/lib/libfoo.so".to_string(),
        };
        assert!(err.to_string().contains("PID:7"));
        assert!(err.to_string().contains("libfoo.so"));
    }
}
