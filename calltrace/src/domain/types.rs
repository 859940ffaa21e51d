//! Newtype wrappers for process and thread identifiers.
//!
//! Raw `u32` ids are easy to transpose in call sites that take both a
//! process id and a thread id; the wrappers make the signatures
//! self-documenting and give log messages a consistent rendering.

use std::fmt;

/// Process identifier from a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

/// Thread identifier, either from a record header or carried inside a
/// batch-enter payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(raw: u32) -> Self {
        Pid(raw)
    }
}

impl From<u32> for Tid {
    fn from(raw: u32) -> Self {
        Tid(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        assert_eq!(Pid(1234).to_string(), "PID:1234");
        assert_eq!(Tid(42).to_string(), "TID:42");
    }

    #[test]
    fn test_pid_and_tid_are_distinct_types() {
        // Same raw value, different meaning; they must never compare equal
        // by accident because they cannot be compared at all.
        let pid = Pid(7);
        let tid = Tid(7);
        assert_eq!(pid.0, tid.0);
    }
}
