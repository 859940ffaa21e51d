//! Record model: raw framed input and per-kind typed views.
//!
//! A [`RawRecord`] is one opaque framed unit handed in by the capture
//! session: header metadata plus a borrowed payload. The dispatcher resolves
//! the header's kind tag to a [`RecordKind`] and runs that kind's decode
//! routine, producing a zero-copy view over the same payload bytes. Views
//! only expose fields their `parse` routine has proven are in bounds, and
//! they never outlive the record they were sliced from.
//!
//! Decode routines follow one discipline for every kind:
//! 1. read the fixed prefix, failing with `ShortRecord` if it is absent;
//! 2. compute the expected total length from the count/size field in the
//!    prefix and fail with `TruncatedPayload` if the physical payload is
//!    shorter — the count is never trusted beyond this check;
//! 3. slice the variable part out of the validated region.

pub mod call;
pub mod cursor;
pub mod data;
pub mod module;

pub use call::{BatchCall, BatchEnter, DetailedFunctionCall, FunctionEvent, InvocationBatch, InvocationInfo};
pub use cursor::RecordCursor;
pub use data::{DynamicSymbol, FunctionNameEntry, IndexedFrequency, SampleData, StackTrace};
pub use module::ModuleRecord;

use calltrace_common as wire;

/// One framed unit from the input trace stream.
///
/// Not owned by the parser; the payload is only valid for the duration of a
/// single dispatch call.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    /// Protocol class identifier; anything other than
    /// [`wire::TRACE_CLASS_ID`] is foreign.
    pub class: [u8; 16],
    /// Raw kind tag (see the `TAG_*` constants in `calltrace-common`).
    pub kind: u8,
    /// Process the record was captured in.
    pub process_id: u32,
    /// Thread the record was captured on.
    pub thread_id: u32,
    /// Opaque monotonic clock value; converted to wall time by the
    /// dispatcher's clock convention.
    pub raw_timestamp: u64,
    /// Payload bytes, excluding all header metadata.
    pub payload: &'a [u8],
}

impl RawRecord<'_> {
    /// Whether the record belongs to the calltrace protocol at all.
    #[must_use]
    pub fn is_trace_class(&self) -> bool {
        self.class == wire::TRACE_CLASS_ID
    }
}

/// The closed set of record kinds this protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    FunctionEnter,
    FunctionExit,
    BatchEnter,
    ProcessAttach,
    ProcessDetach,
    ThreadAttach,
    ThreadDetach,
    ModuleEvent,
    BatchInvocation,
    ThreadName,
    IndexedFrequency,
    ProcessEnded,
    DynamicSymbol,
    SampleData,
    FunctionNameTableEntry,
    StackTrace,
    DetailedFunctionCall,
    Comment,
    ProcessHeap,
}

/// Expected total payload length for a `prefix` followed by `count` entries
/// of `entry_size` bytes each. Saturates instead of overflowing, so a
/// hostile count field on a 32-bit target fails the bounds check rather
/// than the arithmetic.
pub(crate) fn expected_len(prefix: usize, count: usize, entry_size: usize) -> usize {
    count
        .checked_mul(entry_size)
        .and_then(|bytes| bytes.checked_add(prefix))
        .unwrap_or(usize::MAX)
}

impl RecordKind {
    /// Resolve a raw header tag, or `None` for tags this protocol does not
    /// define (reported by the dispatcher, never fatal).
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            wire::TAG_FUNCTION_ENTER => Some(Self::FunctionEnter),
            wire::TAG_FUNCTION_EXIT => Some(Self::FunctionExit),
            wire::TAG_BATCH_ENTER => Some(Self::BatchEnter),
            wire::TAG_PROCESS_ATTACH => Some(Self::ProcessAttach),
            wire::TAG_PROCESS_DETACH => Some(Self::ProcessDetach),
            wire::TAG_THREAD_ATTACH => Some(Self::ThreadAttach),
            wire::TAG_THREAD_DETACH => Some(Self::ThreadDetach),
            wire::TAG_MODULE_EVENT => Some(Self::ModuleEvent),
            wire::TAG_BATCH_INVOCATION => Some(Self::BatchInvocation),
            wire::TAG_THREAD_NAME => Some(Self::ThreadName),
            wire::TAG_INDEXED_FREQUENCY => Some(Self::IndexedFrequency),
            wire::TAG_PROCESS_ENDED => Some(Self::ProcessEnded),
            wire::TAG_DYNAMIC_SYMBOL => Some(Self::DynamicSymbol),
            wire::TAG_SAMPLE_DATA => Some(Self::SampleData),
            wire::TAG_FUNCTION_NAME_TABLE_ENTRY => Some(Self::FunctionNameTableEntry),
            wire::TAG_STACK_TRACE => Some(Self::StackTrace),
            wire::TAG_DETAILED_FUNCTION_CALL => Some(Self::DetailedFunctionCall),
            wire::TAG_COMMENT => Some(Self::Comment),
            wire::TAG_PROCESS_HEAP => Some(Self::ProcessHeap),
            _ => None,
        }
    }
}
