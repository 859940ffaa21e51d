//! Views over function-call records: single enter/exit, batched entries,
//! batched invocation summaries, and detailed calls with argument data.

use super::cursor::{u64_from_le, RecordCursor};
use super::expected_len;
use crate::domain::ParseError;
use calltrace_common as wire;

/// A single function entry or exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionEvent {
    /// Address of the instrumented function.
    pub function: u64,
    /// Return address of the call site.
    pub return_address: u64,
}

impl FunctionEvent {
    /// Decode an enter/exit payload.
    ///
    /// # Errors
    /// `ShortRecord` if the payload is smaller than the fixed layout.
    pub fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        let mut cursor = RecordCursor::new(payload);
        Ok(Self {
            function: cursor.read_u64()?,
            return_address: cursor.read_u64()?,
        })
    }
}

/// One entry in a batch-enter trailing array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCall {
    /// Producer tick count at entry time.
    pub tick: u64,
    /// Address of the entered function.
    pub function: u64,
}

/// Batched function entries flushed from one thread's buffer.
#[derive(Debug, Clone, Copy)]
pub struct BatchEnter<'a> {
    thread_id: u32,
    num_calls: usize,
    calls: &'a [u8],
}

impl<'a> BatchEnter<'a> {
    /// Decode a batch-enter payload.
    ///
    /// If the last slot carries the null-function sentinel the reported
    /// count is decremented by one: the producer was interrupted mid-write
    /// when its ring buffer wrapped, which is expected rather than an error.
    ///
    /// # Errors
    /// `ShortRecord` if the prefix is absent, `TruncatedPayload` if the
    /// trailing array is shorter than the count in the prefix implies.
    pub fn parse(payload: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = RecordCursor::new(payload);
        let thread_id = cursor.read_u32()?;
        let declared = cursor.read_u32()? as usize;

        let expected = expected_len(wire::BATCH_ENTER_PREFIX, declared, wire::BATCH_CALL_SIZE);
        if payload.len() < expected {
            return Err(ParseError::TruncatedPayload { expected, actual: payload.len() });
        }
        let calls = &payload[wire::BATCH_ENTER_PREFIX..expected];

        let mut num_calls = declared;
        if num_calls > 0 {
            let last = &calls[(num_calls - 1) * wire::BATCH_CALL_SIZE..];
            if u64_from_le(&last[8..16]) == wire::NULL_FUNCTION {
                num_calls -= 1;
            }
        }

        Ok(Self { thread_id, num_calls, calls })
    }

    /// Thread the batch was recorded on; authoritative over the record
    /// header's thread id for this kind.
    #[must_use]
    pub fn thread_id(&self) -> u32 {
        self.thread_id
    }

    /// Number of usable entries, after torn-write trimming.
    #[must_use]
    pub fn len(&self) -> usize {
        self.num_calls
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_calls == 0
    }

    /// Iterate the batched calls in recorded order.
    pub fn calls(&self) -> impl Iterator<Item = BatchCall> + 'a {
        self.calls
            .chunks_exact(wire::BATCH_CALL_SIZE)
            .take(self.num_calls)
            .map(|entry| BatchCall {
                tick: u64_from_le(&entry[0..8]),
                function: u64_from_le(&entry[8..16]),
            })
    }
}

/// One invocation summary in a batch-invocation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationInfo {
    pub caller: u64,
    pub function: u64,
    pub num_calls: u32,
    pub flags: u32,
    pub cycles_min: u64,
    pub cycles_max: u64,
    pub cycles_sum: u64,
}

/// Batched invocation summaries; a bare array with no prefix.
#[derive(Debug, Clone, Copy)]
pub struct InvocationBatch<'a> {
    entries: &'a [u8],
}

impl<'a> InvocationBatch<'a> {
    /// Decode a batch-invocation payload.
    ///
    /// # Errors
    /// `MisalignedBatch` if the payload length is not a whole number of
    /// entries.
    pub fn parse(payload: &'a [u8]) -> Result<Self, ParseError> {
        if payload.len() % wire::INVOCATION_INFO_SIZE != 0 {
            return Err(ParseError::MisalignedBatch(payload.len()));
        }
        Ok(Self { entries: payload })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() / wire::INVOCATION_INFO_SIZE
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the invocation summaries in recorded order.
    pub fn invocations(&self) -> impl Iterator<Item = InvocationInfo> + 'a {
        self.entries.chunks_exact(wire::INVOCATION_INFO_SIZE).map(|entry| InvocationInfo {
            caller: u64_from_le(&entry[0..8]),
            function: u64_from_le(&entry[8..16]),
            num_calls: super::cursor::u32_from_le(&entry[16..20]),
            flags: super::cursor::u32_from_le(&entry[20..24]),
            cycles_min: u64_from_le(&entry[24..32]),
            cycles_max: u64_from_le(&entry[32..40]),
            cycles_sum: u64_from_le(&entry[40..48]),
        })
    }
}

/// A detailed function call carrying serialized argument data.
#[derive(Debug, Clone, Copy)]
pub struct DetailedFunctionCall<'a> {
    /// Producer-side call timestamp, distinct from the record header's.
    pub timestamp: u64,
    /// Identifier of the stack trace captured at the call site.
    pub stack_trace_id: u64,
    /// Function id, resolvable through function-name-table records.
    pub function_id: u32,
    /// Opaque serialized argument bytes; the parser validates the size
    /// only, interpretation is the handler's business.
    pub argument_data: &'a [u8],
}

impl<'a> DetailedFunctionCall<'a> {
    /// Decode a detailed-function-call payload.
    ///
    /// # Errors
    /// `ShortRecord` if the prefix is absent, `TruncatedPayload` if the
    /// argument blob is shorter than the size field claims.
    pub fn parse(payload: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = RecordCursor::new(payload);
        let timestamp = cursor.read_u64()?;
        let stack_trace_id = cursor.read_u64()?;
        let function_id = cursor.read_u32()?;
        let argument_data_size = cursor.read_u32()? as usize;

        let expected = expected_len(wire::DETAILED_CALL_PREFIX, argument_data_size, 1);
        if payload.len() < expected {
            return Err(ParseError::TruncatedPayload { expected, actual: payload.len() });
        }
        let argument_data = &payload[wire::DETAILED_CALL_PREFIX..expected];

        Ok(Self { timestamp, stack_trace_id, function_id, argument_data })
    }
}
