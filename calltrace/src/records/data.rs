//! Views over data-carrying records: coverage/frequency tables, sampling
//! buckets, stack traces, symbol and name tables, and the small scalar and
//! string payloads.

use super::cursor::{u64_from_le, RecordCursor};
use super::expected_len;
use crate::domain::ParseError;
use calltrace_common as wire;

/// Indexed frequency (coverage) data.
#[derive(Debug, Clone, Copy)]
pub struct IndexedFrequency<'a> {
    /// Producer-defined data type discriminator.
    pub data_type: u32,
    /// Size in bytes of one frequency entry.
    pub frequency_size: u32,
    /// Number of entries in the table.
    pub num_entries: u32,
    /// Raw entry bytes, `frequency_size * num_entries` long. Entry
    /// interpretation is the handler's business.
    pub frequency_data: &'a [u8],
}

impl<'a> IndexedFrequency<'a> {
    /// Decode an indexed-frequency payload.
    ///
    /// # Errors
    /// `ShortRecord` if the prefix is absent, `TruncatedPayload` if the
    /// table is shorter than the prefix fields imply.
    pub fn parse(payload: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = RecordCursor::new(payload);
        let data_type = cursor.read_u32()?;
        let frequency_size = cursor.read_u32()?;
        let num_entries = cursor.read_u32()?;

        let expected = expected_len(
            wire::INDEXED_FREQUENCY_PREFIX,
            num_entries as usize,
            frequency_size as usize,
        );
        if payload.len() < expected {
            return Err(ParseError::TruncatedPayload { expected, actual: payload.len() });
        }
        let frequency_data = &payload[wire::INDEXED_FREQUENCY_PREFIX..expected];

        Ok(Self { data_type, frequency_size, num_entries, frequency_data })
    }
}

/// Sampling profiler bucket data for one module.
#[derive(Debug, Clone, Copy)]
pub struct SampleData<'a> {
    pub module_base: u64,
    pub module_size: u64,
    pub module_checksum: u32,
    pub module_timestamp: u32,
    /// Address span covered by one bucket.
    pub bucket_size: u32,
    /// Address of the first bucket.
    pub bucket_start: u64,
    pub bucket_count: u32,
    pub sampling_start: u64,
    pub sampling_end: u64,
    pub sampling_interval: u64,
    buckets: &'a [u8],
}

impl<'a> SampleData<'a> {
    /// Decode a sample-data payload.
    ///
    /// # Errors
    /// `ShortRecord` if the prefix is absent, `TruncatedPayload` if fewer
    /// buckets follow than the prefix claims.
    pub fn parse(payload: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = RecordCursor::new(payload);
        let module_base = cursor.read_u64()?;
        let module_size = cursor.read_u64()?;
        let module_checksum = cursor.read_u32()?;
        let module_timestamp = cursor.read_u32()?;
        let bucket_size = cursor.read_u32()?;
        let bucket_start = cursor.read_u64()?;
        let bucket_count = cursor.read_u32()?;
        let sampling_start = cursor.read_u64()?;
        let sampling_end = cursor.read_u64()?;
        let sampling_interval = cursor.read_u64()?;

        let expected =
            expected_len(wire::SAMPLE_DATA_PREFIX, bucket_count as usize, wire::SAMPLE_BUCKET_SIZE);
        if payload.len() < expected {
            return Err(ParseError::TruncatedPayload { expected, actual: payload.len() });
        }
        let buckets = &payload[wire::SAMPLE_DATA_PREFIX..expected];

        Ok(Self {
            module_base,
            module_size,
            module_checksum,
            module_timestamp,
            bucket_size,
            bucket_start,
            bucket_count,
            sampling_start,
            sampling_end,
            sampling_interval,
            buckets,
        })
    }

    /// Iterate the sample counts per bucket.
    pub fn buckets(&self) -> impl Iterator<Item = u32> + 'a {
        self.buckets
            .chunks_exact(wire::SAMPLE_BUCKET_SIZE)
            .map(super::cursor::u32_from_le)
    }
}

/// A captured stack trace.
#[derive(Debug, Clone, Copy)]
pub struct StackTrace<'a> {
    /// Identifier other records use to refer to this trace.
    pub stack_trace_id: u64,
    frames: &'a [u8],
}

impl<'a> StackTrace<'a> {
    /// Decode a stack-trace payload.
    ///
    /// # Errors
    /// `ShortRecord` if the prefix is absent, `TruncatedPayload` if fewer
    /// frames follow than the prefix claims.
    pub fn parse(payload: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = RecordCursor::new(payload);
        let stack_trace_id = cursor.read_u64()?;
        let num_frames = cursor.read_u32()?;
        let _reserved = cursor.read_u32()?;

        let expected =
            expected_len(wire::STACK_TRACE_PREFIX, num_frames as usize, wire::STACK_FRAME_SIZE);
        if payload.len() < expected {
            return Err(ParseError::TruncatedPayload { expected, actual: payload.len() });
        }
        let frames = &payload[wire::STACK_TRACE_PREFIX..expected];

        Ok(Self { stack_trace_id, frames })
    }

    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.frames.len() / wire::STACK_FRAME_SIZE
    }

    /// Iterate the frame return addresses, outermost last.
    pub fn frames(&self) -> impl Iterator<Item = u64> + 'a {
        self.frames.chunks_exact(wire::STACK_FRAME_SIZE).map(u64_from_le)
    }
}

/// A function id → name table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionNameEntry<'a> {
    pub function_id: u32,
    pub name: &'a str,
}

impl<'a> FunctionNameEntry<'a> {
    /// Decode a function-name-table-entry payload.
    ///
    /// # Errors
    /// `ShortRecord` if the prefix or name bytes are absent, `BadString`
    /// for invalid UTF-8.
    pub fn parse(payload: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = RecordCursor::new(payload);
        let function_id = cursor.read_u32()?;
        let name_len = cursor.read_u32()? as usize;
        let name = read_delimited_str(&mut cursor, payload.len(), 8, name_len)?;
        Ok(Self { function_id, name })
    }
}

/// A dynamically generated symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicSymbol<'a> {
    pub symbol_id: u32,
    pub name: &'a str,
}

impl<'a> DynamicSymbol<'a> {
    /// Decode a dynamic-symbol payload.
    ///
    /// # Errors
    /// `ShortRecord` if the prefix or name bytes are absent, `BadString`
    /// for invalid UTF-8.
    pub fn parse(payload: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = RecordCursor::new(payload);
        let symbol_id = cursor.read_u32()?;
        let name_len = cursor.read_u32()? as usize;
        let name = read_delimited_str(&mut cursor, payload.len(), 8, name_len)?;
        Ok(Self { symbol_id, name })
    }
}

/// Decode a bare length-delimited string payload (thread names, comments).
///
/// # Errors
/// `ShortRecord` if the length field is absent, `TruncatedPayload` if the
/// string bytes are, `BadString` for invalid UTF-8.
pub fn parse_string_payload(payload: &[u8]) -> Result<&str, ParseError> {
    let mut cursor = RecordCursor::new(payload);
    let len = cursor.read_u32()? as usize;
    read_delimited_str(&mut cursor, payload.len(), 4, len)
}

/// Decode a process-heap payload into the heap handle it carries.
///
/// # Errors
/// `ShortRecord` if the payload is smaller than the fixed layout.
pub fn parse_process_heap(payload: &[u8]) -> Result<u64, ParseError> {
    RecordCursor::new(payload).read_u64()
}

/// Read a string whose length field has already been consumed, mapping the
/// cursor's short-read into `TruncatedPayload`: the fixed prefix was
/// present, it is the declared variable part that the buffer cannot hold.
fn read_delimited_str<'a>(
    cursor: &mut RecordCursor<'a>,
    payload_len: usize,
    prefix: usize,
    len: usize,
) -> Result<&'a str, ParseError> {
    let expected = expected_len(prefix, len, 1);
    if payload_len < expected {
        return Err(ParseError::TruncatedPayload { expected, actual: payload_len });
    }
    cursor.read_str(len)
}
