//! # Shared Wire Format (Capture Agent ↔ Parser)
//!
//! Defines the constants that describe the calltrace record protocol: the
//! protocol class identifier, the record-kind tags, and the fixed-prefix and
//! trailing-entry sizes of every payload layout. The capture agent writes
//! records against these constants; the parser validates against them.
//!
//! All multi-byte payload fields are little-endian. Payloads consist of a
//! fixed prefix (whose size is listed here per kind) optionally followed by a
//! variable part whose length is computed from a count or size field inside
//! the prefix. See the `calltrace` crate for the decoding rules.

#![no_std]

// ============================================================================
// Protocol Identification
// ============================================================================

/// Class identifier carried in every record header.
///
/// Records whose class differs from this constant belong to some other
/// protocol sharing the same transport and must be routed elsewhere; the
/// parser rejects them without inspecting the payload.
pub const TRACE_CLASS_ID: [u8; 16] = [
    0xc4, 0x11, 0x7a, 0xce, 0x5e, 0x55, 0x10, 0x4e, //
    0x92, 0x3b, 0x0f, 0x67, 0xd8, 0x2a, 0x61, 0x40,
];

// ============================================================================
// Record Kind Tags
// ============================================================================

/// Function entry, one call site. Fixed payload: [`ENTER_EXIT_SIZE`].
pub const TAG_FUNCTION_ENTER: u8 = 0x01;

/// Function exit, one call site. Fixed payload: [`ENTER_EXIT_SIZE`].
pub const TAG_FUNCTION_EXIT: u8 = 0x02;

/// Batched function entries flushed from a per-thread buffer.
///
/// Prefix: thread id (u32) + call count (u32), then `count` entries of
/// [`BATCH_CALL_SIZE`] bytes each. The thread id in the prefix, not the one
/// in the record header, identifies the originating thread.
pub const TAG_BATCH_ENTER: u8 = 0x03;

/// Module loaded into a process. Payload: module data (see below).
pub const TAG_PROCESS_ATTACH: u8 = 0x04;

/// Module unloaded from a process. Payload: module data.
pub const TAG_PROCESS_DETACH: u8 = 0x05;

/// Thread saw a module for the first time. Payload: module data.
pub const TAG_THREAD_ATTACH: u8 = 0x06;

/// Thread detached from a module. Payload: module data.
pub const TAG_THREAD_DETACH: u8 = 0x07;

/// Reserved module lifecycle event; producers emit it but no parser
/// implementation exists yet.
pub const TAG_MODULE_EVENT: u8 = 0x08;

/// Batched invocation summaries; the payload is a bare array of
/// [`INVOCATION_INFO_SIZE`]-byte entries with no prefix, so its length must
/// be an exact multiple of the entry size.
pub const TAG_BATCH_INVOCATION: u8 = 0x09;

/// Thread display name. Prefix: name length (u32), then UTF-8 bytes.
pub const TAG_THREAD_NAME: u8 = 0x0a;

/// Indexed frequency/coverage data. Prefix: [`INDEXED_FREQUENCY_PREFIX`],
/// then `frequency_size * num_entries` bytes.
pub const TAG_INDEXED_FREQUENCY: u8 = 0x0b;

/// Process terminated. Empty payload; the header carries the process id.
pub const TAG_PROCESS_ENDED: u8 = 0x0c;

/// Dynamically generated symbol. Prefix: symbol id (u32) + name length
/// (u32), then UTF-8 bytes.
pub const TAG_DYNAMIC_SYMBOL: u8 = 0x0d;

/// Sampling profiler bucket data. Prefix: [`SAMPLE_DATA_PREFIX`], then
/// `bucket_count` u32 buckets.
pub const TAG_SAMPLE_DATA: u8 = 0x0e;

/// Function id → name mapping. Prefix: function id (u32) + name length
/// (u32), then UTF-8 bytes.
pub const TAG_FUNCTION_NAME_TABLE_ENTRY: u8 = 0x0f;

/// Captured stack trace. Prefix: [`STACK_TRACE_PREFIX`], then `num_frames`
/// u64 frame addresses.
pub const TAG_STACK_TRACE: u8 = 0x10;

/// Detailed function call with serialized argument data. Prefix:
/// [`DETAILED_CALL_PREFIX`], then `argument_data_size` raw bytes.
pub const TAG_DETAILED_FUNCTION_CALL: u8 = 0x11;

/// Free-form comment injected into the stream. Prefix: comment length
/// (u32), then UTF-8 bytes.
pub const TAG_COMMENT: u8 = 0x12;

/// Process heap handle snapshot. Fixed payload: [`PROCESS_HEAP_SIZE`].
pub const TAG_PROCESS_HEAP: u8 = 0x13;

// ============================================================================
// Payload Sizes
// ============================================================================

/// Function enter/exit payload: function (u64) + return address (u64).
pub const ENTER_EXIT_SIZE: usize = 16;

/// Batch-enter prefix: thread id (u32) + call count (u32).
pub const BATCH_ENTER_PREFIX: usize = 8;

/// One batched call entry: tick count (u64) + function address (u64).
pub const BATCH_CALL_SIZE: usize = 16;

/// One invocation summary: caller (u64) + function (u64) + call count (u32)
/// + flags (u32) + cycles min/max/sum (u64 each).
pub const INVOCATION_INFO_SIZE: usize = 48;

/// Module data prefix: base (u64) + size (u64) + checksum (u32) +
/// time stamp (u32) + path length (u32). Followed by the UTF-8 path.
pub const MODULE_DATA_PREFIX: usize = 28;

/// Indexed frequency prefix: data type (u32) + frequency entry size (u32) +
/// entry count (u32).
pub const INDEXED_FREQUENCY_PREFIX: usize = 12;

/// Sample data prefix: module base (u64) + module size (u64) + checksum
/// (u32) + time stamp (u32) + bucket size (u32) + bucket start (u64) +
/// bucket count (u32) + sampling start/end/interval (u64 each).
pub const SAMPLE_DATA_PREFIX: usize = 64;

/// One sample bucket (u32).
pub const SAMPLE_BUCKET_SIZE: usize = 4;

/// Stack trace prefix: stack trace id (u64) + frame count (u32) +
/// reserved (u32).
pub const STACK_TRACE_PREFIX: usize = 16;

/// One stack frame address (u64).
pub const STACK_FRAME_SIZE: usize = 8;

/// Detailed call prefix: call timestamp (u64) + stack trace id (u64) +
/// function id (u32) + argument data size (u32).
pub const DETAILED_CALL_PREFIX: usize = 24;

/// Process heap payload: heap handle (u64).
pub const PROCESS_HEAP_SIZE: usize = 8;

// ============================================================================
// Sentinels
// ============================================================================

/// A zero function address in the *last* slot of a batch-enter array marks a
/// record torn mid-write when the producer's ring buffer wrapped. The parser
/// drops that slot instead of failing.
pub const NULL_FUNCTION: u64 = 0;

/// A zero module base address marks an incompletely written module record.
/// The parser treats such records as benign no-ops.
pub const NULL_MODULE_BASE: u64 = 0;
