//! # calltrace - Trace Record Decoding Engine and Module Tracker
//!
//! calltrace turns a stream of opaque, variable-length binary trace records
//! (function entry/exit, batched calls, module load/unload, stack traces,
//! coverage data) into validated, strongly-typed events delivered to a
//! registered handler. As a side effect of dispatch it maintains a
//! per-process model of which binary modules occupy which virtual-address
//! ranges, so later analysis can map an address back to the module that
//! owned it at the time.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Capture Session                       │
//! │        (producer of raw record buffers, external)       │
//! └───────────────────────┬─────────────────────────────────┘
//!                         │ one RawRecord per dispatch call
//!                         ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                 calltrace (This Crate)                  │
//! │                                                         │
//! │  ┌──────────────┐  validate   ┌──────────────┐          │
//! │  │  Dispatcher  │────────────▶│ Typed Views  │          │
//! │  │  (dispatch)  │             │  (records)   │          │
//! │  └──────┬───────┘             └──────┬───────┘          │
//! │         │ module lifecycle          │ callbacks        │
//! │         ▼                            ▼                  │
//! │  ┌──────────────┐             ┌──────────────┐          │
//! │  │  ModuleMap   │             │ EventHandler │          │
//! │  │  (modules)   │             │ (application)│          │
//! │  └──────────────┘             └──────────────┘          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`dispatch`]: the decoder/dispatcher; one validation routine per
//!   record kind, sticky error latch, foreign-class routing
//! - [`records`]: raw record framing, the bounds-checked cursor, and the
//!   zero-copy per-kind payload views
//! - [`modules`]: the per-process module address-space tracker with
//!   dirty/lazy-eviction conflict handling
//! - [`handler`]: the [`EventHandler`] callback trait applications implement
//! - [`clock`]: conversion of raw header ticks to wall-clock time
//! - [`domain`]: core domain types (`Pid`, `Tid`) and structured errors
//!
//! ## Typical Usage
//!
//! ```
//! use calltrace::{Dispatcher, EventHandler, Pid, RawRecord, TickClock, Tid};
//! use std::time::SystemTime;
//!
//! #[derive(Default)]
//! struct Counter {
//!     entries: usize,
//! }
//!
//! impl EventHandler for Counter {
//!     fn on_function_entry(
//!         &mut self,
//!         _time: SystemTime,
//!         _pid: Pid,
//!         _tid: Tid,
//!         _event: &calltrace::records::FunctionEvent,
//!     ) {
//!         self.entries += 1;
//!     }
//! }
//!
//! let mut dispatcher = Dispatcher::new(Counter::default(), TickClock::default(), false);
//!
//! let mut payload = Vec::new();
//! payload.extend_from_slice(&0x4010_u64.to_le_bytes());
//! payload.extend_from_slice(&0x4920_u64.to_le_bytes());
//! let record = RawRecord {
//!     class: calltrace_common::TRACE_CLASS_ID,
//!     kind: calltrace_common::TAG_FUNCTION_ENTER,
//!     process_id: 100,
//!     thread_id: 101,
//!     raw_timestamp: 0,
//!     payload: &payload,
//! };
//!
//! assert!(dispatcher.dispatch(&record));
//! assert!(!dispatcher.error_occurred());
//! assert_eq!(dispatcher.handler().entries, 1);
//! ```
//!
//! ## Error Model
//!
//! Two distinct signals, deliberately not collapsed into one result type:
//! the boolean return of [`Dispatcher::dispatch`] says whether the record
//! belonged to this protocol at all (foreign records propagate `false` for
//! routing), while the sticky [`Dispatcher::error_occurred`] latch says
//! whether any recognized record failed validation. Malformed input is
//! always rejected without panicking or reading out of bounds.

pub mod clock;
pub mod dispatch;
pub mod domain;
pub mod handler;
pub mod modules;
pub mod records;

// Re-export the surface most embedders need
pub use clock::{Clock, TickClock};
pub use dispatch::Dispatcher;
pub use domain::{ParseError, Pid, Tid};
pub use handler::EventHandler;
pub use modules::{Liveness, ModuleInfo, ModuleMap, ModuleSpace};
pub use records::{RawRecord, RecordKind};
