//! Record decoder and dispatcher.
//!
//! [`Dispatcher::dispatch`] consumes one raw record: it checks the protocol
//! class, resolves the kind tag, runs that kind's validation routine, and
//! invokes the matching handler method with a typed view over the payload.
//! Module lifecycle records additionally update the module map around the
//! handler callback.
//!
//! The boolean return answers only "did this record belong to the calltrace
//! protocol" — foreign records propagate `false` so the caller can route
//! them elsewhere. Validation failures for a *recognized* record are a
//! separate signal: they latch the sticky [`Dispatcher::error_occurred`]
//! flag while the call still returns `true` (the record was recognized and
//! consumed, just found unparsable). Callers are expected to check the flag
//! after each call and stop feeding records once it is set; the protocol
//! does not resynchronize mid-stream.

use crate::clock::Clock;
use crate::domain::{ParseError, Pid, Tid};
use crate::handler::EventHandler;
use crate::modules::{ModuleInfo, ModuleMap};
use crate::records::{
    data, BatchEnter, DetailedFunctionCall, DynamicSymbol, FunctionEvent, FunctionNameEntry,
    IndexedFrequency, InvocationBatch, ModuleRecord, RawRecord, RecordKind, SampleData, StackTrace,
};
use log::{error, info};
use std::time::SystemTime;

/// Synchronous, single-threaded record dispatcher.
///
/// Owns the registered handler, the module map it maintains as a side
/// effect of dispatch, and the clock convention used to convert raw header
/// timestamps. Not internally synchronized; callers wanting concurrency
/// must shard by process id with one dispatcher per shard.
#[derive(Debug)]
pub struct Dispatcher<H, C> {
    handler: H,
    modules: ModuleMap,
    clock: C,
    error_occurred: bool,
}

impl<H: EventHandler, C: Clock> Dispatcher<H, C> {
    /// `fail_on_module_conflict` selects the module map's strict conflict
    /// policy for this dispatcher's whole lifetime (see
    /// [`ModuleMap::new`]).
    pub fn new(handler: H, clock: C, fail_on_module_conflict: bool) -> Self {
        Self {
            handler,
            modules: ModuleMap::new(fail_on_module_conflict),
            clock,
            error_occurred: false,
        }
    }

    /// Whether any dispatched record has failed validation. One-way latch;
    /// once set, callers must stop feeding records.
    #[must_use]
    pub fn error_occurred(&self) -> bool {
        self.error_occurred
    }

    /// The module address spaces maintained so far.
    #[must_use]
    pub fn module_map(&self) -> &ModuleMap {
        &self.modules
    }

    /// Module owning `addr` in process `pid` at this point in the stream.
    /// The integration point for downstream symbolization tooling.
    #[must_use]
    pub fn lookup_module(&self, pid: Pid, addr: u64) -> Option<&ModuleInfo> {
        self.modules.lookup(pid, addr)
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Tear the dispatcher down and recover the handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Decode one record and invoke the matching handler method.
    ///
    /// Returns `false` only for records of a foreign protocol class, which
    /// are left entirely untouched. Everything else returns `true`; decode
    /// failures are reported through [`Self::error_occurred`] instead.
    pub fn dispatch(&mut self, record: &RawRecord<'_>) -> bool {
        debug_assert!(!self.error_occurred, "records fed after a fatal decode error");

        if !record.is_trace_class() {
            return false;
        }

        let outcome = match RecordKind::from_tag(record.kind) {
            Some(RecordKind::FunctionEnter) => self.handle_enter_exit(record, true),
            Some(RecordKind::FunctionExit) => self.handle_enter_exit(record, false),
            Some(RecordKind::BatchEnter) => self.handle_batch_enter(record),
            Some(
                kind @ (RecordKind::ProcessAttach
                | RecordKind::ProcessDetach
                | RecordKind::ThreadAttach
                | RecordKind::ThreadDetach),
            ) => self.handle_module_lifecycle(record, kind),
            Some(RecordKind::ProcessEnded) => self.handle_process_ended(record),
            Some(RecordKind::BatchInvocation) => self.handle_batch_invocation(record),
            Some(RecordKind::ThreadName) => self.handle_thread_name(record),
            Some(RecordKind::IndexedFrequency) => self.handle_indexed_frequency(record),
            Some(RecordKind::DynamicSymbol) => self.handle_dynamic_symbol(record),
            Some(RecordKind::SampleData) => self.handle_sample_data(record),
            Some(RecordKind::FunctionNameTableEntry) => self.handle_function_name_entry(record),
            Some(RecordKind::StackTrace) => self.handle_stack_trace(record),
            Some(RecordKind::DetailedFunctionCall) => self.handle_detailed_call(record),
            Some(RecordKind::Comment) => self.handle_comment(record),
            Some(RecordKind::ProcessHeap) => self.handle_process_heap(record),
            Some(RecordKind::ModuleEvent) => {
                // Producers emit these but no parser exists yet; skipping
                // one loses no tracked state, so it stays non-fatal.
                error!("Parsing for module-event records not yet implemented.");
                Ok(())
            }
            None => {
                error!("Unknown record kind 0x{:02x} encountered.", record.kind);
                Ok(())
            }
        };

        if let Err(err) = outcome {
            error!(
                "Failed to parse record kind 0x{:02x} for {}: {err}",
                record.kind,
                Pid(record.process_id)
            );
            self.error_occurred = true;
        }

        true
    }

    fn wall_time(&self, record: &RawRecord<'_>) -> SystemTime {
        self.clock.wall_time(record.raw_timestamp)
    }

    fn handle_enter_exit(
        &mut self,
        record: &RawRecord<'_>,
        is_entry: bool,
    ) -> Result<(), ParseError> {
        let event = FunctionEvent::parse(record.payload)?;
        let time = self.wall_time(record);
        let (pid, tid) = (Pid(record.process_id), Tid(record.thread_id));
        if is_entry {
            self.handler.on_function_entry(time, pid, tid, &event);
        } else {
            self.handler.on_function_exit(time, pid, tid, &event);
        }
        Ok(())
    }

    fn handle_batch_enter(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let batch = BatchEnter::parse(record.payload)?;
        let time = self.wall_time(record);
        // The batch buffer names its own thread; the header's thread id is
        // whichever thread happened to flush the buffer.
        let tid = Tid(batch.thread_id());
        self.handler.on_batch_function_entry(time, Pid(record.process_id), tid, &batch);
        Ok(())
    }

    fn handle_batch_invocation(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let batch = InvocationBatch::parse(record.payload)?;
        let time = self.wall_time(record);
        self.handler.on_invocation_batch(
            time,
            Pid(record.process_id),
            Tid(record.thread_id),
            &batch,
        );
        Ok(())
    }

    fn handle_module_lifecycle(
        &mut self,
        record: &RawRecord<'_>,
        kind: RecordKind,
    ) -> Result<(), ParseError> {
        let module = ModuleRecord::parse(record.payload)?;
        if module.is_incomplete() {
            info!("Encountered incompletely written module record.");
            return Ok(());
        }

        let time = self.wall_time(record);
        let (pid, tid) = (Pid(record.process_id), Tid(record.thread_id));

        match kind {
            RecordKind::ProcessAttach => {
                // Track before notifying, so the handler can already
                // resolve addresses inside the new module.
                if !self.modules.insert(pid, module.to_module_info()) {
                    return Err(ParseError::ModuleConflict {
                        pid,
                        path: module.path.to_string(),
                    });
                }
                self.handler.on_process_attach(time, pid, tid, &module);
            }
            RecordKind::ProcessDetach => {
                // Notify before untracking, so the handler still sees the
                // module live.
                self.handler.on_process_detach(time, pid, tid, &module);
                if !self.modules.remove(pid, &module.to_module_info()) {
                    return Err(ParseError::RangeMismatch {
                        pid,
                        path: module.path.to_string(),
                    });
                }
            }
            RecordKind::ThreadAttach => self.handler.on_thread_attach(time, pid, tid, &module),
            RecordKind::ThreadDetach => self.handler.on_thread_detach(time, pid, tid, &module),
            _ => unreachable!("handle_module_lifecycle called for {kind:?}"),
        }

        Ok(())
    }

    fn handle_process_ended(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let time = self.wall_time(record);
        let pid = Pid(record.process_id);
        self.handler.on_process_ended(time, pid);
        // Unlike everywhere else, an unknown process id is a hard error
        // here: an end record for a process we never saw load anything
        // means the stream itself is inconsistent.
        if !self.modules.remove_process(pid) {
            return Err(ParseError::UnknownProcess(pid));
        }
        Ok(())
    }

    fn handle_thread_name(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let name = data::parse_string_payload(record.payload)?;
        let time = self.wall_time(record);
        self.handler.on_thread_name(time, Pid(record.process_id), Tid(record.thread_id), name);
        Ok(())
    }

    fn handle_indexed_frequency(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let freq = IndexedFrequency::parse(record.payload)?;
        let time = self.wall_time(record);
        self.handler.on_indexed_frequency(
            time,
            Pid(record.process_id),
            Tid(record.thread_id),
            &freq,
        );
        Ok(())
    }

    fn handle_dynamic_symbol(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let symbol = DynamicSymbol::parse(record.payload)?;
        self.handler.on_dynamic_symbol(Pid(record.process_id), &symbol);
        Ok(())
    }

    fn handle_sample_data(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let samples = SampleData::parse(record.payload)?;
        let time = self.wall_time(record);
        self.handler.on_sample_data(time, Pid(record.process_id), &samples);
        Ok(())
    }

    fn handle_function_name_entry(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let entry = FunctionNameEntry::parse(record.payload)?;
        let time = self.wall_time(record);
        self.handler.on_function_name_table_entry(time, Pid(record.process_id), &entry);
        Ok(())
    }

    fn handle_stack_trace(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let trace = StackTrace::parse(record.payload)?;
        let time = self.wall_time(record);
        self.handler.on_stack_trace(time, Pid(record.process_id), &trace);
        Ok(())
    }

    fn handle_detailed_call(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let call = DetailedFunctionCall::parse(record.payload)?;
        let time = self.wall_time(record);
        self.handler.on_detailed_function_call(
            time,
            Pid(record.process_id),
            Tid(record.thread_id),
            &call,
        );
        Ok(())
    }

    fn handle_comment(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let comment = data::parse_string_payload(record.payload)?;
        let time = self.wall_time(record);
        self.handler.on_comment(time, Pid(record.process_id), comment);
        Ok(())
    }

    fn handle_process_heap(&mut self, record: &RawRecord<'_>) -> Result<(), ParseError> {
        let heap = data::parse_process_heap(record.payload)?;
        let time = self.wall_time(record);
        self.handler.on_process_heap(time, Pid(record.process_id), heap);
        Ok(())
    }
}
