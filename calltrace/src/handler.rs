//! Event handler interface.
//!
//! The embedding application registers one [`EventHandler`]; the dispatcher
//! calls exactly one of its methods per successfully decoded record. Views
//! borrow the record's payload and are only valid for the duration of the
//! callback. Handlers must not call back into the dispatcher or its module
//! map from within a callback; no reentrancy guarantee is provided.
//!
//! Every method defaults to a no-op so handlers only implement the kinds
//! they care about.

use crate::domain::{Pid, Tid};
use crate::records::{
    BatchEnter, DetailedFunctionCall, DynamicSymbol, FunctionEvent, FunctionNameEntry,
    IndexedFrequency, InvocationBatch, ModuleRecord, SampleData, StackTrace,
};
use std::time::SystemTime;

/// Polymorphic sink for decoded trace events, one method per record kind.
#[allow(unused_variables)]
pub trait EventHandler {
    fn on_function_entry(&mut self, time: SystemTime, pid: Pid, tid: Tid, event: &FunctionEvent) {}

    fn on_function_exit(&mut self, time: SystemTime, pid: Pid, tid: Tid, event: &FunctionEvent) {}

    /// `tid` is the thread id carried inside the batch payload, not the one
    /// from the record header.
    fn on_batch_function_entry(
        &mut self,
        time: SystemTime,
        pid: Pid,
        tid: Tid,
        batch: &BatchEnter<'_>,
    ) {
    }

    fn on_invocation_batch(
        &mut self,
        time: SystemTime,
        pid: Pid,
        tid: Tid,
        batch: &InvocationBatch<'_>,
    ) {
    }

    /// Called after the module map has recorded the load.
    fn on_process_attach(
        &mut self,
        time: SystemTime,
        pid: Pid,
        tid: Tid,
        module: &ModuleRecord<'_>,
    ) {
    }

    /// Called before the module map records the unload, so lookups from
    /// within the callback still see the module live.
    fn on_process_detach(
        &mut self,
        time: SystemTime,
        pid: Pid,
        tid: Tid,
        module: &ModuleRecord<'_>,
    ) {
    }

    fn on_thread_attach(
        &mut self,
        time: SystemTime,
        pid: Pid,
        tid: Tid,
        module: &ModuleRecord<'_>,
    ) {
    }

    fn on_thread_detach(
        &mut self,
        time: SystemTime,
        pid: Pid,
        tid: Tid,
        module: &ModuleRecord<'_>,
    ) {
    }

    /// Called before the process's modules are marked dirty.
    fn on_process_ended(&mut self, time: SystemTime, pid: Pid) {}

    fn on_thread_name(&mut self, time: SystemTime, pid: Pid, tid: Tid, name: &str) {}

    fn on_indexed_frequency(
        &mut self,
        time: SystemTime,
        pid: Pid,
        tid: Tid,
        data: &IndexedFrequency<'_>,
    ) {
    }

    fn on_dynamic_symbol(&mut self, pid: Pid, symbol: &DynamicSymbol<'_>) {}

    fn on_sample_data(&mut self, time: SystemTime, pid: Pid, data: &SampleData<'_>) {}

    fn on_function_name_table_entry(
        &mut self,
        time: SystemTime,
        pid: Pid,
        entry: &FunctionNameEntry<'_>,
    ) {
    }

    fn on_stack_trace(&mut self, time: SystemTime, pid: Pid, trace: &StackTrace<'_>) {}

    fn on_detailed_function_call(
        &mut self,
        time: SystemTime,
        pid: Pid,
        tid: Tid,
        call: &DetailedFunctionCall<'_>,
    ) {
    }

    fn on_comment(&mut self, time: SystemTime, pid: Pid, comment: &str) {}

    fn on_process_heap(&mut self, time: SystemTime, pid: Pid, heap: u64) {}
}
