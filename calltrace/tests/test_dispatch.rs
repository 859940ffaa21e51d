//! End-to-end dispatch tests: framing, per-kind validation, handler
//! routing, and the module-map side effects of lifecycle records.

use calltrace::records::{
    BatchEnter, DetailedFunctionCall, DynamicSymbol, FunctionEvent, FunctionNameEntry,
    IndexedFrequency, InvocationBatch, ModuleRecord, SampleData, StackTrace,
};
use calltrace::{Dispatcher, EventHandler, Liveness, Pid, RawRecord, TickClock, Tid};
use calltrace_common as wire;
use std::time::SystemTime;

/// Handler that records which callbacks fired, in order.
#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
}

impl EventHandler for Recorder {
    fn on_function_entry(&mut self, _t: SystemTime, pid: Pid, tid: Tid, event: &FunctionEvent) {
        self.calls.push(format!("entry {pid} {tid} fn=0x{:x}", event.function));
    }

    fn on_function_exit(&mut self, _t: SystemTime, pid: Pid, tid: Tid, event: &FunctionEvent) {
        self.calls.push(format!("exit {pid} {tid} fn=0x{:x}", event.function));
    }

    fn on_batch_function_entry(
        &mut self,
        _t: SystemTime,
        pid: Pid,
        tid: Tid,
        batch: &BatchEnter<'_>,
    ) {
        self.calls.push(format!("batch {pid} {tid} count={}", batch.len()));
    }

    fn on_invocation_batch(
        &mut self,
        _t: SystemTime,
        pid: Pid,
        _tid: Tid,
        batch: &InvocationBatch<'_>,
    ) {
        self.calls.push(format!("invocations {pid} count={}", batch.len()));
    }

    fn on_process_attach(&mut self, _t: SystemTime, pid: Pid, _tid: Tid, m: &ModuleRecord<'_>) {
        self.calls.push(format!("attach {pid} {}", m.path));
    }

    fn on_process_detach(&mut self, _t: SystemTime, pid: Pid, _tid: Tid, m: &ModuleRecord<'_>) {
        self.calls.push(format!("detach {pid} {}", m.path));
    }

    fn on_thread_attach(&mut self, _t: SystemTime, pid: Pid, tid: Tid, m: &ModuleRecord<'_>) {
        self.calls.push(format!("thread-attach {pid} {tid} {}", m.path));
    }

    fn on_thread_detach(&mut self, _t: SystemTime, pid: Pid, tid: Tid, m: &ModuleRecord<'_>) {
        self.calls.push(format!("thread-detach {pid} {tid} {}", m.path));
    }

    fn on_process_ended(&mut self, _t: SystemTime, pid: Pid) {
        self.calls.push(format!("ended {pid}"));
    }

    fn on_thread_name(&mut self, _t: SystemTime, pid: Pid, tid: Tid, name: &str) {
        self.calls.push(format!("thread-name {pid} {tid} {name}"));
    }

    fn on_indexed_frequency(
        &mut self,
        _t: SystemTime,
        pid: Pid,
        _tid: Tid,
        data: &IndexedFrequency<'_>,
    ) {
        self.calls.push(format!("frequency {pid} entries={}", data.num_entries));
    }

    fn on_dynamic_symbol(&mut self, pid: Pid, symbol: &DynamicSymbol<'_>) {
        self.calls.push(format!("symbol {pid} {}={}", symbol.symbol_id, symbol.name));
    }

    fn on_sample_data(&mut self, _t: SystemTime, pid: Pid, data: &SampleData<'_>) {
        self.calls.push(format!("samples {pid} buckets={}", data.bucket_count));
    }

    fn on_function_name_table_entry(
        &mut self,
        _t: SystemTime,
        pid: Pid,
        entry: &FunctionNameEntry<'_>,
    ) {
        self.calls.push(format!("fn-name {pid} {}={}", entry.function_id, entry.name));
    }

    fn on_stack_trace(&mut self, _t: SystemTime, pid: Pid, trace: &StackTrace<'_>) {
        self.calls.push(format!("stack {pid} frames={}", trace.num_frames()));
    }

    fn on_detailed_function_call(
        &mut self,
        _t: SystemTime,
        pid: Pid,
        _tid: Tid,
        call: &DetailedFunctionCall<'_>,
    ) {
        self.calls.push(format!("detailed {pid} args={}", call.argument_data.len()));
    }

    fn on_comment(&mut self, _t: SystemTime, pid: Pid, comment: &str) {
        self.calls.push(format!("comment {pid} {comment}"));
    }

    fn on_process_heap(&mut self, _t: SystemTime, pid: Pid, heap: u64) {
        self.calls.push(format!("heap {pid} 0x{heap:x}"));
    }
}

fn dispatcher(fail_on_conflict: bool) -> Dispatcher<Recorder, TickClock> {
    Dispatcher::new(Recorder::default(), TickClock::default(), fail_on_conflict)
}

fn record<'a>(kind: u8, pid: u32, tid: u32, payload: &'a [u8]) -> RawRecord<'a> {
    RawRecord {
        class: wire::TRACE_CLASS_ID,
        kind,
        process_id: pid,
        thread_id: tid,
        raw_timestamp: 1_000,
        payload,
    }
}

// Payload builders

fn enter_exit_payload(function: u64) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&function.to_le_bytes());
    p.extend_from_slice(&0x9000_u64.to_le_bytes());
    p
}

fn batch_payload(tid: u32, functions: &[u64]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&tid.to_le_bytes());
    p.extend_from_slice(&u32::try_from(functions.len()).unwrap().to_le_bytes());
    for f in functions {
        p.extend_from_slice(&7u64.to_le_bytes());
        p.extend_from_slice(&f.to_le_bytes());
    }
    p
}

fn module_payload(base: u64, size: u64, path: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&base.to_le_bytes());
    p.extend_from_slice(&size.to_le_bytes());
    p.extend_from_slice(&0xc5c5_u32.to_le_bytes());
    p.extend_from_slice(&0x6060_u32.to_le_bytes());
    p.extend_from_slice(&u32::try_from(path.len()).unwrap().to_le_bytes());
    p.extend_from_slice(path.as_bytes());
    p
}

fn string_payload(s: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&u32::try_from(s.len()).unwrap().to_le_bytes());
    p.extend_from_slice(s.as_bytes());
    p
}

fn id_string_payload(id: u32, s: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&id.to_le_bytes());
    p.extend_from_slice(&u32::try_from(s.len()).unwrap().to_le_bytes());
    p.extend_from_slice(s.as_bytes());
    p
}

fn frequency_payload(entries: u32, entry_size: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&1u32.to_le_bytes());
    p.extend_from_slice(&entry_size.to_le_bytes());
    p.extend_from_slice(&entries.to_le_bytes());
    p.extend_from_slice(&vec![0u8; (entry_size * entries) as usize]);
    p
}

fn sample_payload(buckets: &[u32]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&0x40_0000_u64.to_le_bytes());
    p.extend_from_slice(&0x1_0000_u64.to_le_bytes());
    p.extend_from_slice(&1u32.to_le_bytes());
    p.extend_from_slice(&2u32.to_le_bytes());
    p.extend_from_slice(&4u32.to_le_bytes());
    p.extend_from_slice(&0x40_0000_u64.to_le_bytes());
    p.extend_from_slice(&u32::try_from(buckets.len()).unwrap().to_le_bytes());
    p.extend_from_slice(&10u64.to_le_bytes());
    p.extend_from_slice(&20u64.to_le_bytes());
    p.extend_from_slice(&1u64.to_le_bytes());
    for b in buckets {
        p.extend_from_slice(&b.to_le_bytes());
    }
    p
}

fn stack_payload(frames: &[u64]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&0xbeef_u64.to_le_bytes());
    p.extend_from_slice(&u32::try_from(frames.len()).unwrap().to_le_bytes());
    p.extend_from_slice(&0u32.to_le_bytes());
    for f in frames {
        p.extend_from_slice(&f.to_le_bytes());
    }
    p
}

fn detailed_payload(args: &[u8]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&5u64.to_le_bytes());
    p.extend_from_slice(&6u64.to_le_bytes());
    p.extend_from_slice(&7u32.to_le_bytes());
    p.extend_from_slice(&u32::try_from(args.len()).unwrap().to_le_bytes());
    p.extend_from_slice(args);
    p
}

#[test]
fn test_foreign_class_is_rejected_untouched() {
    let mut d = dispatcher(false);
    let payload = module_payload(0x1000, 0x100, "lib.so");
    let mut rec = record(wire::TAG_PROCESS_ATTACH, 1, 2, &payload);
    rec.class = [0u8; 16];

    assert!(!d.dispatch(&rec));
    assert!(!d.error_occurred());
    assert!(d.handler().calls.is_empty());
    assert!(d.lookup_module(Pid(1), 0x1000).is_none());
}

#[test]
fn test_each_kind_routes_to_its_handler_method() {
    let mut d = dispatcher(false);
    let pid = 50;

    let module = module_payload(0x1000, 0x100, "app.so");
    let cases: Vec<(u8, Vec<u8>)> = vec![
        (wire::TAG_PROCESS_ATTACH, module.clone()),
        (wire::TAG_FUNCTION_ENTER, enter_exit_payload(0x1010)),
        (wire::TAG_FUNCTION_EXIT, enter_exit_payload(0x1010)),
        (wire::TAG_BATCH_ENTER, batch_payload(77, &[0x1020, 0x1030])),
        (wire::TAG_BATCH_INVOCATION, vec![0u8; 96]),
        (wire::TAG_THREAD_NAME, string_payload("worker-1")),
        (wire::TAG_INDEXED_FREQUENCY, frequency_payload(3, 4)),
        (wire::TAG_DYNAMIC_SYMBOL, id_string_payload(8, "jit_fn")),
        (wire::TAG_SAMPLE_DATA, sample_payload(&[1, 2, 3])),
        (wire::TAG_FUNCTION_NAME_TABLE_ENTRY, id_string_payload(9, "main")),
        (wire::TAG_STACK_TRACE, stack_payload(&[0x1040, 0x1050])),
        (wire::TAG_DETAILED_FUNCTION_CALL, detailed_payload(b"xy")),
        (wire::TAG_COMMENT, string_payload("checkpoint")),
        (wire::TAG_PROCESS_HEAP, 0xdd00_u64.to_le_bytes().to_vec()),
        (wire::TAG_THREAD_ATTACH, module.clone()),
        (wire::TAG_THREAD_DETACH, module.clone()),
        (wire::TAG_PROCESS_DETACH, module.clone()),
        (wire::TAG_PROCESS_ENDED, Vec::new()),
    ];

    for (kind, payload) in &cases {
        assert!(d.dispatch(&record(*kind, pid, 60, payload)), "kind 0x{kind:02x}");
        assert!(!d.error_occurred(), "kind 0x{kind:02x}");
    }

    let calls = &d.handler().calls;
    assert_eq!(calls.len(), cases.len());
    assert_eq!(calls[0], "attach PID:50 app.so");
    assert_eq!(calls[1], "entry PID:50 TID:60 fn=0x1010");
    assert_eq!(calls[2], "exit PID:50 TID:60 fn=0x1010");
    // Batch entries report the payload-carried thread id, not the header's.
    assert_eq!(calls[3], "batch PID:50 TID:77 count=2");
    assert_eq!(calls[4], "invocations PID:50 count=2");
    assert_eq!(calls[5], "thread-name PID:50 TID:60 worker-1");
    assert_eq!(calls[6], "frequency PID:50 entries=3");
    assert_eq!(calls[7], "symbol PID:50 8=jit_fn");
    assert_eq!(calls[8], "samples PID:50 buckets=3");
    assert_eq!(calls[9], "fn-name PID:50 9=main");
    assert_eq!(calls[10], "stack PID:50 frames=2");
    assert_eq!(calls[11], "detailed PID:50 args=2");
    assert_eq!(calls[12], "comment PID:50 checkpoint");
    assert_eq!(calls[13], "heap PID:50 0xdd00");
    assert_eq!(calls[14], "thread-attach PID:50 TID:60 app.so");
    assert_eq!(calls[15], "thread-detach PID:50 TID:60 app.so");
    assert_eq!(calls[16], "detach PID:50 app.so");
    assert_eq!(calls[17], "ended PID:50");
}

#[test]
fn test_one_byte_short_always_fails_validation() {
    let cases: Vec<(u8, Vec<u8>)> = vec![
        (wire::TAG_FUNCTION_ENTER, enter_exit_payload(0x1000)),
        (wire::TAG_FUNCTION_EXIT, enter_exit_payload(0x1000)),
        (wire::TAG_BATCH_ENTER, batch_payload(1, &[0x10, 0x20])),
        (wire::TAG_PROCESS_ATTACH, module_payload(0x1000, 0x100, "m.so")),
        (wire::TAG_PROCESS_DETACH, module_payload(0x1000, 0x100, "m.so")),
        (wire::TAG_THREAD_ATTACH, module_payload(0x1000, 0x100, "m.so")),
        (wire::TAG_THREAD_DETACH, module_payload(0x1000, 0x100, "m.so")),
        (wire::TAG_BATCH_INVOCATION, vec![0u8; 48]),
        (wire::TAG_THREAD_NAME, string_payload("t")),
        (wire::TAG_INDEXED_FREQUENCY, frequency_payload(2, 2)),
        (wire::TAG_DYNAMIC_SYMBOL, id_string_payload(1, "s")),
        (wire::TAG_SAMPLE_DATA, sample_payload(&[1])),
        (wire::TAG_FUNCTION_NAME_TABLE_ENTRY, id_string_payload(1, "f")),
        (wire::TAG_STACK_TRACE, stack_payload(&[0x10])),
        (wire::TAG_DETAILED_FUNCTION_CALL, detailed_payload(b"a")),
        (wire::TAG_COMMENT, string_payload("c")),
        (wire::TAG_PROCESS_HEAP, 1u64.to_le_bytes().to_vec()),
    ];

    for (kind, mut payload) in cases {
        payload.pop();
        let mut d = dispatcher(false);
        // Recognized and consumed, but unparsable.
        assert!(d.dispatch(&record(kind, 1, 2, &payload)), "kind 0x{kind:02x}");
        assert!(d.error_occurred(), "kind 0x{kind:02x} should set the sticky flag");
        assert!(d.handler().calls.is_empty(), "kind 0x{kind:02x} must not reach the handler");
    }
}

#[test]
fn test_corrupt_timestamp_still_dispatches() {
    // A coarse clock with a hostile tick value clamps instead of aborting
    // the dispatch.
    let clock = TickClock::new(std::time::UNIX_EPOCH, 1);
    let mut d = Dispatcher::new(Recorder::default(), clock, false);
    let payload = enter_exit_payload(0x1000);
    let mut rec = record(wire::TAG_FUNCTION_ENTER, 1, 2, &payload);
    rec.raw_timestamp = u64::MAX;

    assert!(d.dispatch(&rec));
    assert!(!d.error_occurred());
    assert_eq!(d.handler().calls, vec!["entry PID:1 TID:2 fn=0x1000"]);
}

#[test]
fn test_torn_batch_dispatches_with_trimmed_count() {
    let mut d = dispatcher(false);
    let payload = batch_payload(4, &[0x10, 0x20, 0]);
    assert!(d.dispatch(&record(wire::TAG_BATCH_ENTER, 1, 2, &payload)));
    assert!(!d.error_occurred());
    assert_eq!(d.handler().calls, vec!["batch PID:1 TID:4 count=2"]);
}

#[test]
fn test_unknown_kind_is_reported_but_not_fatal() {
    let mut d = dispatcher(false);
    assert!(d.dispatch(&record(0xee, 1, 2, &[1, 2, 3])));
    assert!(!d.error_occurred());
    assert!(d.handler().calls.is_empty());
}

#[test]
fn test_module_event_kind_is_unimplemented_noop() {
    let mut d = dispatcher(false);
    assert!(d.dispatch(&record(wire::TAG_MODULE_EVENT, 1, 2, &[])));
    assert!(!d.error_occurred());
    assert!(d.handler().calls.is_empty());
}

#[test]
fn test_attach_populates_lookup_and_detach_keeps_it_dirty() {
    let mut d = dispatcher(false);
    let pid = Pid(9);
    let payload = module_payload(0x7000_0000, 0x4000, "/opt/app/libwork.so");

    assert!(d.dispatch(&record(wire::TAG_PROCESS_ATTACH, 9, 2, &payload)));
    let info = d.lookup_module(pid, 0x7000_1234).expect("attached module resolves");
    assert_eq!(info.path, "/opt/app/libwork.so");
    assert!(d.lookup_module(pid, 0x7000_4000).is_none());

    assert!(d.dispatch(&record(wire::TAG_PROCESS_DETACH, 9, 2, &payload)));
    assert!(!d.error_occurred());
    // Retained dirty for late out-of-order attribution.
    let (info, liveness) = d.module_map().lookup_entry(pid, 0x7000_1234).unwrap();
    assert_eq!(info.path, "/opt/app/libwork.so");
    assert_eq!(liveness, Liveness::Dirty);
}

#[test]
fn test_null_base_module_record_is_benign() {
    let mut d = dispatcher(true);
    let payload = module_payload(0, 0x4000, "torn.so");
    assert!(d.dispatch(&record(wire::TAG_PROCESS_ATTACH, 9, 2, &payload)));
    assert!(!d.error_occurred());
    assert!(d.handler().calls.is_empty());
    assert!(d.module_map().process_space(Pid(9)).is_none());
}

#[test]
fn test_process_ended_marks_modules_and_requires_known_pid() {
    let mut d = dispatcher(false);
    let a = module_payload(0x1000, 0x100, "a.so");
    let b = module_payload(0x5000, 0x100, "b.so");
    assert!(d.dispatch(&record(wire::TAG_PROCESS_ATTACH, 3, 1, &a)));
    assert!(d.dispatch(&record(wire::TAG_PROCESS_ATTACH, 3, 1, &b)));

    assert!(d.dispatch(&record(wire::TAG_PROCESS_ENDED, 3, 0, &[])));
    assert!(!d.error_occurred());
    assert_eq!(d.module_map().lookup_entry(Pid(3), 0x1000).unwrap().1, Liveness::Dirty);
    assert_eq!(d.module_map().lookup_entry(Pid(3), 0x5000).unwrap().1, Liveness::Dirty);
    // Handler notified before the teardown cascade.
    assert_eq!(d.handler().calls.last().unwrap(), "ended PID:3");

    // A process the tracker never saw is a hard error here.
    let mut fresh = dispatcher(false);
    assert!(fresh.dispatch(&record(wire::TAG_PROCESS_ENDED, 404, 0, &[])));
    assert!(fresh.error_occurred());
    assert_eq!(fresh.handler().calls, vec!["ended PID:404"]);
}

#[test]
fn test_module_conflict_escalates_only_under_strict_policy() {
    let first = module_payload(0x1000, 0x100, "first.so");
    let mut second = module_payload(0x1000, 0x100, "second.so");
    // Different checksum so the two are genuinely different modules.
    second[16..20].copy_from_slice(&0x1111_u32.to_le_bytes());

    let mut strict = dispatcher(true);
    assert!(strict.dispatch(&record(wire::TAG_PROCESS_ATTACH, 1, 2, &first)));
    assert!(strict.dispatch(&record(wire::TAG_PROCESS_ATTACH, 1, 2, &second)));
    assert!(strict.error_occurred());
    // The conflicting attach never reached the handler.
    assert_eq!(strict.handler().calls, vec!["attach PID:1 first.so"]);
    assert_eq!(strict.lookup_module(Pid(1), 0x1000).unwrap().path, "first.so");

    let mut tolerant = dispatcher(false);
    assert!(tolerant.dispatch(&record(wire::TAG_PROCESS_ATTACH, 1, 2, &first)));
    assert!(tolerant.dispatch(&record(wire::TAG_PROCESS_ATTACH, 1, 2, &second)));
    assert!(!tolerant.error_occurred());
    assert_eq!(tolerant.lookup_module(Pid(1), 0x1000).unwrap().path, "first.so");
}

#[test]
fn test_batch_invocation_length_must_align() {
    let mut d = dispatcher(false);
    assert!(d.dispatch(&record(wire::TAG_BATCH_INVOCATION, 1, 2, &[0u8; 50])));
    assert!(d.error_occurred());
    assert!(d.handler().calls.is_empty());
}
