//! End-to-end tests: load whole logs, query states and dependency chains.

use std::io::{BufReader, Cursor, Seek, SeekFrom, Write};

use vlog_analysis::{LogError, ResolveOptions, VerifierLog};
use vlog_common::SlotId;
use vlog_parser::Classification;
use vlog_state::Effect;

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// A log whose first `pad` lines are verifier chatter, followed by `body`.
fn padded(pad: usize, body: &[&str]) -> String {
    let mut text = String::new();
    for i in 0..pad {
        text.push_str(&format!("from {i} to {}: R1=ctx() R10=fp0\n", i + 1));
    }
    for line in body {
        text.push_str(line);
        text.push('\n');
    }
    text
}

fn load(text: &str) -> VerifierLog {
    let mut log = VerifierLog::new();
    log.feed(text);
    log.finish();
    log
}

fn r(n: u8) -> SlotId {
    SlotId::Register(n)
}

#[test]
fn dependency_stops_at_immediate() {
    init_tracing();
    let log = load(&padded(
        42,
        &[
            "42: (b7) r1 = 13                      ; R1_w=13",
            "43: (b7) r7 = 0                       ; R7_w=0",
            "44: (bf) r2 = r1                      ; R1_w=13 R2_w=13",
        ],
    ));
    assert_eq!(log.resolve_dependencies(44, r(1)), [42]);
}

#[test]
fn dependency_stops_at_two_sources() {
    init_tracing();
    let log = load(&padded(
        42,
        &[
            "42: (bf) r1 = r2",
            "43: (61) r3 = *(u32 *)(r10 -16)",
            "44: (0f) r1 += r3",
            "45: (63) *(u32 *)(r10 -64) = r1",
        ],
    ));
    assert_eq!(log.resolve_dependencies(45, r(1)), [44]);
    // From the update itself the chain steps back to the earlier writer.
    assert_eq!(log.resolve_dependencies(44, r(1)), [42]);
}

const PROGRAM: &str = "\
func#0 @0
0: R1=ctx() R10=fp0
; int prog(struct xdp_md *ctx) @ xdp.c:10
0: (b7) r6 = 0                        ; R6_w=0
1: (7b) *(u64 *)(r10 -8) = r6         ; R6_w=0 R10=fp0 fp-8_w=0
2: (bf) r2 = r10                      ; R2_w=fp0 R10=fp0
3: (07) r2 += -8                      ; R2_w=fp-8
4: (18) r1 = 0xffff888004a1c000 ll    ; R1_w=map_ptr(ks=8,vs=8)
6: (85) call bpf_map_lookup_elem#1    ; R0_w=map_value_or_null(id=1,ks=8,vs=8)
7: (15) if r0 == 0x0 goto pc+3        ; R0_w=map_value(ks=8,vs=8)
8: (b7) r1 = 1                        ; R1_w=1
9: (db) lock *(u64 *)(r0 +0) += r1    ; R0=map_value(ks=8,vs=8) R1=1
10: (85) call pc+2
caller:
 R6=0 R10=fp0
callee:
 frame1: R1=1 R10=fp0
13: (bf) r0 = r1                      ; frame1: R0_w=1 R1=1
14: (95) exit
returning from callee:
 frame1: R0_w=1 R1=1 R10=fp0
to caller at 11:
 R0_w=1 R6=0 R10=fp0
11: (b7) r0 = 0                       ; R0_w=0
12: (95) exit
processed 14 insns (limit 1000000) max_states_per_insn 0 total_states 2 peak_states 2 mark_read 1
";

#[test]
fn whole_program_states() {
    init_tracing();
    let log = load(PROGRAM);
    let summary = log.summary();
    assert_eq!(summary.lines, log.len());
    assert_eq!(summary.instructions, 14);
    assert_eq!(summary.source_comments, 1);
    assert_eq!(summary.max_frame, 1);

    // `r2 += -8` after `r2 = r10`.
    let s = log.state_at(6).unwrap();
    assert_eq!(s.value(r(2)), Some("fp-8"));
    assert_eq!(s.effect(r(2)), Effect::Update);

    // Map lookup returns into r0 and clobbers r1..r5.
    let s = log.state_at(8).unwrap();
    assert_eq!(s.value(r(0)), Some("map_value_or_null(id=1,ks=8,vs=8)"));
    assert_eq!(s.value(r(2)), None);

    // Inside the subprogram.
    let s = log.state_at(17).unwrap();
    assert_eq!(s.frame(), 1);
    assert_eq!(s.value(r(0)), Some("1"));

    // Verifier chatter between exit and the next instruction keeps the
    // post-exit state.
    let after_exit = log.state_at(21).unwrap();
    assert_eq!(after_exit.line(), Some(18));
    assert_eq!(after_exit.frame(), 0);
    assert_eq!(after_exit.value(r(0)), Some("1"));
    assert_eq!(after_exit.value(r(6)), Some("0"));
    assert_eq!(after_exit.value(SlotId::Stack(-8)), Some("0"));
}

#[test]
fn whole_program_dependencies() {
    let log = load(PROGRAM);
    // Seen after the exit, r0 was written by the exit itself.
    assert_eq!(log.resolve_dependencies(19, r(0)), [18]);
    // From the exit line, r0 came from `r0 = r1` in the callee, which read
    // the argument set before the call.
    assert_eq!(log.resolve_dependencies(18, r(0)), [17, 10]);
    // Inside the callee, r0 before `r0 = r1` was the call's placeholder.
    assert_eq!(log.resolve_dependencies(17, r(0)), [12]);
    // The stack slot was filled from r6.
    assert_eq!(log.resolve_dependencies(5, SlotId::Stack(-8)), [4, 3]);
}

#[test]
fn unrecognized_lines_are_reported() {
    let log = load(PROGRAM);
    let reasons: Vec<_> = log
        .unrecognized()
        .map(|(i, line)| (i, line.error().and_then(|e| e.offset())))
        .collect();
    assert_eq!(reasons.first(), Some(&(0, Some(0))));
    assert!(log
        .unrecognized()
        .all(|(_, l)| l.classification() == Classification::Unrecognized));
    assert_eq!(log.line(log.len() - 1).unwrap().classification(), Classification::Unrecognized);
}

#[test]
fn feeding_byte_by_byte_matches_whole() {
    let whole = load(PROGRAM);
    let mut chunked = VerifierLog::new();
    let mut buf = [0u8; 4];
    for ch in PROGRAM.chars() {
        chunked.feed(ch.encode_utf8(&mut buf));
    }
    chunked.finish();
    assert_eq!(whole.len(), chunked.len());
    for i in 0..whole.len() {
        assert_eq!(
            whole.state_at(i).map(|s| s.fingerprint()),
            chunked.state_at(i).map(|s| s.fingerprint())
        );
    }
}

#[test]
fn from_reader_reads_a_file() {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(PROGRAM.as_bytes()).unwrap();
    file.write_all(b"15: (b7) r9 = 3").unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let log = VerifierLog::from_reader(BufReader::new(file)).unwrap();
    assert_eq!(log.len(), load(PROGRAM).len() + 1);
    assert_eq!(log.current().last_write(r(9)), Some(log.len() - 1));
}

#[test]
fn from_reader_tolerates_invalid_utf8() {
    let bytes = b"0: (b7) r1 = 1\n\xff\xfe garbage\n1: (bf) r2 = r1\n".to_vec();
    let log = VerifierLog::from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(log.len(), 3);
    assert_eq!(log.resolve_dependencies(2, r(1)), [0]);
}

#[test]
fn from_reader_propagates_io_errors() {
    struct Broken;
    impl std::io::Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
        }
    }
    let err = VerifierLog::from_reader(BufReader::new(Broken)).unwrap_err();
    assert!(matches!(err, LogError::Io(_)));
    assert!(err.to_string().contains("disk gone"));
}

#[test]
fn depth_option_is_honoured() {
    let text = padded(
        0,
        &["0: (b7) r1 = 1", "1: (bf) r2 = r1", "2: (bf) r3 = r2", "3: (bf) r4 = r3"],
    );
    let mut log = VerifierLog::with_options(ResolveOptions { max_depth: 1 });
    log.feed(&text);
    log.finish();
    assert_eq!(log.resolve_dependencies(3, r(3)), [2]);
}

#[test]
fn loaded_log_is_shared_across_threads() {
    let log = load(PROGRAM);
    std::thread::scope(|scope| {
        let a = scope.spawn(|| log.resolve_dependencies(18, r(0)));
        let b = scope.spawn(|| log.state_at(17).map(|s| s.frame()));
        assert_eq!(a.join().unwrap(), [17, 10]);
        assert_eq!(b.join().unwrap(), Some(1));
    });
}

#[test]
fn independent_logs_on_separate_threads() {
    let results: Vec<Vec<usize>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| scope.spawn(|| load(PROGRAM).resolve_dependencies(5, SlotId::Stack(-8))))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(results[0], results[1]);
}

#[test]
fn queries_run_while_more_lines_arrive() {
    let mut log = VerifierLog::new();
    log.feed("0: (b7) r1 = 1\n");
    let early = log.snapshot(0).unwrap();
    log.feed("1: (b7) r1 = 2 ; R1_w=2\n");
    assert_eq!(early.value(r(1)), None);
    assert_eq!(log.snapshot(1).unwrap().value(r(1)), Some("2"));
    assert_eq!(early.last_write(r(1)), Some(0));
}
