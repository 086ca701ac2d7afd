//! End-to-end sweeps on a local worker group.

use pario_stress::{
    read_test, run_local, run_sweep, worker_offset, write_test, BenchError, ConsoleReporter,
    LocalGroup, Mismatch, NullReporter, PhaseReport, ProcessGroup, Reporter, SweepConfig, TestRun,
    WorkerContext,
};
use std::sync::Mutex;

#[derive(Default)]
struct Recorder {
    phases: Mutex<Vec<PhaseReport>>,
    mismatches: Mutex<Vec<Mismatch>>,
}

impl Reporter for Recorder {
    fn phase_end(&self, report: &PhaseReport) {
        self.phases.lock().unwrap().push(report.clone());
    }

    fn mismatch(&self, mismatch: &Mismatch) {
        self.mismatches.lock().unwrap().push(*mismatch);
    }
}

#[test]
fn should_credit_sixteen_mib_when_four_workers_write_128k() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario");
    let cfg = SweepConfig::new().workers(4).block_sizes(vec![131_072]);
    let recorder = Recorder::default();

    let result = run_local(&cfg, &path, &recorder).unwrap();

    for rank in 0..4 {
        assert_eq!(worker_offset(rank, 131_072, 32), rank as u64 * 131_072 * 32);
    }
    let phases = recorder.phases.lock().unwrap();
    assert_eq!(phases.len(), 2, "only the coordinator reports");
    assert!(phases.iter().all(|p| p.total_bytes == 16_777_216));
    assert_eq!(result.results[0].write.total_bytes, 16_777_216);
    assert!(recorder.mismatches.lock().unwrap().is_empty());
}

#[test]
fn should_find_sentinel_everywhere_when_single_worker() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solo");
    let cfg = SweepConfig::new().block_sizes(vec![512, 8192, 65_536]).verbose(false);

    let result = run_local(&cfg, &path, &NullReporter).unwrap();

    assert_eq!(result.group_size, 1);
    assert_eq!(result.mismatches().count(), 0);
    assert!(result.results.iter().all(|r| r.read.short_transfers == 0));
}

#[test]
fn should_report_offset_zero_when_file_truncated_between_phases() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated");
    let cfg = SweepConfig::new().block_sizes(vec![4096]).verbose(false);
    let recorder = Recorder::default();

    let outcomes = LocalGroup::run(3, |w| {
        let ctx = WorkerContext::new(&w, &cfg, &recorder);
        let run = TestRun {
            block_size: 4096,
            blocks_per_worker: 32,
            path: &path,
        };
        write_test(&ctx, run)?;
        w.barrier();
        if w.identity().rank == 0 {
            std::fs::OpenOptions::new()
                .write(true)
                .open(&path)
                .and_then(|f| f.set_len(0))
                .unwrap();
        }
        w.barrier();
        read_test(&ctx, run)
    })
    .unwrap();

    for (rank, outcome) in outcomes.iter().enumerate() {
        assert_eq!(
            outcome.mismatch,
            Some(Mismatch {
                rank,
                offset: 0,
                found: 0
            })
        );
        assert_eq!(outcome.report.short_transfers, 32);
    }
    assert_eq!(recorder.mismatches.lock().unwrap().len(), 3);
}

#[test]
fn should_report_same_volumes_when_sweep_repeats() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repeat");
    let cfg = SweepConfig::new()
        .workers(3)
        .block_sizes(vec![1024, 2048, 4096])
        .verbose(false);

    let first = run_local(&cfg, &path, &NullReporter).unwrap();
    let second = run_local(&cfg, &path, &NullReporter).unwrap();

    assert_eq!(first.volumes(), second.volumes());
    assert_eq!(first.volumes()[2], (3 * 32 * 4096, 3 * 32 * 4096));
}

#[test]
fn should_print_classic_console_output_when_sweeping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("console");
    let cfg = SweepConfig::new().workers(2).block_sizes(vec![1024, 2048]);
    let console = ConsoleReporter::with_writer(Vec::new());

    run_local(&cfg, &path, &console).unwrap();

    let text = String::from_utf8(console.into_inner()).unwrap();
    assert!(text.starts_with("[Run 2 Tasks]\n"));
    assert_eq!(text.matches("Performing test with block size").count(), 2);
    assert_eq!(text.matches("cycles elapsed").count(), 4);
    assert_eq!(text.matches("> Bandwidth = ").count(), 4);
    assert!(!text.contains("[Error]"));
}

#[test]
fn should_stop_every_worker_when_directory_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no/such/dir/file");
    let cfg = SweepConfig::new().block_sizes(vec![1024]).verbose(false);

    let outcomes = LocalGroup::run(2, |w| Ok(run_sweep(&w, &cfg, &path, &NullReporter).is_err()));
    assert_eq!(outcomes.unwrap(), vec![true, true]);

    let err = run_local(&cfg.clone().workers(2), &path, &NullReporter).unwrap_err();
    assert!(matches!(err, BenchError::Open { .. }));
}
