//! Timed write and read phases for one block size.
//!
//! Both phases follow the same shape: barrier, collective open, timed
//! loop of `blocks_per_worker` positioned transfers, one barrier, collective
//! close, end of window. Every worker runs the whole shape; only the
//! coordinator reports timings.

use crate::config::SweepConfig;
use crate::error::{BenchError, Result};
use crate::group::{ProcessGroup, WorkerIdentity};
use crate::partition::block_offset;
use crate::report::Reporter;
use crate::result::{Phase, PhaseReport, ReadOutcome};
use crate::shared_file::{OpenMode, SharedFile};
use crate::sweep::SweepState;
use crate::timer::CycleTimer;
use crate::verify::first_mismatch;
use log::{debug, warn};
use std::cell::Cell;
use std::path::Path;

/// Parameters of one sweep iteration.
#[derive(Debug, Clone, Copy)]
pub struct TestRun<'p> {
    pub block_size: u64,
    pub blocks_per_worker: u64,
    pub path: &'p Path,
}

impl TestRun<'_> {
    /// Reject runs whose buffers would be empty.
    ///
    /// Every worker gets the same `TestRun`, so a rejection happens on all of
    /// them before the first collective call.
    pub fn check(&self) -> Result<()> {
        if self.block_size == 0 || self.blocks_per_worker == 0 {
            return Err(BenchError::InvalidConfig(format!(
                "block size {} with {} blocks per worker leaves nothing to transfer",
                self.block_size, self.blocks_per_worker
            )));
        }
        Ok(())
    }
}

/// Everything a worker threads through its phases.
pub struct WorkerContext<'a, G: ProcessGroup + ?Sized> {
    pub group: &'a G,
    pub config: &'a SweepConfig,
    pub reporter: &'a dyn Reporter,
    state: Cell<SweepState>,
}

impl<'a, G: ProcessGroup + ?Sized> WorkerContext<'a, G> {
    pub fn new(group: &'a G, config: &'a SweepConfig, reporter: &'a dyn Reporter) -> Self {
        Self {
            group,
            config,
            reporter,
            state: Cell::new(SweepState::Idle),
        }
    }

    pub fn identity(&self) -> WorkerIdentity {
        self.group.identity()
    }

    /// Current position in the per-iteration state machine.
    pub fn state(&self) -> SweepState {
        self.state.get()
    }

    pub(crate) fn enter(&self, next: SweepState) {
        debug!(
            "rank {}: {:?} -> {:?}",
            self.identity().rank,
            self.state.get(),
            next
        );
        self.state.set(next);
    }

    fn report(&self, report: &PhaseReport) {
        let id = self.identity();
        debug!(
            "rank {}: {:?} block_size={} elapsed={} bandwidth={:.6}",
            id.rank, report.phase, report.block_size, report.elapsed_cycles, report.bandwidth_mbps
        );
        if id.is_coordinator() && self.config.verbose {
            self.reporter.phase_end(report);
        }
    }

    /// Make a local transfer failure visible to the whole group.
    fn agree_on_io(&self, local: Result<()>, path: &Path) -> Result<()> {
        let everyone = self.group.all_agree(local.is_ok());
        match local {
            Err(e) => Err(e),
            Ok(()) if !everyone => Err(BenchError::PeerIo {
                path: path.to_path_buf(),
            }),
            Ok(()) => Ok(()),
        }
    }
}

/// Write phase: every repetition writes the whole sentinel buffer.
pub fn write_test<G: ProcessGroup + ?Sized>(
    ctx: &WorkerContext<'_, G>,
    run: TestRun<'_>,
) -> Result<PhaseReport> {
    run.check()?;
    let id = ctx.identity();

    ctx.enter(SweepState::BarrierPreWrite);
    ctx.group.barrier();
    let file = SharedFile::open(ctx.group, run.path, OpenMode::CreateWrite)?;

    let buf = vec![ctx.config.sentinel; run.block_size as usize];
    let mut timer = CycleTimer::new();
    let mut short = 0u64;
    let mut outcome = Ok(());

    ctx.enter(SweepState::Writing);
    timer.mark_start();
    for block in 0..run.blocks_per_worker {
        let offset = block_offset(
            ctx.config.offset_strategy,
            id.rank,
            block,
            run.block_size,
            run.blocks_per_worker,
        );
        match file.write_at(&buf, offset) {
            Ok(n) if n < buf.len() => short += 1,
            Ok(_) => {}
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    ctx.enter(SweepState::BarrierPostWrite);
    ctx.group.barrier();
    file.close(ctx.group)?;
    timer.mark_end();
    ctx.enter(SweepState::ClosedWrite);

    ctx.agree_on_io(outcome, run.path)?;
    if short > 0 {
        warn!(
            "rank {}: {short} of {} writes at block size {} were short",
            id.rank, run.blocks_per_worker, run.block_size
        );
    }

    let mut report = PhaseReport::new(
        Phase::Write,
        id,
        run.block_size,
        run.blocks_per_worker,
        timer.elapsed(),
        ctx.config.clock_rate_hz,
    );
    report.short_transfers = short;
    ctx.report(&report);
    Ok(report)
}

/// Read phase followed by verification of the whole buffer.
///
/// Repetition `i` fills slice `i` of the buffer. A short read leaves the
/// rest of its slice zeroed, which the verifier then flags.
pub fn read_test<G: ProcessGroup + ?Sized>(
    ctx: &WorkerContext<'_, G>,
    run: TestRun<'_>,
) -> Result<ReadOutcome> {
    run.check()?;
    let id = ctx.identity();

    ctx.enter(SweepState::BarrierPreRead);
    ctx.group.barrier();
    let file = SharedFile::open(ctx.group, run.path, OpenMode::ReadOnly)?;

    let block_len = run.block_size as usize;
    let mut buf = vec![0u8; block_len * run.blocks_per_worker as usize];
    let mut timer = CycleTimer::new();
    let mut short = 0u64;
    let mut outcome = Ok(());

    ctx.enter(SweepState::Reading);
    timer.mark_start();
    for (block, slice) in buf.chunks_mut(block_len).enumerate() {
        let offset = block_offset(
            ctx.config.offset_strategy,
            id.rank,
            block as u64,
            run.block_size,
            run.blocks_per_worker,
        );
        match file.read_at(slice, offset) {
            Ok(n) if n < block_len => short += 1,
            Ok(_) => {}
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    ctx.enter(SweepState::BarrierPostRead);
    ctx.group.barrier();
    file.close(ctx.group)?;
    timer.mark_end();
    ctx.enter(SweepState::ClosedRead);

    ctx.agree_on_io(outcome, run.path)?;
    if short > 0 {
        warn!(
            "rank {}: {short} of {} reads at block size {} were short",
            id.rank, run.blocks_per_worker, run.block_size
        );
    }

    let mut report = PhaseReport::new(
        Phase::Read,
        id,
        run.block_size,
        run.blocks_per_worker,
        timer.elapsed(),
        ctx.config.clock_rate_hz,
    );
    report.short_transfers = short;
    ctx.report(&report);

    let mismatch = first_mismatch(id.rank, &buf, ctx.config.sentinel);
    if let Some(m) = &mismatch {
        ctx.reporter.mismatch(m);
    }
    ctx.enter(SweepState::Verified);

    Ok(ReadOutcome { report, mismatch })
}
