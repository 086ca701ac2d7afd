//! The sweep driver: every block size, write then read, then a clean file.

use crate::config::SweepConfig;
use crate::error::Result;
use crate::group::{LocalGroup, ProcessGroup};
use crate::report::Reporter;
use crate::result::{BlockSizeResult, SweepResult};
use crate::shared_file;
use crate::tester::{read_test, write_test, TestRun, WorkerContext};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a worker is within one sweep iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepState {
    Idle,
    BarrierPreWrite,
    Writing,
    BarrierPostWrite,
    ClosedWrite,
    BarrierPreRead,
    Reading,
    BarrierPostRead,
    ClosedRead,
    Verified,
}

/// Run the whole sweep as one worker of `group`.
///
/// Every worker of the group must call this with the same `config` and
/// `path`. Block sizes run strictly in order; after each size the
/// coordinator deletes the file and the group waits for the deletion.
pub fn run_sweep<G: ProcessGroup + ?Sized>(
    group: &G,
    config: &SweepConfig,
    path: &Path,
    reporter: &dyn Reporter,
) -> Result<SweepResult> {
    config.validate()?;
    let id = group.identity();
    let ctx = WorkerContext::new(group, config, reporter);

    if id.is_coordinator() {
        info!(
            "sweeping {} block sizes over {} workers on {}",
            config.block_sizes.len(),
            id.group_size,
            path.display()
        );
        if config.verbose {
            reporter.sweep_start(id);
        }
    }

    let mut results = Vec::with_capacity(config.block_sizes.len());
    for &block_size in &config.block_sizes {
        if id.is_coordinator() && config.verbose {
            reporter.block_start(block_size);
        }
        let run = TestRun {
            block_size,
            blocks_per_worker: config.blocks_per_worker,
            path,
        };

        let write = write_test(&ctx, run)?;
        let read = read_test(&ctx, run)?;
        let delete_failed = !shared_file::delete(group, path);
        ctx.enter(SweepState::Idle);

        results.push(BlockSizeResult {
            block_size,
            write,
            read: read.report,
            mismatch: read.mismatch,
            delete_failed,
        });
    }

    let result = SweepResult {
        rank: id.rank,
        group_size: id.group_size,
        blocks_per_worker: config.blocks_per_worker,
        clock_rate_hz: config.clock_rate_hz,
        offset_strategy: config.offset_strategy,
        results,
    };

    if id.is_coordinator() {
        info!("sweep finished, {} mismatches on rank 0", result.mismatches().count());
        reporter.sweep_end(&result);
    }
    Ok(result)
}

/// Run the sweep on `config.workers` local workers and return the coordinator's result.
pub fn run_local(config: &SweepConfig, path: &Path, reporter: &dyn Reporter) -> Result<SweepResult> {
    config.validate()?;
    let mut per_worker = LocalGroup::run(config.workers, |w| run_sweep(&w, config, path, reporter))?;
    Ok(per_worker.swap_remove(0))
}
