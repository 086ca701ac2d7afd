//! Result types for phases, block sizes and whole sweeps.

use crate::group::WorkerIdentity;
use crate::partition::OffsetStrategy;
use crate::timer::bandwidth_mbps;
use crate::verify::Mismatch;
use serde::{Deserialize, Serialize};

/// Which half of the write-then-read cycle a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Write,
    Read,
}

/// One worker's view of a timed phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub block_size: u64,
    pub elapsed_cycles: i64,
    /// Nominal volume credited to the whole group.
    pub total_bytes: u64,
    pub bandwidth_mbps: f64,
    /// Repetitions on this worker that moved fewer than `block_size` bytes.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub short_transfers: u64,
}

impl PhaseReport {
    pub(crate) fn new(
        phase: Phase,
        identity: WorkerIdentity,
        block_size: u64,
        blocks_per_worker: u64,
        elapsed_cycles: i64,
        clock_rate_hz: u64,
    ) -> Self {
        let total_bytes = blocks_per_worker * identity.group_size as u64 * block_size;
        Self {
            phase,
            block_size,
            elapsed_cycles,
            total_bytes,
            bandwidth_mbps: bandwidth_mbps(elapsed_cycles, clock_rate_hz, total_bytes),
            short_transfers: 0,
        }
    }
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// Read phase plus the verifier's verdict for this worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadOutcome {
    pub report: PhaseReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<Mismatch>,
}

/// Everything measured for one block size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSizeResult {
    pub block_size: u64,
    pub write: PhaseReport,
    pub read: PhaseReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<Mismatch>,
    /// Removing the file after this size failed.
    #[serde(default)]
    pub delete_failed: bool,
}

/// Results of a full sweep as seen by one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub rank: usize,
    pub group_size: usize,
    pub blocks_per_worker: u64,
    pub clock_rate_hz: u64,
    pub offset_strategy: OffsetStrategy,
    pub results: Vec<BlockSizeResult>,
}

impl SweepResult {
    /// Nominal bytes credited per block size, in sweep order.
    pub fn volumes(&self) -> Vec<(u64, u64)> {
        self.results
            .iter()
            .map(|r| (r.write.total_bytes, r.read.total_bytes))
            .collect()
    }

    /// Block sizes whose verification found a bad byte.
    pub fn mismatches(&self) -> impl Iterator<Item = &Mismatch> {
        self.results.iter().filter_map(|r| r.mismatch.as_ref())
    }
}
