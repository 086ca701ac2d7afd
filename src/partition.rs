//! Byte ranges of the shared file owned by each worker.

use serde::{Deserialize, Serialize};

/// How the file offset moves across the repetitions of one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetStrategy {
    /// Every repetition hits the worker's base offset (repeated overwrite).
    #[default]
    Fixed,
    /// Repetition `i` lands at `base + i * block_size`, covering the whole region.
    Advancing,
}

impl std::str::FromStr for OffsetStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "advancing" => Ok(Self::Advancing),
            other => Err(format!("unknown offset strategy '{other}'")),
        }
    }
}

/// Base offset of `rank`'s region: `rank * block_size * blocks_per_worker`.
pub fn worker_offset(rank: usize, block_size: u64, blocks_per_worker: u64) -> u64 {
    rank as u64 * block_size * blocks_per_worker
}

/// File offset used by repetition `block` of a phase.
pub fn block_offset(
    strategy: OffsetStrategy,
    rank: usize,
    block: u64,
    block_size: u64,
    blocks_per_worker: u64,
) -> u64 {
    let base = worker_offset(rank, block_size, blocks_per_worker);
    match strategy {
        OffsetStrategy::Fixed => base,
        OffsetStrategy::Advancing => base + block * block_size,
    }
}
