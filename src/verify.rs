//! Post-read integrity check.

use serde::{Deserialize, Serialize};

/// First byte of a worker's read buffer that did not hold the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub rank: usize,
    /// Position relative to the start of the worker's read buffer.
    pub offset: usize,
    pub found: u8,
}

/// Scan `buf` and stop at the first byte that is not `sentinel`.
pub fn first_mismatch(rank: usize, buf: &[u8], sentinel: u8) -> Option<Mismatch> {
    buf.iter()
        .position(|&b| b != sentinel)
        .map(|offset| Mismatch {
            rank,
            offset,
            found: buf[offset],
        })
}
