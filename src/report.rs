//! Pluggable reporters for sweep output.

use crate::group::WorkerIdentity;
use crate::result::{PhaseReport, SweepResult};
use crate::verify::Mismatch;
use std::io::Write;
use std::sync::Mutex;

/// Receives sweep events.
///
/// Timing events reach only the coordinator's reporter calls; mismatches
/// are reported by the worker that found them.
pub trait Reporter: Send + Sync {
    /// Called once by the coordinator before the first block size.
    fn sweep_start(&self, _identity: WorkerIdentity) {}

    /// Called by the coordinator when a block size starts.
    fn block_start(&self, _block_size: u64) {}

    /// Called by the coordinator after each phase.
    fn phase_end(&self, _report: &PhaseReport) {}

    /// Called by any worker whose verification failed.
    fn mismatch(&self, _mismatch: &Mismatch) {}

    /// Called by the coordinator after the last block size.
    fn sweep_end(&self, _result: &SweepResult) {}
}

/// Prints the classic per-phase lines.
pub struct ConsoleReporter<W: Write + Send = std::io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }
}

impl Default for ConsoleReporter<std::io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }

    fn emit(&self, args: std::fmt::Arguments<'_>) {
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = out.write_fmt(args).and_then(|_| out.flush()) {
            log::warn!("console reporter write failed: {e}");
        }
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn sweep_start(&self, identity: WorkerIdentity) {
        self.emit(format_args!("[Run {} Tasks]\n", identity.group_size));
    }

    fn block_start(&self, block_size: u64) {
        self.emit(format_args!(
            "\nPerforming test with block size {block_size}\n--------------\n"
        ));
    }

    fn phase_end(&self, report: &PhaseReport) {
        self.emit(format_args!(
            "{} cycles elapsed\n> Bandwidth = {:.6} MB/s\n",
            report.elapsed_cycles, report.bandwidth_mbps
        ));
        if report.short_transfers > 0 {
            self.emit(format_args!(
                "> Warning: {} short transfers\n",
                report.short_transfers
            ));
        }
    }

    fn mismatch(&self, m: &Mismatch) {
        self.emit(format_args!(
            "[Error] Rank {} failed to read/write at relative position {}, got char 0x{:02x} instead!\n",
            m.rank, m.offset, m.found
        ));
    }
}

/// Prints the coordinator's [`SweepResult`] as JSON on stdout when the sweep ends.
pub struct JsonReporter<W: Write + Send = std::io::Stdout> {
    out: Mutex<W>,
}

impl JsonReporter<std::io::Stdout> {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }
}

impl Default for JsonReporter<std::io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> JsonReporter<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

impl<W: Write + Send> Reporter for JsonReporter<W> {
    fn mismatch(&self, m: &Mismatch) {
        // Keep stdout a single JSON document.
        log::error!(
            "rank {} failed to read/write at relative position {}, got 0x{:02x}",
            m.rank,
            m.offset,
            m.found
        );
    }

    fn sweep_end(&self, result: &SweepResult) {
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        let written = serde_json::to_writer_pretty(&mut *out, result)
            .map_err(std::io::Error::other)
            .and_then(|_| writeln!(out));
        if let Err(e) = written {
            log::warn!("failed to write JSON results: {e}");
        }
    }
}

/// Combines multiple reporters.
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }
}

impl Reporter for MultiReporter {
    fn sweep_start(&self, identity: WorkerIdentity) {
        for r in &self.reporters {
            r.sweep_start(identity);
        }
    }

    fn block_start(&self, block_size: u64) {
        for r in &self.reporters {
            r.block_start(block_size);
        }
    }

    fn phase_end(&self, report: &PhaseReport) {
        for r in &self.reporters {
            r.phase_end(report);
        }
    }

    fn mismatch(&self, mismatch: &Mismatch) {
        for r in &self.reporters {
            r.mismatch(mismatch);
        }
    }

    fn sweep_end(&self, result: &SweepResult) {
        for r in &self.reporters {
            r.sweep_end(result);
        }
    }
}

/// Discards everything.
pub struct NullReporter;

impl Reporter for NullReporter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::OffsetStrategy;
    use crate::result::Phase;

    fn sample_report() -> PhaseReport {
        PhaseReport {
            phase: Phase::Write,
            block_size: 131_072,
            elapsed_cycles: 512_000_000,
            total_bytes: 16_777_216,
            bandwidth_mbps: 16.777216,
            short_transfers: 0,
        }
    }

    #[test]
    fn should_print_classic_lines_when_phase_ends() {
        let console = ConsoleReporter::with_writer(Vec::new());
        console.sweep_start(WorkerIdentity { rank: 0, group_size: 4 });
        console.block_start(131_072);
        console.phase_end(&sample_report());
        let text = String::from_utf8(console.into_inner()).unwrap();

        assert!(text.starts_with("[Run 4 Tasks]\n"));
        assert!(text.contains("Performing test with block size 131072\n--------------\n"));
        assert!(text.contains("512000000 cycles elapsed\n"));
        assert!(text.contains("> Bandwidth = 16.777216 MB/s\n"));
    }

    #[test]
    fn should_print_rank_offset_and_byte_when_mismatch() {
        let console = ConsoleReporter::with_writer(Vec::new());
        console.mismatch(&Mismatch { rank: 2, offset: 0, found: 0 });
        let text = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(
            text,
            "[Error] Rank 2 failed to read/write at relative position 0, got char 0x00 instead!\n"
        );
    }

    #[test]
    fn should_emit_parseable_json_when_sweep_ends() {
        let json = JsonReporter::with_writer(Vec::new());
        let result = SweepResult {
            rank: 0,
            group_size: 1,
            blocks_per_worker: 32,
            clock_rate_hz: 512_000_000,
            offset_strategy: OffsetStrategy::Fixed,
            results: vec![],
        };
        json.sweep_end(&result);
        let parsed: SweepResult = serde_json::from_slice(&json.into_inner()).unwrap();
        assert_eq!(parsed, result);
    }
}
