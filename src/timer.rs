//! Cycle-counter timing and bandwidth math.

/// Default tick rate of the cycle source, in cycles per second.
pub const DEFAULT_CLOCK_RATE_HZ: u64 = 512_000_000;

/// A monotonic counter that can be read with near-zero overhead.
pub trait CycleSource: Send + Sync {
    /// Current counter value.
    fn now(&self) -> u64;
}

/// Hardware cycle counter of the current CPU.
///
/// Reads the time-stamp counter on x86_64 and the virtual counter on
/// aarch64. Other targets fall back to nanoseconds since first use.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareCycles;

impl CycleSource for HardwareCycles {
    #[cfg(target_arch = "x86_64")]
    #[allow(unused_unsafe)]
    fn now(&self) -> u64 {
        unsafe {
            core::arch::x86_64::_rdtsc()
        }
    }

    #[cfg(target_arch = "aarch64")]
    fn now(&self) -> u64 {
        let x: u64;
        unsafe {
            core::arch::asm!("mrs {}, cntvct_el0", out(reg) x);
        }
        x
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    fn now(&self) -> u64 {
        monotonic_nanos()
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn monotonic_nanos() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Start and end counter values of one timed phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingWindow {
    pub start_cycles: u64,
    pub end_cycles: u64,
}

impl TimingWindow {
    /// Elapsed cycles. Counter wraparound is tolerated but not corrected.
    pub fn elapsed(&self) -> i64 {
        self.end_cycles.wrapping_sub(self.start_cycles) as i64
    }
}

/// Timer owned by one worker.
///
/// Every worker marks start and end so the collective calls around the
/// window stay symmetric; only rank 0 reports the result.
pub struct CycleTimer<S: CycleSource = HardwareCycles> {
    source: S,
    window: TimingWindow,
}

impl CycleTimer<HardwareCycles> {
    pub fn new() -> Self {
        Self::with_source(HardwareCycles)
    }
}

impl Default for CycleTimer<HardwareCycles> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CycleSource> CycleTimer<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            window: TimingWindow::default(),
        }
    }

    /// Record the start of the window.
    pub fn mark_start(&mut self) {
        self.window.start_cycles = self.source.now();
        self.window.end_cycles = self.window.start_cycles;
    }

    /// Record the end of the window.
    pub fn mark_end(&mut self) {
        self.window.end_cycles = self.source.now();
    }

    /// Elapsed cycles between the last `mark_start` and `mark_end`.
    pub fn elapsed(&self) -> i64 {
        self.window.elapsed()
    }

    pub fn window(&self) -> TimingWindow {
        self.window
    }
}

/// Reported bandwidth for a phase.
///
/// `elapsed_cycles / clock_rate_hz * total_bytes / 1e6`. This is the
/// figure the harness has always printed; it grows with both elapsed time
/// and transferred volume.
pub fn bandwidth_mbps(elapsed_cycles: i64, clock_rate_hz: u64, total_bytes: u64) -> f64 {
    elapsed_cycles as f64 / clock_rate_hz as f64 * total_bytes as f64 / 1e6
}
