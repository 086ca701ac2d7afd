//! Configuration for a bandwidth sweep.

use crate::error::{BenchError, Result};
use crate::partition::OffsetStrategy;
use crate::timer::DEFAULT_CLOCK_RATE_HZ;

const K: u64 = 1024;

/// Block sizes swept by default, smallest first.
pub const DEFAULT_BLOCK_SIZES: [u64; 8] = [
    128 * K,
    256 * K,
    512 * K,
    1024 * K,
    2048 * K,
    4096 * K,
    8192 * K,
    2 * 8192 * K,
];

/// Repetitions per worker per phase.
pub const DEFAULT_BLOCKS_PER_WORKER: u64 = 32;

/// Byte written by every worker and expected back on read.
pub const DEFAULT_SENTINEL: u8 = b'1';

/// Output format of the coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Console,
    /// One JSON document on stdout after the sweep.
    Json,
}

/// Configuration shared identically by every worker.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Ordered block sizes in bytes.
    pub block_sizes: Vec<u64>,
    pub blocks_per_worker: u64,
    /// Tick rate of the cycle source.
    pub clock_rate_hz: u64,
    pub sentinel: u8,
    /// Number of workers in the local group.
    pub workers: usize,
    pub offset_strategy: OffsetStrategy,
    pub format: OutputFormat,
    /// Print per-phase lines to the console.
    pub verbose: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            block_sizes: DEFAULT_BLOCK_SIZES.to_vec(),
            blocks_per_worker: DEFAULT_BLOCKS_PER_WORKER,
            clock_rate_hz: DEFAULT_CLOCK_RATE_HZ,
            sentinel: DEFAULT_SENTINEL,
            workers: 1,
            offset_strategy: OffsetStrategy::Fixed,
            format: OutputFormat::Console,
            verbose: true,
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from environment variables.
    ///
    /// Supported variables:
    /// - `PARIO_WORKERS`: workers in the group (default: 1)
    /// - `PARIO_BLOCKS`: repetitions per worker (default: 32)
    /// - `PARIO_BLOCK_SIZES`: comma list, `K`/`M` suffixes allowed
    /// - `PARIO_CLOCK_RATE`: cycle source rate in Hz (default: 512000000)
    /// - `PARIO_OFFSET`: `fixed` or `advancing`
    /// - `PARIO_FORMAT`: `console` or `json`
    /// - `PARIO_VERBOSE`: console output (default: true)
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = var("PARIO_WORKERS") {
            match v.parse() {
                Ok(n) => cfg.workers = n,
                Err(_) => log::warn!("ignoring PARIO_WORKERS={v}"),
            }
        }
        if let Some(v) = var("PARIO_BLOCKS") {
            match v.parse() {
                Ok(n) => cfg.blocks_per_worker = n,
                Err(_) => log::warn!("ignoring PARIO_BLOCKS={v}"),
            }
        }
        if let Some(v) = var("PARIO_BLOCK_SIZES") {
            match parse_size_list(&v) {
                Some(sizes) => cfg.block_sizes = sizes,
                None => log::warn!("ignoring PARIO_BLOCK_SIZES={v}"),
            }
        }
        if let Some(v) = var("PARIO_CLOCK_RATE") {
            match v.parse() {
                Ok(hz) => cfg.clock_rate_hz = hz,
                Err(_) => log::warn!("ignoring PARIO_CLOCK_RATE={v}"),
            }
        }
        if let Some(v) = var("PARIO_OFFSET") {
            match v.parse() {
                Ok(s) => cfg.offset_strategy = s,
                Err(e) => log::warn!("ignoring PARIO_OFFSET: {e}"),
            }
        }
        if let Some(v) = var("PARIO_FORMAT") {
            match v.to_ascii_lowercase().as_str() {
                "console" => cfg.format = OutputFormat::Console,
                "json" => cfg.format = OutputFormat::Json,
                _ => log::warn!("ignoring PARIO_FORMAT={v}"),
            }
        }
        if let Some(v) = var("PARIO_VERBOSE") {
            cfg.verbose = v != "0" && !v.eq_ignore_ascii_case("false");
        }

        cfg
    }

    pub fn block_sizes(mut self, sizes: impl Into<Vec<u64>>) -> Self {
        self.block_sizes = sizes.into();
        self
    }

    pub fn blocks_per_worker(mut self, n: u64) -> Self {
        self.blocks_per_worker = n;
        self
    }

    pub fn clock_rate_hz(mut self, hz: u64) -> Self {
        self.clock_rate_hz = hz;
        self
    }

    pub fn sentinel(mut self, byte: u8) -> Self {
        self.sentinel = byte;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn offset_strategy(mut self, s: OffsetStrategy) -> Self {
        self.offset_strategy = s;
        self
    }

    pub fn format(mut self, f: OutputFormat) -> Self {
        self.format = f;
        self
    }

    pub fn verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }

    /// Reject configs that would make offsets meaningless or overflow.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(BenchError::InvalidConfig(msg.to_string()));

        if self.workers == 0 {
            return invalid("workers must be at least 1");
        }
        if self.blocks_per_worker == 0 {
            return invalid("blocks per worker must be at least 1");
        }
        if self.clock_rate_hz == 0 {
            return invalid("clock rate must be non-zero");
        }
        if self.block_sizes.is_empty() {
            return invalid("block size sweep is empty");
        }
        for &b in &self.block_sizes {
            if b == 0 {
                return invalid("block sizes must be non-zero");
            }
            let end = (self.workers as u64)
                .checked_mul(b)
                .and_then(|v| v.checked_mul(self.blocks_per_worker));
            if end.is_none() || usize::try_from(b * self.blocks_per_worker).is_err() {
                return Err(BenchError::InvalidConfig(format!(
                    "block size {b} overflows the file or buffer range"
                )));
            }
        }
        Ok(())
    }
}

/// Parse `"128K,1M,4096"` into byte counts.
pub fn parse_size_list(s: &str) -> Option<Vec<u64>> {
    let sizes = s
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(parse_size)
        .collect::<Option<Vec<_>>>()?;
    (!sizes.is_empty()).then_some(sizes)
}

fn parse_size(s: &str) -> Option<u64> {
    let (digits, mult) = match s.as_bytes().last()? {
        b'k' | b'K' => (&s[..s.len() - 1], K),
        b'm' | b'M' => (&s[..s.len() - 1], K * K),
        b'g' | b'G' => (&s[..s.len() - 1], K * K * K),
        _ => (s, 1),
    };
    digits.parse::<u64>().ok()?.checked_mul(mult)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn should_use_defaults_when_env_not_set() {
        let cfg = SweepConfig::from_lookup(|_| None);
        assert_eq!(cfg.block_sizes.len(), 8);
        assert_eq!(cfg.block_sizes[0], 131_072);
        assert_eq!(cfg.block_sizes[7], 16 * 1024 * 1024);
        assert_eq!(cfg.blocks_per_worker, 32);
        assert_eq!(cfg.clock_rate_hz, 512_000_000);
        assert_eq!(cfg.sentinel, b'1');
        assert_eq!(cfg.workers, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn should_read_overrides_when_env_set() {
        let env: HashMap<&str, &str> = [
            ("PARIO_WORKERS", "4"),
            ("PARIO_BLOCK_SIZES", "4K, 1m"),
            ("PARIO_OFFSET", "advancing"),
            ("PARIO_FORMAT", "JSON"),
            ("PARIO_VERBOSE", "false"),
        ]
        .into_iter()
        .collect();
        let cfg = SweepConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.block_sizes, vec![4096, 1 << 20]);
        assert_eq!(cfg.offset_strategy, OffsetStrategy::Advancing);
        assert_eq!(cfg.format, OutputFormat::Json);
        assert!(!cfg.verbose);
    }

    #[test]
    fn should_keep_default_when_env_value_is_garbage() {
        let cfg = SweepConfig::from_lookup(|k| (k == "PARIO_WORKERS").then(|| "many".to_string()));
        assert_eq!(cfg.workers, 1);
    }

    #[test]
    fn should_build_config_with_builder() {
        let cfg = SweepConfig::new()
            .workers(3)
            .block_sizes(vec![512])
            .blocks_per_worker(4)
            .sentinel(b'x')
            .verbose(false);
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.block_sizes, vec![512]);
        assert_eq!(cfg.blocks_per_worker, 4);
        assert_eq!(cfg.sentinel, b'x');
    }

    #[test]
    fn should_reject_invalid_configs() {
        assert!(SweepConfig::new().workers(0).validate().is_err());
        assert!(SweepConfig::new().block_sizes(vec![]).validate().is_err());
        assert!(SweepConfig::new().block_sizes(vec![0]).validate().is_err());
        assert!(SweepConfig::new().clock_rate_hz(0).validate().is_err());
        assert!(SweepConfig::new().block_sizes(vec![u64::MAX / 2]).validate().is_err());
    }

    #[test]
    fn should_reject_size_list_when_entry_is_bad() {
        assert_eq!(parse_size_list("1K,2K"), Some(vec![1024, 2048]));
        assert_eq!(parse_size_list("1K,abc"), None);
        assert_eq!(parse_size_list(""), None);
    }
}
