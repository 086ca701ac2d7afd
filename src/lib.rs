//! # pario-stress
//!
//! Aggregate write and read bandwidth of a shared file accessed
//! concurrently by a fixed group of cooperating workers.
//!
//! Each worker owns a disjoint byte range of one file. For every block size
//! in the sweep the group writes its ranges, reads them back, verifies the
//! sentinel byte, and the coordinator prints cycle counts and bandwidth.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pario_stress::{run_local, ConsoleReporter, SweepConfig};
//!
//! let config = SweepConfig::new().workers(4);
//! let result = run_local(&config, "/mnt/shared/bench.dat".as_ref(), &ConsoleReporter::new())?;
//! assert_eq!(result.results.len(), 8);
//! # Ok::<(), pario_stress::BenchError>(())
//! ```
//!
//! Workers can also be driven individually through [`run_sweep`] with any
//! [`ProcessGroup`] implementation.

mod config;
mod error;
mod group;
mod partition;
mod report;
mod result;
mod shared_file;
mod sweep;
mod tester;
mod timer;
mod verify;

pub use config::{parse_size_list, OutputFormat, SweepConfig};
pub use error::{BenchError, Result};
pub use group::{LocalGroup, LocalWorker, ProcessGroup, WorkerIdentity};
pub use partition::{block_offset, worker_offset, OffsetStrategy};
pub use report::{ConsoleReporter, JsonReporter, MultiReporter, NullReporter, Reporter};
pub use result::{BlockSizeResult, Phase, PhaseReport, ReadOutcome, SweepResult};
pub use shared_file::{delete, OpenMode, SharedFile};
pub use sweep::{run_local, run_sweep, SweepState};
pub use tester::{read_test, write_test, TestRun, WorkerContext};
pub use timer::{bandwidth_mbps, CycleSource, CycleTimer, HardwareCycles, TimingWindow};
pub use verify::{first_mismatch, Mismatch};
