//! pario-stress: shared-file bandwidth sweep.
//!
//! ```text
//! pario-stress /mnt/shared/bench.dat
//! PARIO_WORKERS=8 RUST_LOG=debug pario-stress /mnt/shared/bench.dat
//! ```
//!
//! The only argument is the shared file path. Group size, block sizes and
//! output format come from `PARIO_*` environment variables.

use anyhow::{Context, Result};
use clap::Parser;
use pario_stress::{run_local, ConsoleReporter, JsonReporter, OutputFormat, Reporter, SweepConfig};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pario-stress",
    about = "Measure aggregate write/read bandwidth of a shared file",
    long_about = "
pario-stress runs a group of workers that each own a disjoint range of one
shared file. For every block size it times a write phase and a read phase,
verifies the data read back, and prints cycles elapsed and bandwidth.

Environment:
    PARIO_WORKERS        workers in the group (default 1)
    PARIO_BLOCK_SIZES    comma list, K/M suffixes (default 128K..16M)
    PARIO_BLOCKS         repetitions per worker (default 32)
    PARIO_CLOCK_RATE     cycle counter rate in Hz (default 512000000)
    PARIO_OFFSET         fixed | advancing
    PARIO_FORMAT         console | json
    RUST_LOG             log level (warn by default)
"
)]
struct Cli {
    /// Path of the shared file; must resolve identically for every worker
    path: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = SweepConfig::from_env();
    let reporter: Box<dyn Reporter> = match config.format {
        OutputFormat::Console => Box::new(ConsoleReporter::new()),
        OutputFormat::Json => Box::new(JsonReporter::new()),
    };

    run_local(&config, &cli.path, &*reporter)
        .with_context(|| format!("sweep on {} aborted", cli.path.display()))?;
    Ok(())
}
