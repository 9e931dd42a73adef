//! Sweeps sizes, block sizes and repeated runs, one process per trial.
//!
//! Running trials back to back in one process would let the previous
//! trial's matrices warm the caches for the next one. The sweep therefore
//! launches a fresh `run` process for every trial, reads the record from
//! its stdout, and appends one CSV row. A trial that fails or prints no
//! record gets `N/A` cells instead.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::error::{Result, invalid_argument};
use crate::record::{UNAVAILABLE, expected_tokens, parse_last_record};
use crate::strategy::Strategy;

/// Matrix sizes used when none are given.
pub const DEFAULT_SIZES: [usize; 7] = [600, 1000, 1400, 1800, 2200, 2600, 3000];
/// Block sizes used when none are given.
pub const DEFAULT_BLOCK_SIZES: [usize; 3] = [128, 256, 512];
pub const DEFAULT_RUNS: usize = 10;

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub strategies: Vec<Strategy>,
    pub sizes: Vec<usize>,
    pub block_sizes: Vec<usize>,
    pub runs: usize,
    pub out_dir: PathBuf,
    pub l3: bool,
    pub cpu: Option<usize>,
}

impl SweepConfig {
    fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(invalid_argument("runs must be at least 1"));
        }
        if self.sizes.is_empty() || self.sizes.contains(&0) {
            return Err(invalid_argument("sizes must be non-empty and positive"));
        }
        if self.strategies.contains(&Strategy::Block)
            && (self.block_sizes.is_empty() || self.block_sizes.contains(&0))
        {
            return Err(invalid_argument(
                "block sizes must be non-empty and positive",
            ));
        }
        Ok(())
    }
}

/// One trial to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialSpec {
    pub strategy: Strategy,
    pub n: usize,
    pub block_size: Option<usize>,
    pub l3: bool,
    pub cpu: Option<usize>,
}

/// Runs a trial somewhere and returns what it printed on stdout.
///
/// `Err` means the trial could not be launched at all; a trial that ran
/// but failed should return its (record-less) output.
pub trait TrialLauncher {
    fn launch(&mut self, trial: &TrialSpec) -> Result<String>;
}

/// Launches `<exe> run ...` as a child process.
pub struct ProcessLauncher {
    exe: PathBuf,
}

impl ProcessLauncher {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    /// Launches the currently running executable.
    pub fn current_exe() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    fn args(trial: &TrialSpec) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            trial.strategy.name().to_string(),
            trial.n.to_string(),
        ];
        if let Some(bs) = trial.block_size {
            args.push(bs.to_string());
        }
        if trial.l3 {
            args.push("--l3".to_string());
        }
        if let Some(cpu) = trial.cpu {
            args.push("--cpu".to_string());
            args.push(cpu.to_string());
        }
        args
    }
}

impl TrialLauncher for ProcessLauncher {
    fn launch(&mut self, trial: &TrialSpec) -> Result<String> {
        let output = Command::new(&self.exe).args(Self::args(trial)).output()?;
        if !output.status.success() {
            warn!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "trial process failed"
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub fn csv_file_name(strategy: Strategy, n: usize) -> String {
    format!("{}_mult_{}.csv", strategy.name(), n)
}

pub fn csv_header(strategy: Strategy, l3: bool) -> String {
    let mut columns = vec!["Run"];
    if strategy == Strategy::Block {
        columns.push("Block Size");
    }
    columns.extend(["Time (s)", "L1 DCM", "L2 DCM"]);
    if l3 {
        columns.push("L3 TCM");
    }
    columns.join(",")
}

/// Builds a CSV row from the trial's stdout, with `N/A` cells if no record is found.
pub fn csv_row(run: usize, block_size: Option<usize>, stdout: &str, l3: bool) -> String {
    let expected = expected_tokens(l3);
    let values = parse_last_record(stdout, expected)
        .unwrap_or_else(|| vec![UNAVAILABLE.to_string(); expected]);

    let mut cells = vec![run.to_string()];
    if let Some(bs) = block_size {
        cells.push(bs.to_string());
    }
    cells.extend(values);
    cells.join(",")
}

/// Runs the whole sweep and returns the CSV files written.
pub fn run_sweep(config: &SweepConfig, launcher: &mut dyn TrialLauncher) -> Result<Vec<PathBuf>> {
    config.validate()?;
    fs::create_dir_all(&config.out_dir)?;

    let mut written = Vec::new();
    for &strategy in &config.strategies {
        for &n in &config.sizes {
            let path = config.out_dir.join(csv_file_name(strategy, n));
            sweep_one_file(config, launcher, strategy, n, &path)?;
            written.push(path);
        }
    }
    Ok(written)
}

fn sweep_one_file(
    config: &SweepConfig,
    launcher: &mut dyn TrialLauncher,
    strategy: Strategy,
    n: usize,
    path: &Path,
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", csv_header(strategy, config.l3))?;

    let block_sizes: Vec<Option<usize>> = if strategy == Strategy::Block {
        config.block_sizes.iter().copied().map(Some).collect()
    } else {
        vec![None]
    };

    for block_size in block_sizes {
        for run in 1..=config.runs {
            let trial = TrialSpec {
                strategy,
                n,
                block_size,
                l3: config.l3,
                cpu: config.cpu,
            };
            let stdout = match launcher.launch(&trial) {
                Ok(stdout) => stdout,
                Err(e) => {
                    warn!(error = %e, ?trial, "could not launch trial");
                    String::new()
                }
            };
            let row = csv_row(run, block_size, &stdout, config.l3);
            info!(%strategy, n, ?block_size, run, row = %row, "trial recorded");
            writeln!(out, "{row}")?;
            // rows survive an interrupted sweep
            out.flush()?;
        }
    }
    Ok(())
}
