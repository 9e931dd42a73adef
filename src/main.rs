//! Benchmark runner for the matrix multiplication strategies.
//!
//! ```bash
//! # One trial; the last stdout line is "seconds l1 l2 [l3]"
//! cachemat run line 1024
//! cachemat run block 2048 256 --l3 --cpu 2
//!
//! # One process per trial, results in <strategy>_mult_<n>.csv
//! cachemat sweep --strategy block --sizes 4096,6144 --block-sizes 128,256,512
//!
//! # Interactive, in-process
//! cachemat menu
//! ```

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cachemat::affinity::pin_to_cpu;
use cachemat::counters::{CacheCounters, CounterSet, PerformanceCounterReader};
use cachemat::menu::run_menu;
use cachemat::runner::{TrialConfig, run_trial};
use cachemat::sweep::{
    DEFAULT_BLOCK_SIZES, DEFAULT_RUNS, DEFAULT_SIZES, ProcessLauncher, SweepConfig, run_sweep,
};
use cachemat::Strategy;

#[derive(Parser)]
#[command(version, about = "Cache behaviour of square matrix multiplication")]
struct Opt {
    /// More logging on stderr (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one trial and print its record
    Run(RunArgs),
    /// Run every combination, one process per trial, and write CSV files
    Sweep(SweepArgs),
    /// Interactive menu; all trials share one process
    Menu(MenuArgs),
}

#[derive(Args)]
struct RunArgs {
    /// standard (1), line (2) or block (3)
    strategy: Strategy,
    /// Matrix dimension
    n: usize,
    /// Tile size, required for block
    block_size: Option<usize>,
    /// Also count L3 misses (adds a fourth token to the record)
    #[arg(long)]
    l3: bool,
    /// Pin to this CPU before measuring
    #[arg(long)]
    cpu: Option<usize>,
    /// Print the first elements of the result before the record
    #[arg(long)]
    verify: bool,
}

#[derive(Args)]
struct SweepArgs {
    #[arg(long = "strategy", value_delimiter = ',', default_values_t = Strategy::ALL)]
    strategies: Vec<Strategy>,
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_SIZES)]
    sizes: Vec<usize>,
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_BLOCK_SIZES)]
    block_sizes: Vec<usize>,
    #[arg(long, default_value_t = DEFAULT_RUNS)]
    runs: usize,
    /// Directory for the CSV files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    #[arg(long)]
    l3: bool,
    #[arg(long)]
    cpu: Option<usize>,
}

#[derive(Args)]
struct MenuArgs {
    #[arg(long)]
    l3: bool,
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    init_tracing(opt.verbose);

    match opt.command {
        Command::Run(args) => run(args),
        Command::Sweep(args) => sweep(args),
        Command::Menu(args) => menu(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Opens the counters, or logs why not and returns `None`.
fn open_counters(set: CounterSet) -> Option<PerformanceCounterReader> {
    match PerformanceCounterReader::open(set) {
        Ok(reader) => Some(reader),
        Err(e) => {
            warn!(error = %e, "hardware counters unavailable, measuring time only");
            None
        }
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    if let Some(cpu) = args.cpu {
        if let Err(e) = pin_to_cpu(cpu) {
            warn!(error = %e, "running unpinned");
        }
    }

    let selector = args.strategy.select(args.block_size)?;
    let set = CounterSet { l3: args.l3 };
    let config = TrialConfig {
        selector,
        n: args.n,
        counters: set,
    };

    let mut reader = open_counters(set);
    let result = run_trial(config, reader.as_mut().map(|r| r as &mut dyn CacheCounters))
        .with_context(|| format!("{selector} trial with n = {} failed", args.n))?;

    if args.verify {
        let preview: Vec<String> = result.preview.iter().map(|v| v.to_string()).collect();
        println!("Result matrix:");
        println!("{}", preview.join(" "));
    }
    println!("{}", result.record_line());
    Ok(())
}

fn sweep(args: SweepArgs) -> anyhow::Result<()> {
    let config = SweepConfig {
        strategies: args.strategies,
        sizes: args.sizes,
        block_sizes: args.block_sizes,
        runs: args.runs,
        out_dir: args.out_dir,
        l3: args.l3,
        cpu: args.cpu,
    };
    let mut launcher = ProcessLauncher::current_exe().context("cannot locate own executable")?;
    let files = run_sweep(&config, &mut launcher)?;
    for file in files {
        info!(file = %file.display(), "wrote");
        println!("{}", file.display());
    }
    Ok(())
}

fn menu(args: MenuArgs) -> anyhow::Result<()> {
    let set = CounterSet { l3: args.l3 };
    let mut reader = open_counters(set);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_menu(
        stdin.lock(),
        &mut stdout,
        reader.as_mut().map(|r| r as &mut dyn CacheCounters),
        set,
    )?;
    Ok(())
}
