//! `selftest` binary: solve and verify every `.keys` file in a directory.
//!
//! Each file is a packed array of little-endian `u32` keys. For every file
//! the binary builds a table, recomputes the slot of every key, prints one
//! line per file and finally a JSON summary.
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0    | every file solved and verified |
//! | 1    | at least one file failed |
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin selftest -- ./keys
//! cargo run --release --bin selftest -- ./keys --workers 4 --hash-function rotate-xor
//! cargo run --release --bin selftest -- ./keys --config solver.json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use perfect_hash::{HashFunction, Keys, MaskingType, SolveStats, Solver, SolverConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HashArg {
    Crc32Rotate,
    RotateXor,
    AddSubXor,
    Xor,
}

impl From<HashArg> for HashFunction {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Crc32Rotate => HashFunction::Crc32Rotate,
            HashArg::RotateXor => HashFunction::RotateXor,
            HashArg::AddSubXor => HashFunction::AddSubXor,
            HashArg::Xor => HashFunction::Xor,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MaskArg {
    Modulus,
    And,
    XorAnd,
}

impl From<MaskArg> for MaskingType {
    fn from(arg: MaskArg) -> Self {
        match arg {
            MaskArg::Modulus => MaskingType::Modulus,
            MaskArg::And => MaskingType::And,
            MaskArg::XorAnd => MaskingType::XorAnd,
        }
    }
}

/// Solve and verify every `.keys` file in a directory.
#[derive(Parser, Debug)]
#[command(name = "selftest", version, about, long_about = None)]
struct Args {
    /// Directory containing `.keys` files.
    keys_dir: PathBuf,

    /// JSON solver config; command-line flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker threads (0 = one per CPU).
    #[arg(long, short = 'w')]
    workers: Option<usize>,

    /// Hash function.
    #[arg(long, value_enum)]
    hash_function: Option<HashArg>,

    /// Masking type.
    #[arg(long, value_enum)]
    masking: Option<MaskArg>,

    /// Give up on a file after this many attempts.
    #[arg(long)]
    max_attempts: Option<u64>,
}

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    keys: usize,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<SolveStats>,
}

#[derive(Debug, Serialize)]
struct Summary {
    config: SolverConfig,
    files: usize,
    passed: usize,
    failed: usize,
    reports: Vec<FileReport>,
}

fn load_config(args: &Args) -> Result<SolverConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SolverConfig::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SolverConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.concurrency = workers;
    }
    if let Some(hash) = args.hash_function {
        config.hash_function = hash.into();
    }
    if let Some(masking) = args.masking {
        config.masking = masking.into();
    }
    if args.max_attempts.is_some() {
        config.max_attempts = args.max_attempts;
    }
    Ok(config)
}

fn key_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "keys") {
            files.push(path);
        }
    }
    files.sort();
    if files.is_empty() {
        bail!("no .keys files in {}", dir.display());
    }
    Ok(files)
}

fn run_file(solver: &mut Solver, path: &Path) -> FileReport {
    let report = |keys, outcome: perfect_hash::Result<SolveStats>| FileReport {
        file: path.display().to_string(),
        keys,
        ok: outcome.is_ok(),
        error: outcome.as_ref().err().map(ToString::to_string),
        stats: outcome.ok(),
    };
    let keys = match Keys::from_file(path) {
        Ok(keys) => keys,
        Err(err) => return report(0, Err(err)),
    };
    let outcome = solver.solve(&keys).and_then(|table| {
        table.check(&keys)?;
        Ok(table.stats().clone())
    });
    report(keys.len(), outcome)
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let files = key_files(&args.keys_dir)?;
    info!(files = files.len(), workers = config.resolved_concurrency(), "starting self-test");

    let mut solver = Solver::new(config.clone());
    let mut reports = Vec::with_capacity(files.len());
    for path in &files {
        let report = run_file(&mut solver, path);
        match (&report.stats, &report.error) {
            (Some(stats), _) => println!(
                "PASS  {:<40} keys={:<8} attempts={:<6} {:?}",
                report.file, report.keys, stats.attempts, stats.elapsed
            ),
            (None, Some(err)) => {
                error!(file = %report.file, %err, "self-test failed");
                println!("FAIL  {:<40} {err}", report.file);
            }
            (None, None) => {}
        }
        reports.push(report);
    }

    let passed = reports.iter().filter(|r| r.ok).count();
    let summary = Summary {
        config,
        files: reports.len(),
        passed,
        failed: reports.len() - passed,
        reports,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(if summary.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
