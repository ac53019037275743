//! Error-search harness over the classic stencil benchmarks.

mod stencils;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use errforge_bgrt::{Configuration, Variable};
use errforge_search::{
    find_error_bound_conf, find_error_mantissa, find_error_multithread, EvalResults, Kernel,
    SearchOptions,
};
use errforge_shadow::{BigFloat, NarrowFloat};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use stencils::{BalancedSum, LtrPoisson, LtrSum, POISSON_POINTS};

#[derive(Parser, Debug)]
#[command(name = "errforge-bench", about = "BGRT floating-point error search harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pairwise-balanced sum of N coefficient-1 terms over [-1, 1].
    Balanced {
        #[arg(long, default_value_t = 9)]
        points: u64,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Left-to-right sum of N coefficient-1 terms over [-1, 1].
    Ltr {
        #[arg(long, default_value_t = 9)]
        points: u64,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// 19-point Poisson operator on a 3x3x3 block over [-1, 1].
    Poisson {
        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    /// Stop on a shadow-op budget.
    Resource,
    /// Stop once intervals shrink below epsilon * 2^(bits - 1).
    Mantissa,
    /// Stop once intervals shrink below an explicit range.
    BoundConf,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[arg(long, value_enum, default_value = "mantissa")]
    mode: ModeArg,
    /// Worker threads; 0 uses every hardware thread.
    #[arg(long, default_value_t = 0)]
    threads: usize,
    /// Seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
    /// Kernel runs per configuration; defaults to the mode preset.
    #[arg(long)]
    k: Option<u64>,
    /// Partition count per generation; defaults to the mode preset.
    #[arg(long)]
    iterations: Option<u64>,
    /// Shadow-op budget for resource mode.
    #[arg(long, default_value_t = u32::MAX as u64)]
    resources: u64,
    /// Mantissa bits ignored in mantissa mode.
    #[arg(long, default_value_t = 10)]
    bits: i64,
    /// Interval floor for bound-conf mode.
    #[arg(long, default_value_t = 1.0e-6)]
    min_range: f64,
    /// Search with an f64 operand instead of f32.
    #[arg(long, default_value_t = false)]
    double: bool,
    /// Write a JSON report here as well.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Report {
    test: String,
    mode: String,
    threads: usize,
    abs_err: BigFloat,
    rel_err: BigFloat,
    correct: BigFloat,
    ulp_err: BigFloat,
    shadow_ops: u64,
    millis: u128,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Balanced { points, search } => {
            let name = format!("Balanced {points}pt");
            if search.double {
                run::<f64>(&name, BalancedSum { points }, points, &search)
            } else {
                run::<f32>(&name, BalancedSum { points }, points, &search)
            }
        }
        Command::Ltr { points, search } => {
            let name = format!("LTR {points}pt");
            if search.double {
                run::<f64>(&name, LtrSum { points }, points, &search)
            } else {
                run::<f32>(&name, LtrSum { points }, points, &search)
            }
        }
        Command::Poisson { search } => {
            if search.double {
                run::<f64>("LTR Poisson", LtrPoisson, POISSON_POINTS, &search)
            } else {
                run::<f32>("LTR Poisson", LtrPoisson, POISSON_POINTS, &search)
            }
        }
    }
}

fn run<T: NarrowFloat>(
    name: &str,
    kernel: impl Kernel<T> + 'static,
    points: u64,
    args: &SearchArgs,
) -> Result<()> {
    let initial: Configuration<T> = (0..points)
        .map(|key| {
            (
                key,
                Variable::from_bounds(BigFloat::from_f64(-1.0), BigFloat::from_f64(1.0)),
            )
        })
        .collect();

    let mut options = match args.mode {
        ModeArg::Resource => SearchOptions::resource(),
        ModeArg::Mantissa => SearchOptions::mantissa(),
        ModeArg::BoundConf => SearchOptions::bound_conf(),
    };
    options.num_threads = args.threads;
    options.seed = args.seed;
    if let Some(k) = args.k {
        options.k = k;
    }
    if let Some(iterations) = args.iterations {
        options.iterations = iterations;
    }

    let mode = format!("{:?}", args.mode).to_lowercase();
    tracing::info!(test = name, mode = %mode, threads = options.num_threads, "starting benchmark");

    let start = Instant::now();
    let best = match args.mode {
        ModeArg::Resource => {
            find_error_multithread(&initial, kernel, args.resources, options.clone())
        }
        ModeArg::Mantissa => find_error_mantissa(&initial, kernel, args.bits, options.clone()),
        ModeArg::BoundConf => find_error_bound_conf(
            &initial,
            kernel,
            BigFloat::from_f64(args.min_range),
            options.clone(),
        ),
    };
    let elapsed = start.elapsed();

    let ulp = ulp_error::<T>(&best);
    println!("\tAbsolute Error\tRelative Error\tTime taken (ms)\tCorrect Number\tULP Error");
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        name,
        best.abs_err,
        best.rel_err,
        elapsed.as_millis(),
        best.correct,
        ulp
    );

    if let Some(path) = &args.output {
        let report = Report {
            test: name.to_string(),
            mode,
            threads: options.num_threads,
            abs_err: best.abs_err,
            rel_err: best.rel_err,
            correct: best.correct,
            ulp_err: ulp,
            shadow_ops: best.shadow_ops,
            millis: elapsed.as_millis(),
        };
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!(path = %path.display(), "report written");
    }

    Ok(())
}

/// Score the divergence in units in the last place of the correct
/// value's binade, as the classic harnesses report it.
fn ulp_error<T: NarrowFloat>(best: &EvalResults) -> BigFloat {
    if best.correct == num_bigfloat::ZERO {
        return num_bigfloat::ZERO;
    }
    let binade = best.correct.abs().log2().ceil();
    if binade == num_bigfloat::ZERO {
        return num_bigfloat::ZERO;
    }
    let eps = T::EPSILON.widen();
    best.abs_err / (binade * eps)
}
