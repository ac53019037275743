//! Top-level BGRT search loop and the `find_error*` entry points.

use crate::counter::PartitionCounter;
use crate::eval::{DynKernel, Kernel};
use crate::partition::partition_next_gen;
use crate::pool::WorkerPool;
use crate::results::EvalResults;
use errforge_bgrt::{BgrtState, Configuration, SamplerKind};
use errforge_shadow::{BigFloat, NarrowFloat};
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;

/// When a search stops, and which successor configurations it still
/// evaluates.
#[derive(Debug, Clone)]
pub enum Bound {
    /// Stop once the running shadow-op total reaches the budget.
    /// Every configuration is admitted.
    Resources(u64),
    /// Admit only configurations whose every interval is at least
    /// this wide; the driver stops when a whole generation is pruned.
    MinRange(BigFloat),
}

impl Bound {
    fn exhausted(&self, counter: &PartitionCounter) -> bool {
        match self {
            Bound::Resources(limit) => counter.read() >= *limit,
            Bound::MinRange(_) => false,
        }
    }

    fn admits<T: NarrowFloat>(&self, conf: &Configuration<T>) -> bool {
        // An empty configuration has nothing to evaluate.
        if conf.is_empty() {
            return false;
        }
        match self {
            Bound::Resources(_) => true,
            Bound::MinRange(min_range) => {
                conf.values().all(|var| var.size().high() >= *min_range)
            }
        }
    }
}

/// Tunables shared by every entry point. The presets carry the
/// defaults the corresponding entry points have always used; any
/// field can be overridden before the search starts.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Partition count per generation; the population is
    /// `2 + 2 * (iterations / num_threads)` per worker.
    pub iterations: u64,
    /// Percent chance per iteration of reverting the working
    /// configuration to the initial one.
    pub restart_pct: u32,
    /// Kernel runs per configuration evaluation.
    pub k: u64,
    /// Threshold for the probabilistic progress line: two draws in
    /// `[0, 100]` are multiplied and a line is emitted when the
    /// product is at or below this.
    pub log_freq: u64,
    /// Worker threads; zero resolves to the hardware concurrency.
    pub num_threads: usize,
    /// Seed for every generator in the run. A seeded search is
    /// deterministic for a fixed thread count.
    pub seed: Option<u64>,
    /// Uniform-draw strategy used by every sampling site.
    pub sampler: SamplerKind,
}

impl SearchOptions {
    /// Defaults for the resource-bounded searches.
    pub fn resource() -> Self {
        Self {
            iterations: 1000,
            restart_pct: 15,
            k: 1000,
            log_freq: 500,
            num_threads: 0,
            seed: None,
            sampler: SamplerKind::default(),
        }
    }

    /// Defaults for the mantissa-bounded search.
    pub fn mantissa() -> Self {
        Self {
            k: 50,
            log_freq: 5000,
            ..Self::resource()
        }
    }

    /// Defaults for the interval-size-bounded search.
    pub fn bound_conf() -> Self {
        Self {
            k: 25,
            log_freq: 4000,
            ..Self::resource()
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::resource()
    }
}

/// The search loop: generate, filter, dispatch, collect, fold, maybe
/// restart; repeat until the bound is exhausted or a generation is
/// pruned empty.
pub struct SearchDriver<T: NarrowFloat> {
    initial: Configuration<T>,
    bound: Bound,
    options: SearchOptions,
    sink: Box<dyn Write + Send>,
}

impl<T: NarrowFloat> SearchDriver<T> {
    pub fn new(initial: Configuration<T>, bound: Bound, options: SearchOptions) -> Self {
        Self {
            initial,
            bound,
            options,
            sink: Box::new(io::stdout()),
        }
    }

    /// Redirect the progress lines away from stdout.
    pub fn with_sink(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.sink = sink;
        self
    }

    /// Run to completion and return the worst divergence ever seen
    /// (zero-valued when nothing was evaluated).
    pub fn run(&mut self, kernel: DynKernel<T>) -> EvalResults {
        let num_threads = resolve_threads(self.options.num_threads);
        let counter = Arc::new(PartitionCounter::new(num_threads));
        let pool = WorkerPool::spawn(
            num_threads,
            kernel,
            self.options.k,
            self.options.sampler,
            Arc::clone(&counter),
            self.options.seed,
        );

        let mut rng = match self.options.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut state = BgrtState::new(self.initial.clone());
        let mut best = EvalResults::default();

        tracing::info!(
            num_threads,
            iterations = self.options.iterations,
            k = self.options.k,
            "starting error search"
        );

        while !self.bound.exhausted(&counter) {
            let bound = &self.bound;
            let buckets = partition_next_gen(
                num_threads,
                self.options.iterations,
                &state,
                &mut rng,
                |conf| bound.admits(conf),
            );
            let total_jobs: usize = buckets.iter().map(Vec::len).sum();
            tracing::debug!(total_jobs, "generated successor buckets");

            // Every admissible successor was too narrow: the search
            // has converged as far as the bound allows.
            if total_jobs == 0 {
                break;
            }

            pool.dispatch(buckets);
            let reports = pool.collect();

            let mut local = EvalResults::default();
            let mut local_conf = None;
            for report in reports {
                if report.results.abs_err > local.abs_err {
                    local = report.results;
                    local_conf = report.conf;
                }
            }

            match local_conf {
                Some(conf) => state.set_vals(conf),
                // Nothing diverged anywhere in the generation; any
                // successor is as good as any other. Halve so a
                // size-bounded run still converges.
                None => {
                    let (lower, _) = BgrtState::half_configs(state.vals());
                    state.set_vals(lower);
                }
            }
            if local.abs_err > best.abs_err {
                best = local;
            }

            // Sometimes re-issue the original configuration, to avoid
            // getting stuck on a local maximum.
            if rng.u32(0..100) < self.options.restart_pct {
                state.set_vals(self.initial.clone());
            }

            let roll = u64::from(rng.u32(0..=100)) * u64::from(rng.u32(0..=100));
            if roll <= self.options.log_freq {
                let _ = writeln!(
                    self.sink,
                    "(CurError (abs {}) (rel {}))",
                    best.abs_err, best.rel_err
                );
            }
        }

        pool.shutdown();
        tracing::info!(
            shadow_ops = counter.read(),
            abs_err = %best.abs_err,
            "search finished"
        );
        best
    }
}

fn resolve_threads(requested: usize) -> usize {
    if requested == 0 {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        requested
    }
}

/// Resource-bounded search on a single evaluation thread.
pub fn find_error<T: NarrowFloat>(
    initial: &Configuration<T>,
    kernel: impl Kernel<T> + 'static,
    resources: u64,
    mut options: SearchOptions,
) -> EvalResults {
    options.num_threads = 1;
    SearchDriver::new(initial.clone(), Bound::Resources(resources), options)
        .run(Arc::new(kernel))
}

/// Resource-bounded search across the worker pool.
pub fn find_error_multithread<T: NarrowFloat>(
    initial: &Configuration<T>,
    kernel: impl Kernel<T> + 'static,
    resources: u64,
    options: SearchOptions,
) -> EvalResults {
    SearchDriver::new(initial.clone(), Bound::Resources(resources), options)
        .run(Arc::new(kernel))
}

/// Mantissa-bounded search: ignore intervals narrower than
/// `epsilon * 2^(resources_bits - 1)` of the narrow format.
///
/// The extra bit accounts for rounding of the range itself.
pub fn find_error_mantissa<T: NarrowFloat>(
    initial: &Configuration<T>,
    kernel: impl Kernel<T> + 'static,
    resources_bits: i64,
    options: SearchOptions,
) -> EvalResults {
    let eps = T::EPSILON.widen();
    let two = BigFloat::from_f64(2.0);
    let min_range = eps * two.pow(&BigFloat::from_i64(resources_bits - 1));
    find_error_bound_conf(initial, kernel, min_range, options)
}

/// Interval-size-bounded search: stop once every successor has an
/// interval narrower than `min_range`.
pub fn find_error_bound_conf<T: NarrowFloat>(
    initial: &Configuration<T>,
    kernel: impl Kernel<T> + 'static,
    min_range: BigFloat,
    options: SearchOptions,
) -> EvalResults {
    SearchDriver::new(initial.clone(), Bound::MinRange(min_range), options)
        .run(Arc::new(kernel))
}
