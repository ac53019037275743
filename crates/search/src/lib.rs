//! BGRT search driver: evaluation, work partitioning, the worker
//! pool, and the `find_error*` entry points.
//!
//! The driver repeatedly asks the BGRT state for a successor
//! population, filters it through the active termination bound, hands
//! per-worker buckets to a fixed thread pool, folds the workers'
//! maxima into the global best, and occasionally restarts from the
//! initial configuration to escape local maxima.
//!
//! ```no_run
//! use errforge_bgrt::{Configuration, Variable};
//! use errforge_search::{find_error_multithread, SampledConfig, SearchOptions};
//! use errforge_shadow::BigFloat;
//!
//! let mut initial: Configuration<f32> = Configuration::new();
//! initial.insert(0, Variable::from_bounds(BigFloat::from_f64(-1.0), BigFloat::from_f64(1.0)));
//!
//! let third = num_bigfloat::ONE / BigFloat::from_f64(3.0);
//! let kernel = move |input: &SampledConfig<f32>| -> SampledConfig<f32> {
//!     let shifted = input[&0] + errforge_shadow::Value::from_shadow(third);
//!     [(0u64, shifted)].into_iter().collect()
//! };
//!
//! let best = find_error_multithread(&initial, kernel, 1_000_000, SearchOptions::resource());
//! println!("worst absolute error: {}", best.abs_err);
//! ```

pub mod counter;
pub mod driver;
pub mod eval;
pub mod partition;
pub mod pool;
pub mod results;

pub use counter::PartitionCounter;
pub use driver::{
    find_error, find_error_bound_conf, find_error_mantissa, find_error_multithread, Bound,
    SearchDriver, SearchOptions,
};
pub use eval::{eval, DynKernel, Kernel, SampledConfig};
pub use partition::{partition_configs, partition_next_gen};
pub use pool::{WorkerPool, WorkerReport};
pub use results::EvalResults;
