//! Fixed worker pool with channel-based work handoff.
//!
//! Each worker owns an input channel carrying either a batch of
//! configurations or a terminate sentinel, and a reverse channel
//! carrying its per-batch report. Every blocking receive is bounded,
//! so a missed notification or a termination request is observed
//! within one wait period. The driver's collect pass waits for every
//! worker's report before returning, which is the barrier between
//! iterations.

use crate::counter::PartitionCounter;
use crate::eval::{eval, DynKernel};
use crate::results::EvalResults;
use errforge_bgrt::{Configuration, SamplerKind};
use errforge_shadow::NarrowFloat;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on every blocking wait in the handoff protocol.
pub const HANDOFF_WAIT: Duration = Duration::from_millis(500);

enum WorkerRequest<T: NarrowFloat> {
    Batch(Vec<Configuration<T>>),
    Terminate,
}

/// One worker's maxima over its bucket: the best evaluation and the
/// configuration that produced it (absent when the bucket was empty
/// or nothing diverged).
pub struct WorkerReport<T: NarrowFloat> {
    pub results: EvalResults,
    pub conf: Option<Configuration<T>>,
}

struct WorkerHandle<T: NarrowFloat> {
    input: Sender<WorkerRequest<T>>,
    output: Receiver<WorkerReport<T>>,
    thread: JoinHandle<()>,
}

/// A fixed set of evaluation threads, created once per search and
/// joined at shutdown.
pub struct WorkerPool<T: NarrowFloat> {
    workers: Vec<WorkerHandle<T>>,
}

impl<T: NarrowFloat> WorkerPool<T> {
    /// Spawn `num_workers` threads sharing `kernel` and `counter`.
    /// With a seed, each worker's generator is derived from it and its
    /// slot index, so a run is reproducible for a fixed worker count.
    pub fn spawn(
        num_workers: usize,
        kernel: DynKernel<T>,
        k: u64,
        sampler: SamplerKind,
        counter: Arc<PartitionCounter>,
        seed: Option<u64>,
    ) -> Self {
        assert!(num_workers > 0, "worker pool needs at least one worker");
        assert_eq!(
            counter.slots(),
            num_workers,
            "partition counter must have one slot per worker"
        );

        let workers = (0..num_workers)
            .map(|slot| {
                let (input_tx, input_rx) = mpsc::channel();
                let (output_tx, output_rx) = mpsc::channel();
                let kernel = Arc::clone(&kernel);
                let counter = Arc::clone(&counter);
                let rng = match seed {
                    Some(base) => fastrand::Rng::with_seed(base.wrapping_add(slot as u64 + 1)),
                    None => fastrand::Rng::new(),
                };
                let thread = thread::Builder::new()
                    .name(format!("errforge-worker-{slot}"))
                    .spawn(move || {
                        worker_loop(slot, input_rx, output_tx, kernel, k, sampler, counter, rng)
                    })
                    .expect("failed to spawn worker thread");
                WorkerHandle {
                    input: input_tx,
                    output: output_rx,
                    thread,
                }
            })
            .collect();

        Self { workers }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Hand one bucket to each worker. Empty buckets are dispatched
    /// too: every worker reports every iteration, which is what the
    /// collect barrier relies on.
    pub fn dispatch(&self, buckets: Vec<Vec<Configuration<T>>>) {
        assert_eq!(
            buckets.len(),
            self.workers.len(),
            "bucket count must match worker count"
        );
        for (worker, bucket) in self.workers.iter().zip(buckets) {
            worker
                .input
                .send(WorkerRequest::Batch(bucket))
                .expect("worker input channel closed");
        }
    }

    /// Wait for every worker's report for the current dispatch.
    pub fn collect(&self) -> Vec<WorkerReport<T>> {
        self.workers
            .iter()
            .enumerate()
            .map(|(slot, worker)| loop {
                match worker.output.recv_timeout(HANDOFF_WAIT) {
                    Ok(report) => break report,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => {
                        panic!("worker {slot} exited before reporting")
                    }
                }
            })
            .collect()
    }

    /// Signal termination and join every worker.
    pub fn shutdown(self) {
        for worker in &self.workers {
            // A worker that already died took its receiver with it;
            // the join below surfaces that.
            let _ = worker.input.send(WorkerRequest::Terminate);
        }
        for worker in self.workers {
            if worker.thread.join().is_err() {
                panic!("worker thread panicked");
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop<T: NarrowFloat>(
    slot: usize,
    input: Receiver<WorkerRequest<T>>,
    output: Sender<WorkerReport<T>>,
    kernel: DynKernel<T>,
    k: u64,
    sampler: SamplerKind,
    counter: Arc<PartitionCounter>,
    mut rng: fastrand::Rng,
) {
    loop {
        match input.recv_timeout(HANDOFF_WAIT) {
            Ok(WorkerRequest::Batch(batch)) => {
                let mut best = EvalResults::default();
                let mut best_conf = None;
                for conf in batch {
                    let res = eval(kernel.as_ref(), &conf, k, sampler, &mut rng);
                    counter.add(slot, res.shadow_ops);
                    if res.abs_err > best.abs_err {
                        best = res;
                        best_conf = Some(conf);
                    }
                }
                if output
                    .send(WorkerReport {
                        results: best,
                        conf: best_conf,
                    })
                    .is_err()
                {
                    // Driver went away; nothing left to report to.
                    break;
                }
            }
            Ok(WorkerRequest::Terminate) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::SampledConfig;
    use errforge_bgrt::Variable;
    use errforge_shadow::{BigFloat, Value};

    fn shift_kernel() -> DynKernel<f32> {
        let third = num_bigfloat::ONE / BigFloat::from_f64(3.0);
        Arc::new(move |input: &SampledConfig<f32>| -> SampledConfig<f32> {
            [(0u64, input[&0] + Value::from_shadow(third))]
                .into_iter()
                .collect()
        })
    }

    fn unit_conf() -> Configuration<f32> {
        [(
            0u64,
            Variable::from_bounds(BigFloat::from_f64(0.0), BigFloat::from_f64(1.0)),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn every_worker_reports_even_with_an_empty_bucket() {
        let counter = Arc::new(PartitionCounter::new(3));
        let pool = WorkerPool::spawn(
            3,
            shift_kernel(),
            10,
            SamplerKind::Okay,
            Arc::clone(&counter),
            Some(1),
        );
        pool.dispatch(vec![vec![unit_conf()], Vec::new(), vec![unit_conf()]]);
        let reports = pool.collect();
        assert_eq!(reports.len(), 3);
        assert!(reports[0].conf.is_some());
        assert!(reports[1].conf.is_none());
        assert_eq!(reports[1].results.shadow_ops, 0);
        pool.shutdown();
    }

    #[test]
    fn counter_total_matches_the_work_performed() {
        let counter = Arc::new(PartitionCounter::new(2));
        let pool = WorkerPool::spawn(
            2,
            shift_kernel(),
            25,
            SamplerKind::Okay,
            Arc::clone(&counter),
            Some(2),
        );
        for _ in 0..4 {
            pool.dispatch(vec![vec![unit_conf(); 3], vec![unit_conf(); 3]]);
            let _ = pool.collect();
        }
        pool.shutdown();
        // 4 iterations x 2 workers x 3 configs x 25 runs x 1 op.
        assert_eq!(counter.read(), 600);
    }

    #[test]
    fn pool_survives_multiple_dispatch_rounds() {
        let counter = Arc::new(PartitionCounter::new(1));
        let pool = WorkerPool::spawn(
            1,
            shift_kernel(),
            5,
            SamplerKind::Uniform,
            Arc::clone(&counter),
            None,
        );
        for _ in 0..10 {
            pool.dispatch(vec![vec![unit_conf()]]);
            let reports = pool.collect();
            assert!(reports[0].results.abs_err >= num_bigfloat::ZERO);
        }
        pool.shutdown();
    }
}
