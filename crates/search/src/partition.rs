//! Splitting configuration populations into per-worker buckets.

use errforge_bgrt::{BgrtState, Configuration};
use errforge_shadow::NarrowFloat;

/// Distribute `configs` over `num_buckets` buckets round-robin by
/// input index, dropping entries the predicate rejects. The predicate
/// runs exactly once per input.
pub fn partition_configs<T, F>(
    num_buckets: usize,
    configs: Vec<Configuration<T>>,
    mut ok: F,
) -> Vec<Vec<Configuration<T>>>
where
    T: NarrowFloat,
    F: FnMut(&Configuration<T>) -> bool,
{
    assert!(num_buckets > 0, "cannot partition into zero buckets");
    let mut buckets: Vec<Vec<Configuration<T>>> = (0..num_buckets).map(|_| Vec::new()).collect();
    for (index, conf) in configs.into_iter().enumerate() {
        if ok(&conf) {
            buckets[index % num_buckets].push(conf);
        }
    }
    buckets
}

/// Draw one successor population of `iterations / num_buckets`
/// partitions per bucket, filtered through the predicate.
pub fn partition_next_gen<T, F>(
    num_buckets: usize,
    iterations: u64,
    state: &BgrtState<T>,
    rng: &mut fastrand::Rng,
    mut ok: F,
) -> Vec<Vec<Configuration<T>>>
where
    T: NarrowFloat,
    F: FnMut(&Configuration<T>) -> bool,
{
    assert!(num_buckets > 0, "cannot partition into zero buckets");
    let per_bucket = iterations / num_buckets as u64;
    let mut buckets = Vec::with_capacity(num_buckets);
    for _ in 0..num_buckets {
        let mut bucket = Vec::new();
        for conf in state.next_gen(per_bucket, rng) {
            if ok(&conf) {
                bucket.push(conf);
            }
        }
        buckets.push(bucket);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use errforge_bgrt::Variable;
    use errforge_shadow::BigFloat;

    fn single_var_conf(width: f64) -> Configuration<f32> {
        [(
            0u64,
            Variable::from_bounds(BigFloat::from_f64(0.0), BigFloat::from_f64(width)),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn round_robin_by_input_index() {
        let configs: Vec<Configuration<f32>> =
            (0..7).map(|i| single_var_conf(i as f64 + 1.0)).collect();
        let buckets = partition_configs(3, configs, |_| true);
        assert_eq!(buckets[0].len(), 3);
        assert_eq!(buckets[1].len(), 2);
        assert_eq!(buckets[2].len(), 2);
    }

    #[test]
    fn rejected_entries_keep_their_index_slot() {
        let configs: Vec<Configuration<f32>> =
            (0..6).map(|i| single_var_conf(i as f64 + 1.0)).collect();
        // Reject widths under 4: indices 0..3 drop out.
        let buckets = partition_configs(2, configs, |conf| {
            conf[&0].size().high() >= BigFloat::from_f64(4.0)
        });
        // Survivors are inputs 3, 4, 5 at their original parity.
        assert_eq!(buckets[0].len(), 1);
        assert_eq!(buckets[1].len(), 2);
    }

    #[test]
    fn predicate_runs_once_per_input() {
        let configs: Vec<Configuration<f32>> = (0..10).map(|_| single_var_conf(1.0)).collect();
        let mut calls = 0;
        let _ = partition_configs(4, configs, |_| {
            calls += 1;
            true
        });
        assert_eq!(calls, 10);
    }

    #[test]
    fn next_gen_form_draws_one_population_per_bucket() {
        let state = BgrtState::new(single_var_conf(2.0));
        let mut rng = fastrand::Rng::with_seed(8);
        let buckets = partition_next_gen(4, 8, &state, &mut rng, |_| true);
        assert_eq!(buckets.len(), 4);
        for bucket in &buckets {
            // iterations / buckets = 2 partitions -> 2 + 2*2 successors.
            assert_eq!(bucket.len(), 6);
        }
    }
}
