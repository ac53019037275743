//! BGRT working state and successor-population generation.

use crate::variable::Variable;
use errforge_shadow::NarrowFloat;
use std::collections::BTreeMap;

/// A mapping from variable identifier to its interval.
///
/// Keys are intrinsic to the caller's problem (array positions).
/// Iteration order is not part of the contract; the ordered map makes
/// seeded runs reproducible.
pub type Configuration<T> = BTreeMap<u64, Variable<T>>;

/// The working configuration of a search, plus the combinators that
/// derive successor populations from it.
///
/// Only the driver mutates the state, and only through [`set_vals`].
///
/// [`set_vals`]: BgrtState::set_vals
#[derive(Debug, Clone)]
pub struct BgrtState<T: NarrowFloat> {
    vals: Configuration<T>,
}

impl<T: NarrowFloat> BgrtState<T> {
    pub fn new(vals: Configuration<T>) -> Self {
        Self { vals }
    }

    /// The current working configuration.
    pub fn vals(&self) -> &Configuration<T> {
        &self.vals
    }

    /// Replace the working configuration. No other side effect.
    pub fn set_vals(&mut self, vals: Configuration<T>) {
        self.vals = vals;
    }

    /// Bisect every interval, producing the all-lower and all-upper
    /// halves. Both outputs have the same key set as the input.
    pub fn half_configs(conf: &Configuration<T>) -> (Configuration<T>, Configuration<T>) {
        let mut lower = Configuration::new();
        let mut upper = Configuration::new();
        for (&key, var) in conf {
            let (lo, hi) = var.bisect();
            lower.insert(key, lo);
            upper.insert(key, hi);
        }
        (lower, upper)
    }

    /// Merge two configurations; for keys present in both, the right
    /// side wins.
    pub fn union_configurations(
        left: &Configuration<T>,
        right: &Configuration<T>,
    ) -> Configuration<T> {
        let mut merged = left.clone();
        for (&key, var) in right {
            merged.insert(key, *var);
        }
        merged
    }

    /// Split the working configuration into two key-disjoint halves,
    /// assigning each entry by a fair coin flip.
    pub fn part_conf(&self, rng: &mut fastrand::Rng) -> (Configuration<T>, Configuration<T>) {
        let mut first = Configuration::new();
        let mut second = Configuration::new();
        for (&key, var) in &self.vals {
            if rng.bool() {
                first.insert(key, *var);
            } else {
                second.insert(key, *var);
            }
        }
        (first, second)
    }

    /// Produce the successor population: the two halves of the working
    /// configuration, then for each of `n_part` random partitions the
    /// two cross-combinations "half-up here, half-down there".
    ///
    /// The population has `2 + 2 * n_part` entries, each with the full
    /// key set: the partition halves are key-disjoint and jointly
    /// cover the working configuration, so their unions restore every
    /// key.
    pub fn next_gen(&self, n_part: u64, rng: &mut fastrand::Rng) -> Vec<Configuration<T>> {
        let mut next = Vec::with_capacity(2 + 2 * n_part as usize);

        let (lower, upper) = Self::half_configs(&self.vals);
        next.push(lower);
        next.push(upper);

        for _ in 0..n_part {
            let (ax, ay) = self.part_conf(rng);
            let (cx_lo, cx_hi) = Self::half_configs(&ax);
            let (cy_lo, cy_hi) = Self::half_configs(&ay);
            next.push(Self::union_configurations(&cx_lo, &cy_hi));
            next.push(Self::union_configurations(&cx_hi, &cy_lo));
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use errforge_shadow::BigFloat;

    fn box_conf(vars: u64) -> Configuration<f32> {
        (0..vars)
            .map(|key| {
                (
                    key,
                    Variable::from_bounds(BigFloat::from_f64(-1.0), BigFloat::from_f64(1.0)),
                )
            })
            .collect()
    }

    #[test]
    fn next_gen_preserves_the_key_set() {
        let conf = box_conf(9);
        let state = BgrtState::new(conf.clone());
        let mut rng = fastrand::Rng::with_seed(21);
        let population = state.next_gen(5, &mut rng);
        assert_eq!(population.len(), 12);
        for successor in &population {
            let keys: Vec<u64> = successor.keys().copied().collect();
            let expected: Vec<u64> = conf.keys().copied().collect();
            assert_eq!(keys, expected);
        }
    }

    #[test]
    fn part_conf_halves_are_disjoint_and_cover() {
        let state = BgrtState::new(box_conf(32));
        let mut rng = fastrand::Rng::with_seed(13);
        let (first, second) = state.part_conf(&mut rng);
        assert_eq!(first.len() + second.len(), 32);
        for key in first.keys() {
            assert!(!second.contains_key(key));
        }
    }

    #[test]
    fn union_prefers_the_right_side() {
        let narrow = Variable::<f32>::from_bounds(BigFloat::from_f64(0.0), BigFloat::from_f64(0.5));
        let wide = Variable::<f32>::from_bounds(BigFloat::from_f64(0.0), BigFloat::from_f64(2.0));
        let left: Configuration<f32> = [(1u64, narrow)].into_iter().collect();
        let right: Configuration<f32> = [(1u64, wide)].into_iter().collect();
        let merged = BgrtState::union_configurations(&left, &right);
        assert_eq!(merged[&1].max(), wide.max());
    }

    #[test]
    fn halves_reunite_into_the_original_bounds() {
        let conf = box_conf(4);
        let (lower, upper) = BgrtState::half_configs(&conf);
        for (key, var) in &conf {
            assert_eq!(lower[key].min(), var.min());
            assert_eq!(upper[key].max(), var.max());
            assert_eq!(lower[key].max(), upper[key].min());
        }
        // The union over the same key set yields one half per key.
        let merged = BgrtState::union_configurations(&lower, &upper);
        for (key, var) in &merged {
            assert_eq!(var.min(), upper[key].min());
            assert_eq!(var.max(), conf[key].max());
        }
    }

    #[test]
    fn empty_configuration_yields_empty_successors() {
        let state = BgrtState::<f32>::new(Configuration::new());
        let mut rng = fastrand::Rng::with_seed(1);
        let population = state.next_gen(3, &mut rng);
        assert_eq!(population.len(), 8);
        assert!(population.iter().all(BTreeMap::is_empty));
    }
}
