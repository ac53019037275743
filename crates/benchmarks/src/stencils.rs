//! Stencil kernels for the error-search harness.
//!
//! These mirror the classic BGRT benchmark set: balanced and
//! left-to-right sums over a box of inputs, and a 3-D Poisson
//! operator evaluated at the center of a 3x3x3 cell block.

use errforge_search::{Kernel, SampledConfig};
use errforge_shadow::{NarrowFloat, Value};

/// Sum of `points` coefficient-1 terms, combined the way the
/// balanced stencils write it: terms pair off two at a time and a
/// running total absorbs one pair-sum after another, with any odd
/// term trailing at the end.
///
/// The nine-point variant follows the 3x3 block's neighbor
/// enumeration around the center cell, so its operation order is the
/// classic benchmark's, term for term. Other point counts chain the
/// same shape over ascending keys.
pub struct BalancedSum {
    pub points: u64,
}

/// Center first, then opposing neighbors of the 3x3 block pair by
/// pair: cells [4, 7, 1, 8, 2, 6, 0, 5, 3].
fn nine_point_order() -> [u64; 9] {
    let at = |i: i64, j: i64| (i + 3 * j) as u64;
    let (i, j) = (1i64, 1);
    [
        at(i, j),
        at(i, j + 1),
        at(i, j - 1),
        at(i + 1, j + 1),
        at(i + 1, j - 1),
        at(i - 1, j + 1),
        at(i - 1, j - 1),
        at(i + 1, j),
        at(i - 1, j),
    ]
}

impl BalancedSum {
    fn term_order(&self) -> Vec<u64> {
        if self.points == 9 {
            nine_point_order().to_vec()
        } else {
            (0..self.points).collect()
        }
    }
}

impl<T: NarrowFloat> Kernel<T> for BalancedSum {
    fn run(&self, input: &SampledConfig<T>) -> SampledConfig<T> {
        let coeff = Value::from_f64(1.0);
        let order = self.term_order();

        let mut total: Option<Value<T>> = None;
        for pair in order.chunks(2) {
            let mut sum = coeff * input[&pair[0]];
            if let Some(&key) = pair.get(1) {
                sum = sum + coeff * input[&key];
            }
            total = Some(match total {
                Some(acc) => acc + sum,
                None => sum,
            });
        }

        let center = order.first().copied().unwrap_or(0);
        [(center, total.unwrap_or_else(Value::zero))]
            .into_iter()
            .collect()
    }
}

/// Left-to-right sum of `points` coefficient-1 terms. The skewed
/// addition chain accumulates error faster than the balanced tree.
pub struct LtrSum {
    pub points: u64,
}

impl<T: NarrowFloat> Kernel<T> for LtrSum {
    fn run(&self, input: &SampledConfig<T>) -> SampledConfig<T> {
        let coeff = Value::from_f64(1.0);
        let mut acc = Value::zero();
        for key in 0..self.points {
            acc += coeff * input[&key];
        }
        [(0u64, acc)].into_iter().collect()
    }
}

/// 19-point Poisson operator on the center cell of a 3x3x3 block,
/// evaluated left to right: 2.666 on the center, -0.166 on the six
/// face neighbors, -0.0833 on the twelve edge neighbors.
pub struct LtrPoisson;

/// Variables for the Poisson stencil: one per cell of the block.
pub const POISSON_POINTS: u64 = 27;

fn cell(i: i64, j: i64, k: i64) -> u64 {
    (i + 3 * j + 9 * k) as u64
}

impl<T: NarrowFloat> Kernel<T> for LtrPoisson {
    fn run(&self, input: &SampledConfig<T>) -> SampledConfig<T> {
        let center = Value::from_f64(2.666);
        let face = Value::from_f64(0.166);
        let edge = Value::from_f64(0.0833);

        let (i, j, k) = (1i64, 1, 1);
        let mut acc = center * input[&cell(i, j, k)];

        let faces = [
            cell(i, j, k - 1),
            cell(i, j, k + 1),
            cell(i, j - 1, k),
            cell(i, j + 1, k),
            cell(i + 1, j, k),
            cell(i - 1, j, k),
        ];
        for key in faces {
            acc = acc - face * input[&key];
        }

        let edges = [
            cell(i, j - 1, k - 1),
            cell(i, j - 1, k + 1),
            cell(i, j + 1, k - 1),
            cell(i, j + 1, k + 1),
            cell(i - 1, j, k - 1),
            cell(i - 1, j, k + 1),
            cell(i - 1, j - 1, k),
            cell(i - 1, j + 1, k),
            cell(i + 1, j, k - 1),
            cell(i + 1, j, k + 1),
            cell(i + 1, j - 1, k),
            cell(i + 1, j + 1, k),
        ];
        for key in edges {
            acc = acc - edge * input[&key];
        }

        [(cell(i, j, k), acc)].into_iter().collect()
    }
}
