//! Search result types.

use errforge_shadow::BigFloat;
use serde::{Deserialize, Serialize};

/// The worst divergence seen by an evaluation, with its resource use.
///
/// `rel_err` and `correct` belong to the same output entry that
/// produced `abs_err`; `correct` is that entry's shadow value, which
/// downstream scoring divides into binades for ULP reporting.
/// `shadow_ops` is the total operation count charged against a
/// resource budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvalResults {
    pub abs_err: BigFloat,
    pub rel_err: BigFloat,
    pub correct: BigFloat,
    pub shadow_ops: u64,
}

impl Default for EvalResults {
    fn default() -> Self {
        Self {
            abs_err: num_bigfloat::ZERO,
            rel_err: num_bigfloat::ZERO,
            correct: num_bigfloat::ZERO,
            shadow_ops: 0,
        }
    }
}
