//! Uniform-draw strategies for interval sampling.

use errforge_shadow::BigFloat;

/// How a uniform draw in `[0, 1)` is produced.
///
/// The strategies trade statistical resolution for cost; none of them
/// changes the sampling interface. `Okay` quantizes the draw to 24
/// mantissa bits, `Uniform` to 53, and `Accurate` fills 128 bits of
/// the shadow mantissa from two machine words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerKind {
    /// Cheap 32-bit draw, widened into the shadow precision.
    #[default]
    Okay,
    /// 64-bit draw, widened into the shadow precision.
    Uniform,
    /// Two 64-bit draws assembled into a 128-bit uniform.
    Accurate,
}

impl SamplerKind {
    /// Draw once from `[0, 1)`.
    pub fn unit(self, rng: &mut fastrand::Rng) -> BigFloat {
        match self {
            SamplerKind::Okay => BigFloat::from_f32(rng.f32()),
            SamplerKind::Uniform => BigFloat::from_f64(rng.f64()),
            SamplerKind::Accurate => {
                let hi = BigFloat::from_u64(rng.u64(..)) * pow2(-64);
                let lo = BigFloat::from_u64(rng.u64(..)) * pow2(-128);
                hi + lo
            }
        }
    }
}

fn pow2(exp: i32) -> BigFloat {
    BigFloat::from_f64(2.0f64.powi(exp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_strategy_draws_inside_the_unit_interval() {
        let mut rng = fastrand::Rng::with_seed(7);
        for kind in [SamplerKind::Okay, SamplerKind::Uniform, SamplerKind::Accurate] {
            for _ in 0..2000 {
                let u = kind.unit(&mut rng);
                assert!(u >= num_bigfloat::ZERO, "{kind:?} drew {u} below zero");
                assert!(u < num_bigfloat::ONE, "{kind:?} drew {u} at or above one");
            }
        }
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let mut a = fastrand::Rng::with_seed(99);
        let mut b = fastrand::Rng::with_seed(99);
        for _ in 0..100 {
            assert_eq!(
                SamplerKind::Uniform.unit(&mut a),
                SamplerKind::Uniform.unit(&mut b)
            );
        }
    }
}
