//! The low-precision side of a shadow pair.

use num_bigfloat::BigFloat;
use std::fmt::{Debug, Display};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A floating-point format narrow enough to be shadowed.
///
/// Implemented for `f32` and `f64` only. The shadow mantissa is 132
/// bits wide, so both implementors are strictly narrower than their
/// shadow and a pairing of equal widths cannot be constructed.
pub trait NarrowFloat:
    Copy
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Display
    + Debug
    + Send
    + Sync
    + 'static
{
    /// Total encoding width in bits.
    const BITS: u32;
    /// Machine epsilon of the narrow format.
    const EPSILON: Self;
    /// One half, exact in every binary format.
    const HALF: Self;
    /// Additive identity.
    const ZERO: Self;

    /// Exact conversion into the shadow precision.
    fn widen(self) -> BigFloat;

    /// Round a shadow-precision value to the narrow format.
    fn narrow(value: &BigFloat) -> Self;
}

impl NarrowFloat for f32 {
    const BITS: u32 = 32;
    const EPSILON: Self = f32::EPSILON;
    const HALF: Self = 0.5;
    const ZERO: Self = 0.0;

    fn widen(self) -> BigFloat {
        BigFloat::from_f32(self)
    }

    fn narrow(value: &BigFloat) -> Self {
        value.to_f32()
    }
}

impl NarrowFloat for f64 {
    const BITS: u32 = 64;
    const EPSILON: Self = f64::EPSILON;
    const HALF: Self = 0.5;
    const ZERO: Self = 0.0;

    fn widen(self) -> BigFloat {
        BigFloat::from_f64(self)
    }

    fn narrow(value: &BigFloat) -> Self {
        value.to_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_narrow_roundtrip_is_exact() {
        for x in [0.0f32, 1.0, -1.0, 0.333_333_34, f32::EPSILON] {
            assert_eq!(f32::narrow(&x.widen()), x);
        }
        for x in [0.0f64, 1.0, -1.0, 1.0 / 3.0, f64::EPSILON] {
            assert_eq!(f64::narrow(&x.widen()), x);
        }
    }

    #[test]
    fn narrowing_a_wide_third_rounds() {
        let third = num_bigfloat::ONE / BigFloat::from_f64(3.0);
        let narrowed = f32::narrow(&third);
        // The rounded value widens back to something other than the
        // original shadow quantity.
        assert_ne!(narrowed.widen(), third);
    }
}
