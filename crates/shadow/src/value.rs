//! Paired low/high-precision scalar with operation counting.

use crate::narrow::NarrowFloat;
use num_bigfloat::BigFloat;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// A numerical sample traced in two precisions at once.
///
/// Every arithmetic operation is applied to the narrow operand in the
/// narrow format and to the shadow in shadow precision, so the two
/// fields drift apart exactly as much as the narrow format's rounding
/// allows. The operation count rides along: a pure operation returns a
/// fresh value whose count is the receiver's count plus one, and a
/// compound assignment bumps the receiver by one. The count is the
/// resource unit charged against a search budget.
///
/// Comparison is defined on the shadow alone.
#[derive(Debug, Clone, Copy)]
pub struct Value<T: NarrowFloat> {
    low: T,
    shadow: BigFloat,
    ops: u64,
}

impl<T: NarrowFloat> Value<T> {
    /// The zero value.
    pub fn zero() -> Self {
        Self {
            low: T::ZERO,
            shadow: num_bigfloat::ZERO,
            ops: 0,
        }
    }

    /// Construct from a shadow-precision quantity; the narrow field is
    /// the rounded rendition. This is the default way literals enter a
    /// kernel.
    pub fn from_shadow(shadow: BigFloat) -> Self {
        Self {
            low: T::narrow(&shadow),
            shadow,
            ops: 0,
        }
    }

    /// Construct from a narrow quantity; the shadow is its exact
    /// widening, so the value carries no error.
    pub fn from_low(low: T) -> Self {
        Self {
            low,
            shadow: low.widen(),
            ops: 0,
        }
    }

    /// Construct from independently computed fields.
    ///
    /// Used where the two precisions legitimately follow different
    /// arithmetic, e.g. an interval midpoint computed once in each
    /// format.
    pub fn from_parts(low: T, shadow: BigFloat) -> Self {
        Self {
            low,
            shadow,
            ops: 0,
        }
    }

    /// Convenience constructor from an `f64` literal.
    pub fn from_f64(value: f64) -> Self {
        Self::from_shadow(BigFloat::from_f64(value))
    }

    /// The narrow operand.
    pub fn low(&self) -> T {
        self.low
    }

    /// The high-precision shadow.
    pub fn high(&self) -> BigFloat {
        self.shadow
    }

    /// Operations applied since this value was constructed.
    pub fn ops(&self) -> u64 {
        self.ops
    }

    /// Absolute divergence `|shadow - low|`, in shadow precision.
    pub fn error(&self) -> BigFloat {
        (self.shadow - self.low.widen()).abs()
    }

    /// Relative divergence `error() / |shadow|`.
    ///
    /// A zero shadow would divide by zero; the divergence itself is
    /// returned instead.
    pub fn rel_error(&self) -> BigFloat {
        let err = self.error();
        if self.shadow == num_bigfloat::ZERO {
            err
        } else {
            err / self.shadow.abs()
        }
    }
}

macro_rules! value_binary_op {
    ($op:ident, $method:ident, $assign:ident, $assign_method:ident) => {
        impl<T: NarrowFloat> $op for Value<T> {
            type Output = Value<T>;

            fn $method(self, rhs: Value<T>) -> Value<T> {
                Value {
                    low: self.low.$method(rhs.low),
                    shadow: self.shadow.$method(rhs.shadow),
                    ops: self.ops + 1,
                }
            }
        }

        impl<T: NarrowFloat> $assign for Value<T> {
            fn $assign_method(&mut self, rhs: Value<T>) {
                self.low = self.low.$method(rhs.low);
                self.shadow = self.shadow.$method(rhs.shadow);
                self.ops += 1;
            }
        }
    };
}

value_binary_op!(Add, add, AddAssign, add_assign);
value_binary_op!(Sub, sub, SubAssign, sub_assign);
value_binary_op!(Mul, mul, MulAssign, mul_assign);
value_binary_op!(Div, div, DivAssign, div_assign);

impl<T: NarrowFloat> Neg for Value<T> {
    type Output = Value<T>;

    fn neg(self) -> Value<T> {
        Value {
            low: -self.low,
            shadow: -self.shadow,
            ops: self.ops + 1,
        }
    }
}

impl<T: NarrowFloat> PartialEq for Value<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shadow == other.shadow
    }
}

impl<T: NarrowFloat> PartialOrd for Value<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.shadow.partial_cmp(&other.shadow)
    }
}

impl<T: NarrowFloat> fmt::Display for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.low)
    }
}
