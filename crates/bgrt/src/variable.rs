//! Closed intervals over shadow values.

use crate::sampler::SamplerKind;
use errforge_shadow::{BigFloat, NarrowFloat, Value};
use std::ops::{Add, Div, Mul, Sub};

/// A closed interval `[min, max]` whose endpoints are shadow values.
///
/// The ordering invariant `min <= max` (shadow comparison) holds from
/// construction onward. Bisection computes the midpoint once in each
/// precision, so the narrow endpoints follow narrow arithmetic exactly
/// as a traced kernel would.
#[derive(Debug, Clone, Copy)]
pub struct Variable<T: NarrowFloat> {
    min: Value<T>,
    max: Value<T>,
}

impl<T: NarrowFloat> Variable<T> {
    /// Construct from endpoint values. Aborts on an inverted interval;
    /// that is a caller bug, not a runtime condition.
    pub fn new(min: Value<T>, max: Value<T>) -> Self {
        assert!(
            min.high() <= max.high(),
            "inverted interval: min {} > max {}",
            min.high(),
            max.high()
        );
        Self { min, max }
    }

    /// Construct from shadow-precision bounds.
    pub fn from_bounds(min: BigFloat, max: BigFloat) -> Self {
        Self::new(Value::from_shadow(min), Value::from_shadow(max))
    }

    /// The degenerate interval `[value, value]`.
    pub fn point(value: BigFloat) -> Self {
        let v = Value::from_shadow(value);
        Self { min: v, max: v }
    }

    /// Lower endpoint.
    pub fn min(&self) -> Value<T> {
        self.min
    }

    /// Upper endpoint.
    pub fn max(&self) -> Value<T> {
        self.max
    }

    /// Split at the midpoint into `([min, mid], [mid, max])`.
    ///
    /// Both halves share the midpoint value, so joining them at the
    /// boundary reconstructs the original interval exactly.
    pub fn bisect(&self) -> (Variable<T>, Variable<T>) {
        let low_mid = self.min.low() + (self.max.low() - self.min.low()) * T::HALF;
        let shadow_mid =
            self.min.high() + (self.max.high() - self.min.high()) * BigFloat::from_f64(0.5);
        let mid = Value::from_parts(low_mid, shadow_mid);
        (
            Variable {
                min: self.min,
                max: mid,
            },
            Variable {
                min: mid,
                max: self.max,
            },
        )
    }

    /// Draw a point uniformly from the closed interval.
    ///
    /// The draw is made in shadow precision, checked against the
    /// bounds, then rounded to the narrow format and re-widened. The
    /// returned value therefore carries no construction error: a
    /// kernel that performs no arithmetic reports zero divergence.
    ///
    /// A draw outside the interval aborts; the generator cannot
    /// produce one unless the interval itself is malformed.
    pub fn sample(&self, kind: SamplerKind, rng: &mut fastrand::Rng) -> Value<T> {
        let span = self.max.high() - self.min.high();
        let point = self.min.high() + span * kind.unit(rng);
        if point < self.min.high() || point > self.max.high() {
            panic!(
                "sampled point {} outside [{}, {}]",
                point,
                self.min.high(),
                self.max.high()
            );
        }
        Value::from_low(T::narrow(&point))
    }

    /// Interval width `max - min`.
    pub fn size(&self) -> Value<T> {
        self.max - self.min
    }

    /// Interval midpoint `min + (max - min) / 2`.
    pub fn average(&self) -> Value<T> {
        let two = Value::from_f64(2.0);
        self.min + (self.max - self.min) / two
    }

    /// The larger of the endpoint divergences.
    pub fn error(&self) -> BigFloat {
        let lo = self.min.error();
        let hi = self.max.error();
        if lo > hi {
            lo
        } else {
            hi
        }
    }

    fn ordered(a: Value<T>, b: Value<T>) -> Variable<T> {
        if a.high() <= b.high() {
            Variable { min: a, max: b }
        } else {
            Variable { min: b, max: a }
        }
    }
}

// Pointwise interval arithmetic: the operation is applied endpoint to
// endpoint and the result is reordered if the operation inverted it.
macro_rules! variable_pointwise_op {
    ($op:ident, $method:ident) => {
        impl<T: NarrowFloat> $op for Variable<T> {
            type Output = Variable<T>;

            fn $method(self, rhs: Variable<T>) -> Variable<T> {
                Variable::ordered(self.min.$method(rhs.min), self.max.$method(rhs.max))
            }
        }

        impl<T: NarrowFloat> $op<Value<T>> for Variable<T> {
            type Output = Variable<T>;

            fn $method(self, rhs: Value<T>) -> Variable<T> {
                Variable::ordered(self.min.$method(rhs), self.max.$method(rhs))
            }
        }
    };
}

variable_pointwise_op!(Add, add);
variable_pointwise_op!(Sub, sub);
variable_pointwise_op!(Mul, mul);
variable_pointwise_op!(Div, div);
