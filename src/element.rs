//! The numeric kinds a [`NumStream`](crate::NumStream) can carry.
//!
//! Three kinds are supported: `i32` ("int"), `i64` ("long") and `f64`
//! ("double"). The trait is sealed; everything kind-specific that the
//! stream operations need lives here.
//!
//! # Float semantics
//!
//! - Ordering (`sorted`, `reverse_sorted`) follows [`f64::total_cmp`]
//!   for non-NaN values, so `-0.0` sorts before `0.0`. Every NaN, whatever
//!   its sign or payload, sorts last and compares equal to other NaNs.
//! - `min`/`max` propagate NaN: if any element is NaN the result is NaN.
//! - `distinct` compares bit patterns, with every NaN treated as the same
//!   value.

use std::cmp::Ordering;
use std::fmt;

use rand::Rng;

use crate::stats::{CompensatedSum, Summation, WideSum};

mod sealed {
    pub trait Sealed {}

    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
}

/// A numeric element kind.
pub trait Element:
    Copy + PartialEq + fmt::Debug + Send + Sync + sealed::Sealed + 'static
{
    /// Accumulator used by `sum`, `average` and summary statistics.
    type Sum: Summation<Self>;

    /// Human-readable kind name, used in logs and `Display` output.
    const KIND: &'static str;

    /// Lossy conversion used for averages and variance.
    fn to_f64(self) -> f64;

    /// Natural ascending order.
    fn compare(&self, other: &Self) -> Ordering;

    /// Key under which `distinct` considers two elements equal.
    fn identity_bits(self) -> u64;

    /// The smaller of two elements.
    fn lesser(self, other: Self) -> Self;

    /// The larger of two elements.
    fn greater(self, other: Self) -> Self;

    /// Draws one value: the full range for integers, `[0, 1)` for floats.
    fn random<R: Rng>(rng: &mut R) -> Self;

    /// Draws one value uniformly from `[origin, bound)`.
    ///
    /// The caller must have checked [`is_valid_range`](Element::is_valid_range).
    fn random_between<R: Rng>(rng: &mut R, origin: Self, bound: Self) -> Self;

    /// Whether `[origin, bound)` is a non-empty range that can be sampled.
    fn is_valid_range(origin: Self, bound: Self) -> bool;
}

impl Element for i32 {
    type Sum = WideSum;

    const KIND: &'static str = "Int";

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn identity_bits(self) -> u64 {
        i64::from(self) as u64
    }

    fn lesser(self, other: Self) -> Self {
        self.min(other)
    }

    fn greater(self, other: Self) -> Self {
        self.max(other)
    }

    fn random<R: Rng>(rng: &mut R) -> Self {
        rng.random()
    }

    fn random_between<R: Rng>(rng: &mut R, origin: Self, bound: Self) -> Self {
        rng.random_range(origin..bound)
    }

    fn is_valid_range(origin: Self, bound: Self) -> bool {
        origin < bound
    }
}

impl Element for i64 {
    type Sum = WideSum;

    const KIND: &'static str = "Long";

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn identity_bits(self) -> u64 {
        self as u64
    }

    fn lesser(self, other: Self) -> Self {
        self.min(other)
    }

    fn greater(self, other: Self) -> Self {
        self.max(other)
    }

    fn random<R: Rng>(rng: &mut R) -> Self {
        rng.random()
    }

    fn random_between<R: Rng>(rng: &mut R, origin: Self, bound: Self) -> Self {
        rng.random_range(origin..bound)
    }

    fn is_valid_range(origin: Self, bound: Self) -> bool {
        origin < bound
    }
}

impl Element for f64 {
    type Sum = CompensatedSum;

    const KIND: &'static str = "Double";

    fn to_f64(self) -> f64 {
        self
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self.is_nan(), other.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.total_cmp(other),
        }
    }

    fn identity_bits(self) -> u64 {
        if self.is_nan() {
            f64::NAN.to_bits()
        } else {
            self.to_bits()
        }
    }

    fn lesser(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            f64::NAN
        } else if other.total_cmp(&self) == Ordering::Less {
            other
        } else {
            self
        }
    }

    fn greater(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            f64::NAN
        } else if other.total_cmp(&self) == Ordering::Greater {
            other
        } else {
            self
        }
    }

    fn random<R: Rng>(rng: &mut R) -> Self {
        rng.random()
    }

    fn random_between<R: Rng>(rng: &mut R, origin: Self, bound: Self) -> Self {
        let r = origin + rng.random::<f64>() * (bound - origin);
        if r < bound {
            r
        } else {
            next_down(bound)
        }
    }

    fn is_valid_range(origin: Self, bound: Self) -> bool {
        origin < bound && (bound - origin).is_finite()
    }
}

/// Largest `f64` strictly below a finite `x`.
fn next_down(x: f64) -> f64 {
    if x == 0.0 {
        -f64::from_bits(1)
    } else if x > 0.0 {
        f64::from_bits(x.to_bits() - 1)
    } else {
        f64::from_bits(x.to_bits() + 1)
    }
}
