//! Random-number stream sources.
//!
//! Every source takes ownership of the generator it draws from, so a
//! stream built from a seeded generator is fully reproducible.
//!
//! # Reproducibility
//!
//! For reproducible experiments, use [`create_rng`] with a fixed seed.
//! The underlying algorithm (SmallRng) is deterministic for a given seed
//! on the same platform.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::element::Element;
use crate::error::{Result, StreamError};
use crate::stream::NumStream;

/// Creates a fast, seeded random number generator.
///
/// Uses `SmallRng` (Xoshiro256++) for high performance.
///
/// # Examples
/// ```
/// use u_numstream::{random::create_rng, NumStream};
/// let a = NumStream::<i64>::random_n(create_rng(42), 5).to_vec().unwrap();
/// let b = NumStream::<i64>::random_n(create_rng(42), 5).to_vec().unwrap();
/// assert_eq!(a, b);
/// ```
pub fn create_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

impl<'a, T: Element> NumStream<'a, T> {
    /// Infinite stream of random values: the full range for integers,
    /// `[0, 1)` for floats.
    pub fn random<R>(mut rng: R) -> Self
    where
        R: Rng + Send + 'a,
    {
        Self::generate(move || T::random(&mut rng))
    }

    /// `count` random values, as [`random`](Self::random).
    pub fn random_n<R>(rng: R, count: usize) -> Self
    where
        R: Rng + Send + 'a,
    {
        Self::random(rng).limit(count)
    }

    /// Infinite stream of random values drawn uniformly from
    /// `[origin, bound)`.
    ///
    /// # Errors
    /// [`StreamError::InvalidRange`] if `origin >= bound`, or if float
    /// bounds are not finite or span more than `f64::MAX`.
    pub fn random_range<R>(mut rng: R, origin: T, bound: T) -> Result<Self>
    where
        R: Rng + Send + 'a,
    {
        if !T::is_valid_range(origin, bound) {
            return Err(StreamError::invalid_range(origin, bound));
        }
        Ok(Self::generate(move || T::random_between(&mut rng, origin, bound)))
    }

    /// `count` random values, as [`random_range`](Self::random_range).
    ///
    /// # Examples
    /// ```
    /// use u_numstream::{random::create_rng, NumStream};
    /// let dice = NumStream::random_range_n(create_rng(7), 100, 1, 7).unwrap();
    /// assert!(dice.all_match(|x| (1..7).contains(&x)).unwrap());
    /// ```
    pub fn random_range_n<R>(rng: R, count: usize, origin: T, bound: T) -> Result<Self>
    where
        R: Rng + Send + 'a,
    {
        Ok(Self::random_range(rng, origin, bound)?.limit(count))
    }
}

// ============================================================================
// Tests
// ============================================================================
