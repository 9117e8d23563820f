//! # u-numstream
//!
//! Lazy, single-use numeric streams for the U-Engine ecosystem.
//!
//! A [`NumStream`] carries `i32`, `i64` or `f64` elements through a chain
//! of deferred stages (`map`, `filter`, `distinct`, keyed sorts,
//! `prepend`/`append`, `limit`, …) and evaluates them only when a terminal
//! operation (`to_vec`, `sum`, `summary_statistics`, `find_first`, …) pulls
//! from the end of the chain.
//!
//! ```
//! use u_numstream::NumStream;
//!
//! let v = NumStream::range(0, 9)
//!     .sorted_by_int(|i| i % 3 * 3 + i / 3)
//!     .to_vec()
//!     .unwrap();
//! assert_eq!(v, vec![0, 3, 6, 1, 4, 7, 2, 5, 8]);
//! ```
//!
//! ## Modules
//!
//! - [`stream`]: the stream type, its factories and operations
//! - [`element`]: the supported numeric kinds
//! - [`stats`]: compensated sums and one-pass summary statistics
//! - [`random`]: seeded generators and random-number sources
//! - [`sort`]: keyed stable sorting with one key evaluation per element
//! - [`config`]: sequential/parallel evaluation settings
//! - [`error`]: the crate error type
//!
//! ## Design Philosophy
//!
//! - **Laziness**: infinite sources are never materialized; `limit` stops
//!   pulling upstream
//! - **Single use by construction**: operations consume the stream
//! - **Numerical stability**: Neumaier summation for floats, Welford
//!   variance
//! - **Property-based testing**: stream laws verified via proptest

mod close;
pub mod config;
pub mod element;
pub mod error;
mod indices;
pub mod random;
pub mod sort;
pub mod stats;
pub mod stream;

pub use config::StreamConfig;
pub use element::Element;
pub use error::{Result, StreamError};
pub use stats::SummaryStatistics;
pub use stream::{NumStream, StreamIter};
