//! # parmap - Fan-out/Fan-in Parallel Map
//!
//! A generic parallel-map primitive: apply a fallible transformation to every
//! item of an ordered sequence concurrently, and get back an ordered result
//! vector plus a structured report of which indices failed and why.
//!
//! ## Guarantees
//!
//! - The output vector always has the same length as the input, no matter how
//!   many items fail; failed slots hold the output type's [`Default`] value.
//! - A per-item failure never aborts the other items. Every item runs to
//!   completion and every failure is captured in the returned [`ErrMap`],
//!   keyed by original input index.
//! - No item is skipped, double-processed, or reordered.
//! - The aggregate error renders deterministically (ascending index order)
//!   even though item completion order is not deterministic.
//!
//! ## Quick Start
//!
//! ```rust
//! use parmap::try_map;
//!
//! let inputs: Vec<i64> = (1..=20).collect();
//! let (results, failed) = try_map(inputs, |i| Ok::<_, String>(i * 5));
//!
//! assert_eq!(results.first(), Some(&5));
//! assert_eq!(results.last(), Some(&100));
//! assert!(failed.is_none());
//! ```
//!
//! ### Handling Failures
//!
//! Failures come back as an [`ErrMap`] keyed by input position. It renders as
//! one `"<index>: <error>"` line per failure, sorted by index, and implements
//! [`std::error::Error`] when its entries do:
//!
//! ```rust
//! use parmap::try_map;
//!
//! let (results, failed) = try_map(vec![1, 2, 3, 4, 5, 6], |i| {
//!     if i % 3 == 0 {
//!         Err(format!("error {i}"))
//!     } else {
//!         Ok(i)
//!     }
//! });
//!
//! assert_eq!(results, vec![1, 2, 0, 4, 5, 0]);
//! let failed = failed.expect("two items fail");
//! assert_eq!(failed.join(), "2: error 3\n5: error 6");
//! ```
//!
//! ### Bounding Concurrency
//!
//! By default one worker thread is spawned per input item, which is simple
//! but scales linearly with input size. For large batches, run a fixed pool
//! instead; the ordering and isolation guarantees are identical:
//!
//! ```rust
//! use parmap::{try_map_with, MapConfig};
//!
//! let inputs: Vec<u32> = (0..500).collect();
//! let (out, failed) =
//!     try_map_with(inputs, |n| Ok::<_, String>(n * n), MapConfig::with_workers(8));
//!
//! assert_eq!(out.len(), 500);
//! assert!(failed.is_none());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! caller -> dispatcher -> workers -> result collector -> output vector
//!                                 \-> error collector  -> error map
//! ```
//!
//! The dispatcher streams index-tagged inputs to the workers over a
//! rendezvous channel. Each worker applies the transform once per item and
//! routes the outcome to one of two collector threads; each collector is the
//! sole owner of the structure it writes, so neither needs a lock. The caller
//! blocks on a counted completion barrier (one signal per item) and reads the
//! structures only after both collectors have been joined.
//!
//! There is no retry, cancellation, or timeout support: a transform that
//! never returns hangs the call.

/// Version of the parmap crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod executor;

pub use error::{ErrMap, IndexedError};
pub use executor::{try_map, try_map_with, MapConfig};
