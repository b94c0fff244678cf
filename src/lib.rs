//! Scatter/gather indexing and in-place mutation semantics for immutable
//! array backends.
//!
//! The backend arrays never change once built. Operations that look like
//! mutation (scatters with an output tensor, [`inplace::inplace_update()`]
//! and friends) compute a fresh array and rebind the data slot of the
//! framework-owned [`Tensor`](tensor::Tensor) that held the old one.
//!
//! ```
//! use tensorshim::{backend::Reduction, ops, tensor};
//!
//! let indices = tensor![0_i64, 2];
//! let updates = tensor![5.0, 3.0];
//! let mut out = tensor![1.0, 1.0, 1.0];
//!
//! let _ = ops::scatter_flat(
//!     &indices,
//!     &updates,
//!     None,
//!     Reduction::Sum,
//!     Some(&mut out),
//! )?;
//!
//! assert_eq!(out, tensor![6.0, 1.0, 4.0]);
//! # Ok::<(), tensorshim::Error>(())
//! ```

#[cfg(test)]
use proptest as _;

pub mod backend;
pub mod config;
pub mod error;
pub mod inplace;
pub mod ops;
pub mod shape;
pub mod tensor;
pub mod value;

pub use error::{Error, Result};
