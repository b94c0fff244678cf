//! The generic computational backend.
//!
//! This module provides the [`Backend`] trait which defines the complete
//! contract an array engine must fulfill to be driven by the framework:
//! creation, arithmetic, gather/scatter and device placement.
//!
//! The default backend is [`ndarray`] and can be swapped out using crate
//! feature flags.

use core::{fmt, str::FromStr};

use crate::error::{Error, Result};

pub mod ndarray;

/// How several updates landing on the same position are combined by a
/// scatter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reduction {
    /// Accumulate updates on top of the target.
    #[default]
    Sum,
    /// Overwrite the target; the last update in row-major order wins.
    Replace,
    /// Keep the smallest value.
    Min,
    /// Keep the largest value.
    Max,
}

impl Reduction {
    /// The name accepted by [`Reduction::from_str()`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Replace => "replace",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for Reduction {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reduction {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "sum" => Ok(Self::Sum),
            "replace" => Ok(Self::Replace),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(Error::InvalidReduction {
                received: other.to_owned(),
            }),
        }
    }
}

/// Positions addressed by a multi-axis scatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScatterIndices<I> {
    /// Every position of the target, like indexing with `...`.
    All,
    /// A single coordinate into the first axis.
    Scalar(i64),
    /// An index array whose last axis enumerates coordinates.
    Array(I),
}

impl<I> ScatterIndices<I> {
    /// Borrows the index array, if any.
    pub const fn as_ref(&self) -> ScatterIndices<&I> {
        match self {
            Self::All => ScatterIndices::All,
            Self::Scalar(index) => ScatterIndices::Scalar(*index),
            Self::Array(indices) => ScatterIndices::Array(indices),
        }
    }

    /// Converts the index array, if any, with `f`.
    pub fn map<J>(self, f: impl FnOnce(I) -> J) -> ScatterIndices<J> {
        match self {
            Self::All => ScatterIndices::All,
            Self::Scalar(index) => ScatterIndices::Scalar(index),
            Self::Array(indices) => ScatterIndices::Array(f(indices)),
        }
    }
}

impl<I> From<I> for ScatterIndices<I> {
    #[inline]
    fn from(value: I) -> Self {
        Self::Array(value)
    }
}

/// A trait that defines the contract for tensor operations that every
/// backend must fulfill.
///
/// The `Backend` trait is the core abstraction of the tensor module. It
/// provides a generic interface for tensor creation, manipulation, and
/// computation. By implementing this trait, different computation libraries
/// (like [`ndarray`] or `nalgebra`) can be used as the underlying engine for
/// tensor operations. This allows for flexibility and performance tuning
/// by switching backends through feature flags. All functions are pure:
/// no argument is ever modified, a new tensor is returned instead.
///
/// Some methods in this trait are marked `unsafe` because they do not perform
/// any invariant checks (e.g., for shape compatibility). The caller (typically
/// the [`Tensor`](crate::tensor::Tensor) wrapper) is responsible for ensuring
/// all preconditions are met before calling these functions. The indexing
/// operations validate their own arguments and report problems through
/// [`Error`].
pub trait Backend {
    /// The element type stored in tensors.
    type Primitive;

    /// The concrete tensor representation provided by the backend.
    type Tensor;

    /// The integer tensor used to address positions.
    type Indices;

    /// Name reported to the framework for this backend.
    const NAME: &'static str;

    /// Adds two tensors element-wise, broadcasting their shapes.
    ///
    /// # Safety
    ///
    /// The caller must ensure the two shapes broadcast against each other.
    unsafe fn add(lhs: &Self::Tensor, rhs: &Self::Tensor) -> Self::Tensor;

    /// Returns `true` when both tensors have the same shape and elements.
    fn array_equal(lhs: &Self::Tensor, rhs: &Self::Tensor) -> bool;

    /// Builds a tensor from row-major data.
    ///
    /// # Safety
    ///
    /// The caller must ensure `data.len()` equals the product of `shape`.
    unsafe fn from_vec(
        data: Vec<Self::Primitive>,
        shape: &[usize],
    ) -> Self::Tensor;

    /// Selects slices of `params` along `axis` at `indices`.
    ///
    /// With `batch_dims > 0` the leading `batch_dims` axes of `params` and
    /// `indices` are paired up and gathered independently. The output shape
    /// is `params.shape[..axis] ++ indices.shape[batch_dims..] ++
    /// params.shape[axis + 1..]`.
    ///
    /// # Errors
    ///
    /// Fails when the axis or any index is out of range, or the batch axes
    /// disagree.
    fn gather(
        params: &Self::Tensor,
        indices: &Self::Indices,
        axis: isize,
        batch_dims: usize,
    ) -> Result<Self::Tensor>;

    /// Gathers the trailing blocks of `params` addressed by the coordinate
    /// tuples in the last axis of `indices`.
    ///
    /// # Errors
    ///
    /// Fails when the tuples are longer than the rank of `params` or a
    /// coordinate is out of range.
    fn gather_nd(
        params: &Self::Tensor,
        indices: &Self::Indices,
    ) -> Result<Self::Tensor>;

    /// Reports whether tensors can be written in place.
    fn inplace_arrays_supported() -> bool;

    /// Reports whether trainable variables can be written in place.
    fn inplace_variables_supported() -> bool;

    /// Returns the number of dimensions of the tensor.
    fn ndim(tensor: &Self::Tensor) -> usize;

    /// Scatters `updates` into a rank-1 target of length `size` (or into a
    /// copy of `target`) at the flat positions in `indices`.
    ///
    /// # Errors
    ///
    /// Fails when `size` and `target` disagree, neither is given, `updates`
    /// does not broadcast to `indices`, or an index is out of range.
    fn scatter_flat(
        indices: &Self::Indices,
        updates: &Self::Tensor,
        size: Option<usize>,
        reduction: Reduction,
        target: Option<&Self::Tensor>,
    ) -> Result<Self::Tensor>;

    /// Scatters `updates` into a target of `shape` (or into a copy of
    /// `target`) at the coordinate tuples in `indices`.
    ///
    /// # Errors
    ///
    /// Fails when `shape` and `target` disagree, neither is given, the
    /// operands cannot be broadcast together, or an index is out of range.
    fn scatter_nd(
        indices: ScatterIndices<&Self::Indices>,
        updates: &Self::Tensor,
        shape: Option<&[usize]>,
        reduction: Reduction,
        target: Option<&Self::Tensor>,
    ) -> Result<Self::Tensor>;

    /// Returns the shape of the tensor as a slice of dimensions.
    fn shape(tensor: &Self::Tensor) -> &[usize];

    /// Subtracts `rhs` from `lhs` element-wise, broadcasting their shapes.
    ///
    /// # Safety
    ///
    /// See the safety notes for [`Backend::add()`].
    unsafe fn sub(lhs: &Self::Tensor, rhs: &Self::Tensor) -> Self::Tensor;

    /// Moves the tensor to the configured compute device.
    fn to_device(tensor: Self::Tensor) -> Self::Tensor;

    /// Copies the elements out in row-major order.
    fn to_vec(tensor: &Self::Tensor) -> Vec<Self::Primitive>;

    /// Creates a tensor with all elements set to zero, with the given shape.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the product of axis lengths does not
    /// overflow [`isize::MAX`].
    unsafe fn zeros(shape: &[usize]) -> Self::Tensor;
}

cfg_if::cfg_if! {
    if #[cfg(feature = "ndarray-backend")] {
        /// Dynamically configured type alias for the selected backend, based
        /// on crate feature flags.
        pub type SelectedBackend<T> = ndarray::NdarrayBackend<T>;
    } else {
        compile_error!(
            "A backend feature must be enabled. Available: `ndarray-backend`"
        );
    }
}
