//! # The tensor module
//!
//! This module provides the framework-level array handle. A [`Tensor`] owns
//! exactly one native array of the selected backend in a replaceable data
//! slot; "in-place" operations rebind that slot to a newly computed array
//! instead of writing into the old one.

use ndarray::{ArrayD, IxDyn};
use tracing::trace;

use crate::{
    backend::{Backend, SelectedBackend, ndarray::Element},
    error::{Error, Result},
    shape::{checked_numel, numel},
};

/// Creates a `Tensor` from nested arrays or vectors with a `vec!`-like syntax.
/// The data type of the tensor's elements is inferred from the literals.
///
/// # Examples
///
/// ```
/// use tensorshim::tensor;
///
/// // A 1D Tensor
/// let v = tensor![1.0, 2.0, 3.0];
///
/// // A 2D Tensor
/// let m = tensor![[1.0, 2.0], [3.0, 4.0]];
///
/// // The macro also works with other numeric types like integers.
/// let i = tensor![1, 2, 3];
/// ```
#[macro_export]
macro_rules! tensor {
    ($($data:tt)+) => {
        $crate::tensor::Tensor::from(ndarray::array!($($data)+).into_dyn())
    };
}

/// A generic, multi-dimensional array holding elements of type `T`.
///
/// A `Tensor` represents a grid of elements with a specific shape. Unlike
/// statically-sized arrays, the number of dimensions (or rank) of a `Tensor`
/// is determined at runtime, providing flexibility for numerical computations.
///
/// The element type `T` is typically a numeric type (e.g., `f32`, `i64`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor<T> {
    inner: ArrayD<T>,
}

/// Provides interoperability with the `ndarray` crate.
///
/// Enables a direct and efficient conversion from `ndarray`'s
/// dynamically-dimensioned array type into a `Tensor`.
impl<T> From<ArrayD<T>> for Tensor<T> {
    #[inline]
    fn from(value: ArrayD<T>) -> Self {
        Self { inner: value }
    }
}

impl<T> Tensor<T> {
    /// The native array currently bound to this tensor.
    #[inline]
    pub const fn data(&self) -> &ArrayD<T> {
        &self.inner
    }

    /// Unwraps the native array.
    #[inline]
    pub fn into_native(self) -> ArrayD<T> {
        self.inner
    }

    /// Points the data slot at `data`, dropping the previous array.
    pub(crate) fn rebind(&mut self, data: ArrayD<T>) {
        trace!(
            from = ?self.inner.shape(),
            to = ?data.shape(),
            "rebind tensor data"
        );
        self.inner = data;
    }
}

impl<T> Tensor<T>
where
    T: Element,
{
    /// Number of dimensions.
    #[inline]
    pub fn num_dims(&self) -> usize {
        SelectedBackend::<T>::ndim(&self.inner)
    }

    /// Extent of every axis.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        SelectedBackend::<T>::shape(&self.inner)
    }

    /// Creates a zero-filled tensor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the element count overflows
    /// [`isize::MAX`].
    pub fn zeros(shape: &[usize]) -> Result<Self> {
        if checked_numel(shape).is_none() {
            return Err(Error::oversized_shape(shape));
        }

        // SAFETY: The element count was checked against `isize::MAX` above.
        Ok(Self::from(unsafe { SelectedBackend::<T>::zeros(shape) }))
    }

    /// Rebinds the data slot to `val`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InplaceUnsupported`] when `ensure_in_backend` is set:
    /// the backend's arrays cannot be written where they live.
    pub fn inplace_update(
        &mut self,
        val: ArrayD<T>,
        ensure_in_backend: bool,
    ) -> Result<&mut Self> {
        if ensure_in_backend {
            return Err(Error::InplaceUnsupported {
                backend: SelectedBackend::<T>::NAME,
            });
        }
        self.rebind(val);
        Ok(self)
    }

    /// Returns `true` when both tensors have the same shape and elements.
    #[inline]
    pub fn array_equal(&self, other: &Self) -> bool {
        SelectedBackend::<T>::array_equal(&self.inner, &other.inner)
    }

    /// The shape as a rank-1 integer tensor.
    pub fn shape_array(&self) -> Tensor<i64> {
        let dims = self
            .shape()
            .iter()
            .map(|&len| i64::try_from(len).unwrap_or(i64::MAX))
            .collect::<Vec<_>>();
        let len = dims.len();
        // SAFETY: `dims` holds exactly one element per entry of the shape.
        Tensor::from(unsafe { SelectedBackend::<i64>::from_vec(dims, &[len]) })
    }

    /// Copies the elements out in row-major order.
    #[inline]
    pub fn to_vec(&self) -> Vec<T> {
        SelectedBackend::<T>::to_vec(&self.inner)
    }

    /// Extracts the only element of a single-element tensor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the tensor does not hold
    /// exactly one element.
    pub fn to_scalar(&self) -> Result<T> {
        match self.inner.iter().next() {
            Some(value) if numel(self.shape()) == 1 => Ok(value.clone()),
            _ => Err(Error::invalid_argument(format!(
                "only single-element tensors convert to scalars, \
                 got shape {:?}",
                self.shape()
            ))),
        }
    }
}

impl<T> Tensor<T>
where
    T: Clone,
{
    /// Wraps a single value in a zero-dimensional tensor.
    #[inline]
    pub fn scalar(value: T) -> Self {
        Self::from(ArrayD::from_elem(IxDyn(&[]), value))
    }
}
