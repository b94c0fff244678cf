//! Framework-facing operations.
//!
//! Each function unwraps its [`Tensor`] arguments, runs the operation on the
//! [`SelectedBackend`] and wraps the result again. When a scatter is given an
//! output tensor, the result is written back through
//! [`Tensor::inplace_update()`] so that the caller's tensor observes it.

use ndarray::ArrayD;
use tracing::debug;

use crate::{
    backend::{
        Backend, Reduction, ScatterIndices, SelectedBackend, ndarray::Element,
    },
    error::Result,
    tensor::Tensor,
};

/// Backend instance used for queries that do not depend on the element
/// type.
type Query = SelectedBackend<f32>;

/// Name of the selected backend.
#[inline]
pub const fn current_backend_str() -> &'static str {
    <Query as Backend>::NAME
}

/// Whether the selected backend can write tensors in place.
#[inline]
pub fn inplace_arrays_supported() -> bool {
    <Query as Backend>::inplace_arrays_supported()
}

/// Whether the selected backend can write trainable variables in place.
#[inline]
pub fn inplace_variables_supported() -> bool {
    <Query as Backend>::inplace_variables_supported()
}

/// Selects slices of `params` along `axis` at `indices`.
///
/// See [`Backend::gather()`].
///
/// # Errors
///
/// Propagates the backend's validation errors.
pub fn gather<T: Element>(
    params: &Tensor<T>,
    indices: &Tensor<i64>,
    axis: isize,
    batch_dims: usize,
) -> Result<Tensor<T>> {
    SelectedBackend::<T>::gather(
        params.data(),
        indices.data(),
        axis,
        batch_dims,
    )
    .map(Tensor::from)
}

/// Gathers the blocks of `params` addressed by the tuples in `indices`.
///
/// See [`Backend::gather_nd()`].
///
/// # Errors
///
/// Propagates the backend's validation errors.
pub fn gather_nd<T: Element>(
    params: &Tensor<T>,
    indices: &Tensor<i64>,
) -> Result<Tensor<T>> {
    SelectedBackend::<T>::gather_nd(params.data(), indices.data())
        .map(Tensor::from)
}

/// Scatters `updates` into a rank-1 tensor at the positions in `indices`.
///
/// Without `out` a tensor of length `size` is allocated. With `out` the
/// updates are combined with its current values and its data slot is
/// rebound to the result.
///
/// # Errors
///
/// Propagates the backend's validation errors; `out` is left untouched when
/// the scatter fails.
pub fn scatter_flat<T: Element>(
    indices: &Tensor<i64>,
    updates: &Tensor<T>,
    size: Option<usize>,
    reduction: Reduction,
    out: Option<&mut Tensor<T>>,
) -> Result<Tensor<T>> {
    let result = SelectedBackend::<T>::scatter_flat(
        indices.data(),
        updates.data(),
        size,
        reduction,
        out.as_deref().map(Tensor::data),
    )?;
    write_back(result, out)
}

/// Scatters `updates` into a tensor at the coordinate tuples in `indices`.
///
/// Without `out` a tensor of `shape` is allocated. With `out` the updates are
/// combined with its current values and its data slot is rebound to the
/// result.
///
/// # Errors
///
/// Propagates the backend's validation errors; `out` is left untouched when
/// the scatter fails.
pub fn scatter_nd<T: Element>(
    indices: &ScatterIndices<Tensor<i64>>,
    updates: &Tensor<T>,
    shape: Option<&[usize]>,
    reduction: Reduction,
    out: Option<&mut Tensor<T>>,
) -> Result<Tensor<T>> {
    let result = SelectedBackend::<T>::scatter_nd(
        indices.as_ref().map(Tensor::data),
        updates.data(),
        shape,
        reduction,
        out.as_deref().map(Tensor::data),
    )?;
    write_back(result, out)
}

fn write_back<T: Element>(
    result: ArrayD<T>,
    out: Option<&mut Tensor<T>>,
) -> Result<Tensor<T>> {
    match out {
        Some(out) => {
            debug!(shape = ?result.shape(), "writing scatter result to output");
            Ok(out.inplace_update(result, false)?.clone())
        }
        None => Ok(Tensor::from(result)),
    }
}
