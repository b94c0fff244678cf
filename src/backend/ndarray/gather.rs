//! Gather kernels for the [`ndarray`] backend.

use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::{
    backend::ndarray::{
        Element,
        index::{normalize_axis, resolve_index},
    },
    config,
    error::{Error, Result},
    shape::{contiguous_strides, numel},
};

/// Takes slices of `params` along `axis`, pairing up the leading
/// `batch_dims` axes of `params` and `indices`.
///
/// The batch axes are flattened into a single batch index; each batch
/// element is gathered on its own and the results are laid out back to back,
/// which restores the batch axes in the output shape.
pub(super) fn gather<T: Element>(
    params: &ArrayD<T>,
    indices: &ArrayD<i64>,
    axis: isize,
    batch_dims: usize,
) -> Result<ArrayD<T>> {
    let mode = config::current().index_mode;
    let shape = params.shape();
    let axis = normalize_axis(axis, shape.len())?;

    debug!(
        params = ?shape,
        indices = ?indices.shape(),
        axis,
        batch_dims,
        "gather"
    );

    if batch_dims > axis || batch_dims > indices.ndim() {
        return Err(Error::invalid_argument(format!(
            "batch_dims ({batch_dims}) must not exceed the gather axis \
             ({axis}) or the rank of the indices ({})",
            indices.ndim()
        )));
    }

    let batch_shape = &shape[..batch_dims];
    if &indices.shape()[..batch_dims] != batch_shape {
        return Err(Error::shape_mismatch(
            batch_shape,
            &indices.shape()[..batch_dims],
        ));
    }

    let positions = indices
        .iter()
        .map(|&index| resolve_index(index, shape[axis], axis, mode))
        .collect::<Result<Vec<_>>>()?;

    let slice_shape = &shape[batch_dims..];
    let local_axis = axis - batch_dims;
    let index_shape = &indices.shape()[batch_dims..];

    let batches = numel(batch_shape);
    let slice_len = numel(slice_shape);
    let picks_len = numel(index_shape);
    let layout = AxisLayout {
        outer: numel(&slice_shape[..local_axis]),
        len: slice_shape[local_axis],
        inner: numel(&slice_shape[local_axis + 1..]),
    };

    let data: Vec<T> = params.iter().cloned().collect();
    let mut out = Vec::with_capacity(
        batches * layout.outer * picks_len * layout.inner,
    );
    for batch in 0..batches {
        layout.take(
            &data[batch * slice_len..(batch + 1) * slice_len],
            &positions[batch * picks_len..(batch + 1) * picks_len],
            &mut out,
        );
    }

    let mut out_shape = shape[..axis].to_vec();
    out_shape.extend_from_slice(index_shape);
    out_shape.extend_from_slice(&shape[axis + 1..]);

    Ok(ArrayD::from_shape_vec(IxDyn(&out_shape), out)?)
}

/// Gathers the blocks of `params` addressed by the coordinate tuples in the
/// last axis of `indices`.
///
/// Each tuple of length `k` is turned into a flat offset with the row-major
/// strides of the first `k` axes. Everything after those axes is contiguous,
/// so the addressed block `params[tuple, ...]` is the run of
/// `numel(params.shape[k..])` elements starting at that offset.
pub(super) fn gather_nd<T: Element>(
    params: &ArrayD<T>,
    indices: &ArrayD<i64>,
) -> Result<ArrayD<T>> {
    let mode = config::current().index_mode;
    let shape = params.shape();

    debug!(params = ?shape, indices = ?indices.shape(), "gather_nd");

    let Some((&depth, tuple_shape)) = indices.shape().split_last() else {
        return Err(Error::invalid_argument(
            "gather_nd indices must have at least one dimension",
        ));
    };
    if depth > shape.len() {
        return Err(Error::shape_mismatch(shape, indices.shape()));
    }

    let strides = contiguous_strides(shape);
    let block = numel(&shape[depth..]);
    let tuples = numel(tuple_shape);

    let data: Vec<T> = params.iter().cloned().collect();
    let coords: Vec<i64> = indices.iter().copied().collect();
    let mut out = Vec::with_capacity(tuples * block);

    for tuple in 0..tuples {
        let mut offset = 0;
        for (axis, &coord) in
            coords[tuple * depth..(tuple + 1) * depth].iter().enumerate()
        {
            offset +=
                resolve_index(coord, shape[axis], axis, mode)? * strides[axis];
        }
        out.extend_from_slice(&data[offset..offset + block]);
    }

    let mut out_shape = tuple_shape.to_vec();
    out_shape.extend_from_slice(&shape[depth..]);

    Ok(ArrayD::from_shape_vec(IxDyn(&out_shape), out)?)
}

/// Row-major view of a contiguous block split around one axis.
#[derive(Debug, Clone, Copy)]
struct AxisLayout {
    outer: usize,
    len: usize,
    inner: usize,
}

impl AxisLayout {
    fn take<T: Clone>(self, block: &[T], picks: &[usize], out: &mut Vec<T>) {
        for outer in 0..self.outer {
            for &pick in picks {
                let start = (outer * self.len + pick) * self.inner;
                out.extend_from_slice(&block[start..start + self.inner]);
            }
        }
    }
}
