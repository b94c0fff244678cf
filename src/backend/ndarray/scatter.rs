//! Scatter kernels for the [`ndarray`] backend.
//!
//! Both kernels fold updates into an [`Accumulator`]: a flat copy of the
//! target (or a zero-filled buffer when no target is given) plus, for a fresh
//! `min`/`max` target, a mask of the positions written so far. The first
//! update landing on an untouched position is stored as is, so positions no
//! update reaches read as zero.

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use tracing::debug;

use crate::{
    backend::{
        Reduction, ScatterIndices,
        ndarray::{Element, index::resolve_index},
    },
    config::{self, IndexMode},
    error::{Error, Result},
    shape::{checked_numel, contiguous_strides, numel},
};

pub(super) fn scatter_flat<T: Element>(
    indices: &ArrayD<i64>,
    updates: &ArrayD<T>,
    size: Option<usize>,
    reduction: Reduction,
    target: Option<&ArrayD<T>>,
) -> Result<ArrayD<T>> {
    debug!(
        indices = ?indices.shape(),
        updates = ?updates.shape(),
        ?size,
        %reduction,
        has_target = target.is_some(),
        "scatter_flat"
    );

    let len = match (size, target) {
        (Some(size), Some(target)) if target.shape() != [size] => {
            return Err(Error::shape_mismatch(&[size], target.shape()));
        }
        (None, Some(target)) if target.ndim() != 1 => {
            return Err(Error::shape_mismatch(&[target.len()], target.shape()));
        }
        (Some(size), _) => size,
        (None, Some(target)) => target.len(),
        (None, None) => {
            return Err(Error::invalid_argument(
                "scatter_flat requires either `size` or an output buffer",
            ));
        }
    };
    if checked_numel(&[len]).is_none() {
        return Err(Error::oversized_shape(&[len]));
    }

    let updates = updates.broadcast(indices.raw_dim()).ok_or_else(|| {
        Error::shape_mismatch(indices.shape(), updates.shape())
    })?;

    let mode = config::current().index_mode;
    let mut acc = Accumulator::new(len, reduction, target)?;
    for (&index, update) in indices.iter().zip(updates.iter()) {
        acc.write(resolve_index(index, len, 0, mode)?, update.clone());
    }

    acc.finish(&[len])
}

pub(super) fn scatter_nd<T: Element>(
    indices: ScatterIndices<&ArrayD<i64>>,
    updates: &ArrayD<T>,
    shape: Option<&[usize]>,
    reduction: Reduction,
    target: Option<&ArrayD<T>>,
) -> Result<ArrayD<T>> {
    debug!(
        updates = ?updates.shape(),
        ?shape,
        %reduction,
        has_target = target.is_some(),
        "scatter_nd"
    );

    let target_shape = match (shape, target) {
        (Some(shape), Some(target)) if shape != target.shape() => {
            return Err(Error::shape_mismatch(shape, target.shape()));
        }
        (Some(shape), _) => shape.to_vec(),
        (None, Some(target)) => target.shape().to_vec(),
        (None, None) => {
            return Err(Error::invalid_argument(
                "scatter_nd requires either `shape` or an output buffer",
            ));
        }
    };

    let len = checked_numel(&target_shape)
        .ok_or_else(|| Error::oversized_shape(&target_shape))?;

    let mode = config::current().index_mode;
    let mut acc = Accumulator::new(len, reduction, target)?;

    match indices {
        ScatterIndices::All => {
            let updates = updates.broadcast(IxDyn(&target_shape)).ok_or_else(
                || Error::shape_mismatch(&target_shape, updates.shape()),
            )?;
            for (position, update) in updates.iter().enumerate() {
                acc.write(position, update.clone());
            }
        }
        ScatterIndices::Scalar(index) => {
            let tuples = ArrayD::from_elem(IxDyn(&[1, 1]), index);
            write_tuples(
                &mut acc,
                tuples.view(),
                updates,
                &target_shape,
                mode,
            )?;
        }
        ScatterIndices::Array(indices) if indices.ndim() < 2 => {
            let tuples = indices
                .to_owned()
                .into_shape_with_order(IxDyn(&[1, indices.len()]))?;
            write_tuples(
                &mut acc,
                tuples.view(),
                updates,
                &target_shape,
                mode,
            )?;
        }
        ScatterIndices::Array(indices) => {
            write_tuples(
                &mut acc,
                indices.view(),
                updates,
                &target_shape,
                mode,
            )?;
        }
    }

    acc.finish(&target_shape)
}

/// Writes `updates` at the coordinate tuples held in the last axis of
/// `tuples` (rank two or more).
///
/// The updates are expected to have shape `tuples.shape[..-1] ++
/// target_shape[k..]` for tuples of length `k`. If they hold fewer elements
/// they are broadcast up to it. If they hold more and there is a single
/// tuple, that tuple is repeated along the leading extent of the updates
/// instead.
fn write_tuples<T: Element>(
    acc: &mut Accumulator<T>,
    tuples: ArrayViewD<'_, i64>,
    updates: &ArrayD<T>,
    target_shape: &[usize],
    mode: IndexMode,
) -> Result<()> {
    let depth = tuples.shape().last().copied().unwrap_or_default();
    if depth > target_shape.len() {
        return Err(Error::shape_mismatch(target_shape, tuples.shape()));
    }
    let trailing = &target_shape[depth..];

    let tuple_shape = &tuples.shape()[..tuples.ndim() - 1];
    let mut expected = tuple_shape.to_vec();
    expected.extend_from_slice(trailing);

    let tuples = if tuple_shape == [1] && updates.len() > numel(&expected) {
        let leading = updates.shape().first().copied().unwrap_or(1);
        let widened = tuples
            .broadcast(IxDyn(&[leading, depth]))
            .ok_or_else(|| {
                Error::shape_mismatch(&[leading, depth], tuples.shape())
            })?;
        expected = [&[leading][..], trailing].concat();
        widened
    } else {
        tuples.view()
    };

    let updates = updates
        .broadcast(IxDyn(&expected))
        .ok_or_else(|| Error::shape_mismatch(&expected, updates.shape()))?;

    let strides = contiguous_strides(target_shape);
    let block = numel(trailing);
    let count = numel(&tuples.shape()[..tuples.ndim() - 1]);
    let coords: Vec<i64> = tuples.iter().copied().collect();
    let mut values = updates.iter();

    for tuple in 0..count {
        let mut base = 0;
        for (axis, &coord) in
            coords[tuple * depth..(tuple + 1) * depth].iter().enumerate()
        {
            base += resolve_index(coord, target_shape[axis], axis, mode)?
                * strides[axis];
        }
        for (position, update) in (base..base + block).zip(values.by_ref()) {
            acc.write(position, update.clone());
        }
    }

    Ok(())
}

/// Flat scatter target.
struct Accumulator<T> {
    values: Vec<T>,
    touched: Option<Vec<bool>>,
    reduction: Reduction,
}

impl<T: Element> Accumulator<T> {
    /// Copies `target`, or allocates `len` zeros when there is none.
    ///
    /// The allocation is fallible so that an oversized target is reported
    /// instead of aborting the process.
    fn new(
        len: usize,
        reduction: Reduction,
        target: Option<&ArrayD<T>>,
    ) -> Result<Self> {
        if let Some(target) = target {
            return Ok(Self {
                values: target.iter().cloned().collect(),
                touched: None,
                reduction,
            });
        }

        let values = filled(len, T::zero())?;
        let touched = match reduction {
            Reduction::Min | Reduction::Max => Some(filled(len, false)?),
            Reduction::Sum | Reduction::Replace => None,
        };
        Ok(Self {
            values,
            touched,
            reduction,
        })
    }

    fn write(&mut self, position: usize, update: T) {
        let slot = &mut self.values[position];

        if let Some(touched) = &mut self.touched
            && !core::mem::replace(&mut touched[position], true)
        {
            *slot = update;
            return;
        }

        match self.reduction {
            Reduction::Sum => *slot = slot.clone() + update,
            Reduction::Replace => *slot = update,
            Reduction::Min if update < *slot => *slot = update,
            Reduction::Max if update > *slot => *slot = update,
            Reduction::Min | Reduction::Max => {}
        }
    }

    fn finish(self, shape: &[usize]) -> Result<ArrayD<T>> {
        Ok(ArrayD::from_shape_vec(IxDyn(shape), self.values)?)
    }
}

fn filled<V: Clone>(len: usize, value: V) -> Result<Vec<V>> {
    let mut values = Vec::new();
    values.try_reserve_exact(len).map_err(|error| {
        Error::invalid_argument(format!(
            "cannot allocate a scatter target of {len} elements: {error}"
        ))
    })?;
    values.resize(len, value);
    Ok(values)
}

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, IxDyn, arr0, arr1, arr2};

    use crate::{
        backend::{
            Reduction, ScatterIndices,
            ndarray::scatter::{scatter_flat, scatter_nd},
        },
        error::Error,
    };

    #[test]
    fn scatter_flat_sum_accumulates_duplicates() {
        let indices = arr1(&[0, 2, 0]).into_dyn();
        let updates = arr1(&[1.0, 2.0, 3.0]).into_dyn();

        let result =
            scatter_flat(&indices, &updates, Some(4), Reduction::Sum, None)
                .unwrap();

        assert_eq!(result, arr1(&[4.0, 0.0, 2.0, 0.0]).into_dyn());
    }

    #[test]
    fn scatter_flat_replace_keeps_last_write() {
        let indices = arr1(&[1, 1]).into_dyn();
        let updates = arr1(&[5.0, 7.0]).into_dyn();

        let result =
            scatter_flat(&indices, &updates, Some(3), Reduction::Replace, None)
                .unwrap();

        assert_eq!(result, arr1(&[0.0, 7.0, 0.0]).into_dyn());
    }

    #[test]
    fn scatter_flat_min_leaves_untouched_positions_zero() {
        let indices = arr1(&[0, 2]).into_dyn();
        let updates = arr1(&[5.0, 3.0]).into_dyn();

        let result =
            scatter_flat(&indices, &updates, Some(4), Reduction::Min, None)
                .unwrap();

        assert_eq!(result, arr1(&[5.0, 0.0, 3.0, 0.0]).into_dyn());
    }

    #[test]
    fn scatter_flat_max_handles_negative_updates() {
        let indices = arr1(&[1, 1, 3]).into_dyn();
        let updates = arr1(&[-4.0, -2.0, -9.0]).into_dyn();

        let result =
            scatter_flat(&indices, &updates, Some(4), Reduction::Max, None)
                .unwrap();

        assert_eq!(result, arr1(&[0.0, -2.0, 0.0, -9.0]).into_dyn());
    }

    #[test]
    fn scatter_flat_min_handles_large_magnitudes() {
        let indices = arr1(&[0]).into_dyn();
        let updates = arr1(&[2e12]).into_dyn();

        let result =
            scatter_flat(&indices, &updates, Some(2), Reduction::Min, None)
                .unwrap();

        assert_eq!(result, arr1(&[2e12, 0.0]).into_dyn());
    }

    #[test]
    fn scatter_flat_min_combines_with_existing_target() {
        let indices = arr1(&[0, 1]).into_dyn();
        let updates = arr1(&[5.0, 1.0]).into_dyn();
        let target = arr1(&[3.0, 3.0, 3.0]).into_dyn();

        let result = scatter_flat(
            &indices,
            &updates,
            None,
            Reduction::Min,
            Some(&target),
        )
        .unwrap();

        assert_eq!(result, arr1(&[3.0, 1.0, 3.0]).into_dyn());
        assert_eq!(target, arr1(&[3.0, 3.0, 3.0]).into_dyn());
    }

    #[test]
    fn scatter_flat_broadcasts_scalar_update() {
        let indices = arr1(&[0, 3]).into_dyn();
        let updates = arr0(1_i32).into_dyn();

        let result =
            scatter_flat(&indices, &updates, Some(4), Reduction::Sum, None)
                .unwrap();

        assert_eq!(result, arr1(&[1, 0, 0, 1]).into_dyn());
    }

    #[test]
    fn scatter_flat_rejects_size_target_disagreement() {
        let indices = arr1(&[0]).into_dyn();
        let updates = arr1(&[1.0]).into_dyn();
        let target = arr1(&[0.0, 0.0]).into_dyn();

        let error = scatter_flat(
            &indices,
            &updates,
            Some(3),
            Reduction::Sum,
            Some(&target),
        )
        .unwrap_err();

        assert!(matches!(error, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn scatter_flat_rejects_multi_dimensional_target() {
        let indices = arr1(&[0]).into_dyn();
        let updates = arr1(&[1.0]).into_dyn();
        let target = ArrayD::<f64>::zeros(IxDyn(&[2, 2]));

        let error = scatter_flat(
            &indices,
            &updates,
            None,
            Reduction::Sum,
            Some(&target),
        )
        .unwrap_err();

        assert!(matches!(error, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn scatter_flat_requires_size_or_target() {
        let indices = arr1(&[0]).into_dyn();
        let updates = arr1(&[1.0]).into_dyn();

        let error = scatter_flat(&indices, &updates, None, Reduction::Sum, None)
            .unwrap_err();

        assert!(matches!(error, Error::InvalidArgument { .. }));
    }

    #[test]
    fn scatter_flat_rejects_out_of_range_index() {
        let indices = arr1(&[4]).into_dyn();
        let updates = arr1(&[1.0]).into_dyn();

        let error =
            scatter_flat(&indices, &updates, Some(4), Reduction::Sum, None)
                .unwrap_err();

        assert!(matches!(error, Error::IndexOutOfBounds { index: 4, .. }));
    }

    #[test]
    fn scatter_nd_full_tuples_write_elements() {
        let indices = ScatterIndices::Array(arr2(&[[0, 1], [1, 0]]).into_dyn());
        let updates = arr1(&[5.0, 6.0]).into_dyn();

        let result = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[2, 2]),
            Reduction::Sum,
            None,
        )
        .unwrap();

        assert_eq!(result, arr2(&[[0.0, 5.0], [6.0, 0.0]]).into_dyn());
    }

    #[test]
    fn scatter_nd_partial_tuples_write_rows() {
        let indices = ScatterIndices::Array(arr2(&[[2], [0]]).into_dyn());
        let updates = arr2(&[[1.0, 2.0], [3.0, 4.0]]).into_dyn();

        let result = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[3, 2]),
            Reduction::Replace,
            None,
        )
        .unwrap();

        assert_eq!(
            result,
            arr2(&[[3.0, 4.0], [0.0, 0.0], [1.0, 2.0]]).into_dyn()
        );
    }

    #[test]
    fn scatter_nd_promotes_one_dimensional_indices() {
        let indices = ScatterIndices::Array(arr1(&[1, 1]).into_dyn());
        let updates = arr1(&[9.0]).into_dyn();

        let result = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[2, 2]),
            Reduction::Sum,
            None,
        )
        .unwrap();

        assert_eq!(result, arr2(&[[0.0, 0.0], [0.0, 9.0]]).into_dyn());
    }

    #[test]
    fn scatter_nd_scalar_index_addresses_first_axis() {
        let indices = ScatterIndices::Scalar(1);
        let updates = arr1(&[7.0, 8.0]).into_dyn();

        let result = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[2, 2]),
            Reduction::Sum,
            None,
        )
        .unwrap();

        assert_eq!(result, arr2(&[[0.0, 0.0], [7.0, 8.0]]).into_dyn());
    }

    #[test]
    fn scatter_nd_all_covers_whole_target() {
        let target = arr2(&[[1.0, 2.0], [3.0, 4.0]]).into_dyn();
        let updates = arr1(&[10.0, 20.0]).into_dyn();

        let result = scatter_nd(
            ScatterIndices::All,
            &updates,
            None,
            Reduction::Sum,
            Some(&target),
        )
        .unwrap();

        assert_eq!(result, arr2(&[[11.0, 22.0], [13.0, 24.0]]).into_dyn());
    }

    #[test]
    fn scatter_nd_broadcasts_smaller_updates() {
        let indices = ScatterIndices::Array(arr2(&[[0], [2]]).into_dyn());
        let updates = arr0(1.5).into_dyn();

        let result = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[3, 2]),
            Reduction::Sum,
            None,
        )
        .unwrap();

        assert_eq!(
            result,
            arr2(&[[1.5, 1.5], [0.0, 0.0], [1.5, 1.5]]).into_dyn()
        );
    }

    #[test]
    fn scatter_nd_broadcasts_indices_for_larger_updates() {
        let indices = ScatterIndices::Array(arr2(&[[1]]).into_dyn());
        let updates = arr1(&[1.0, 2.0, 3.0]).into_dyn();

        let result = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[3]),
            Reduction::Sum,
            None,
        )
        .unwrap();

        assert_eq!(result, arr1(&[0.0, 6.0, 0.0]).into_dyn());
    }

    #[test]
    fn scatter_nd_equal_element_counts_broadcast_neither_side() {
        let indices = ScatterIndices::Array(arr2(&[[0], [1]]).into_dyn());
        let updates = ArrayD::from_shape_vec(
            IxDyn(&[2, 3]),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();

        let result = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[2, 3]),
            Reduction::Sum,
            None,
        )
        .unwrap();

        assert_eq!(result, updates);
    }

    #[test]
    fn scatter_nd_max_leaves_untouched_positions_zero() {
        let indices =
            ScatterIndices::Array(arr2(&[[0, 0], [0, 0], [1, 1]]).into_dyn());
        let updates = arr1(&[-1.0, -3.0, 4.0]).into_dyn();

        let result = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[2, 2]),
            Reduction::Max,
            None,
        )
        .unwrap();

        assert_eq!(result, arr2(&[[-1.0, 0.0], [0.0, 4.0]]).into_dyn());
    }

    #[test]
    fn scatter_nd_rejects_shape_target_disagreement() {
        let indices = ScatterIndices::Array(arr2(&[[0]]).into_dyn());
        let updates = arr1(&[1.0]).into_dyn();
        let target = ArrayD::<f64>::zeros(IxDyn(&[2]));

        let error = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[3]),
            Reduction::Sum,
            Some(&target),
        )
        .unwrap_err();

        assert!(matches!(error, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn scatter_nd_rejects_tuples_longer_than_rank() {
        let indices = ScatterIndices::Array(arr2(&[[0, 0]]).into_dyn());
        let updates = arr1(&[1.0]).into_dyn();

        let error = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[3]),
            Reduction::Sum,
            None,
        )
        .unwrap_err();

        assert!(matches!(error, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn scatter_nd_rejects_unbroadcastable_updates() {
        let indices = ScatterIndices::Array(arr2(&[[0], [1]]).into_dyn());
        let updates = arr1(&[1.0, 2.0, 3.0]).into_dyn();

        let error = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[2, 2]),
            Reduction::Sum,
            None,
        )
        .unwrap_err();

        assert!(matches!(error, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn scatter_nd_empty_index_set_leaves_target_zero() {
        let indices =
            ScatterIndices::Array(ArrayD::<i64>::zeros(IxDyn(&[0, 1])));
        let updates = arr0(1.0).into_dyn();

        let result = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[3]),
            Reduction::Sum,
            None,
        )
        .unwrap();

        assert_eq!(result, arr1(&[0.0, 0.0, 0.0]).into_dyn());
    }

    #[test]
    fn scatter_nd_empty_index_set_keeps_existing_target() {
        let indices =
            ScatterIndices::Array(ArrayD::<i64>::zeros(IxDyn(&[0, 1])));
        let updates = arr1(&[1.0, 1.0]).into_dyn();
        let target = arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).into_dyn();

        let result = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[3, 2]),
            Reduction::Replace,
            Some(&target),
        )
        .unwrap();

        assert_eq!(result, target);
    }

    #[test]
    fn scatter_nd_rejects_overflowing_shape() {
        let indices = ScatterIndices::Array(arr2(&[[0, 0]]).into_dyn());
        let updates = arr1(&[1.0]).into_dyn();

        let error = scatter_nd(
            indices.as_ref(),
            &updates,
            Some(&[usize::MAX, 2]),
            Reduction::Sum,
            None,
        )
        .unwrap_err();

        assert!(matches!(error, Error::InvalidArgument { .. }));
    }

    #[test]
    fn scatter_flat_rejects_oversized_size() {
        let indices = arr1(&[0]).into_dyn();
        let updates = arr1(&[1.0]).into_dyn();

        for size in [usize::MAX, usize::MAX / 4] {
            let error = scatter_flat(
                &indices,
                &updates,
                Some(size),
                Reduction::Min,
                None,
            )
            .unwrap_err();

            assert!(matches!(error, Error::InvalidArgument { .. }));
        }
    }
}
