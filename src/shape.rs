//! Shape arithmetic shared by the backends and the framework wrapper.

/// Number of elements in an array of the given shape.
///
/// The empty shape describes a scalar and holds one element.
#[inline]
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Number of elements in an array of the given shape, or `None` when the
/// count overflows or exceeds [`isize::MAX`].
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1_usize, |acc, &len| acc.checked_mul(len))
        .filter(|&len| isize::try_from(len).is_ok())
}

/// Row-major strides, in elements, for a contiguous array of `shape`.
///
/// The last axis has stride one; every other axis has the product of the
/// extents after it.
pub fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Shape produced by broadcasting `lhs` against `rhs`, or `None` when the
/// two are incompatible.
///
/// Shapes are aligned at their trailing axes; an axis of extent one
/// stretches to match the other side.
pub fn broadcast_shapes(lhs: &[usize], rhs: &[usize]) -> Option<Vec<usize>> {
    let ndim = lhs.len().max(rhs.len());
    let mut out = vec![0; ndim];

    for (axis, slot) in out.iter_mut().enumerate() {
        let l = axis
            .checked_sub(ndim - lhs.len())
            .map_or(1, |i| lhs[i]);
        let r = axis
            .checked_sub(ndim - rhs.len())
            .map_or(1, |i| rhs[i]);

        *slot = match (l, r) {
            (l, r) if l == r => l,
            (1, r) => r,
            (l, 1) => l,
            _ => return None,
        };
    }

    Some(out)
}
