//! Axis and index resolution shared by gather and scatter.

use crate::{
    config::IndexMode,
    error::{Error, Result},
};

/// Maps an axis in `[-ndim, ndim)` onto `[0, ndim)`.
pub(super) fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let out_of_bounds = || Error::AxisOutOfBounds { axis, ndim };
    let rank = isize::try_from(ndim).map_err(|_| out_of_bounds())?;
    let resolved = if axis < 0 { axis + rank } else { axis };

    usize::try_from(resolved)
        .ok()
        .filter(|&resolved| resolved < ndim)
        .ok_or_else(out_of_bounds)
}

/// Maps `index` onto a position of an axis of extent `len`.
///
/// Negative indices count from the end. Anything still outside the axis is
/// rejected or clamped according to `mode`.
pub(super) fn resolve_index(
    index: i64,
    len: usize,
    axis: usize,
    mode: IndexMode,
) -> Result<usize> {
    let out_of_bounds = || Error::IndexOutOfBounds { index, axis, len };
    let extent = i64::try_from(len).map_err(|_| out_of_bounds())?;
    let wrapped = if index < 0 { index.saturating_add(extent) } else { index };

    if (0..extent).contains(&wrapped) {
        return usize::try_from(wrapped).map_err(|_| out_of_bounds());
    }

    match mode {
        IndexMode::Clamp if len > 0 => {
            Ok(if wrapped < 0 { 0 } else { len - 1 })
        }
        IndexMode::Strict | IndexMode::Clamp => Err(out_of_bounds()),
    }
}
