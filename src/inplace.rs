//! In-place mutation on top of immutable arrays.
//!
//! The backend cannot write into an existing array. Instead, these functions
//! compute the new array and rebind the data slot of the framework
//! [`Tensor`] that owns the old one, so every holder of that tensor observes
//! the change. Bare native arrays have no slot to rebind.

use tracing::debug;

use crate::{
    backend::{Backend, SelectedBackend, ndarray::Element},
    error::{Error, Result},
    shape::broadcast_shapes,
    tensor::Tensor,
    value::Value,
};

/// Replaces the data of `x` with that of `val`.
///
/// When either operand is not an array, `val` is returned unchanged.
///
/// # Errors
///
/// Returns [`Error::InplaceUnsupported`] when `ensure_in_backend` is set or
/// `x` is not a framework tensor, and [`Error::AbstractValue`] when `x` is a
/// framework tensor but `val` is a trace proxy.
pub fn inplace_update<T>(
    x: Value<T>,
    val: Value<T>,
    ensure_in_backend: bool,
) -> Result<Value<T>>
where
    T: Element,
{
    if !(x.is_array() && val.is_array()) {
        return Ok(val);
    }

    let unsupported = Error::InplaceUnsupported {
        backend: SelectedBackend::<T>::NAME,
    };
    if ensure_in_backend {
        return Err(unsupported);
    }

    match x {
        Value::Framework(mut tensor) => {
            let val = val.into_native()?;
            debug!(shape = ?val.shape(), "inplace_update");
            let _ = tensor.inplace_update(val, false)?;
            Ok(Value::Framework(tensor))
        }
        Value::Native(_) | Value::Traced(_) | Value::Scalar(_) => {
            Err(unsupported)
        }
    }
}

/// Adds `val` to `x`.
///
/// A framework tensor has its data slot rebound to the sum and is returned;
/// anything else yields a new framework tensor holding the sum.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] when the shapes do not broadcast and
/// [`Error::AbstractValue`] when either operand is a trace proxy.
pub fn inplace_increment<T>(x: Value<T>, val: Value<T>) -> Result<Value<T>>
where
    T: Element,
{
    combine(x, val, "inplace_increment", |lhs, rhs| {
        // SAFETY: `combine` checked that the shapes broadcast.
        unsafe { SelectedBackend::<T>::add(lhs, rhs) }
    })
}

/// Subtracts `val` from `x`.
///
/// Rebinding follows [`inplace_increment()`].
///
/// # Errors
///
/// See [`inplace_increment()`].
pub fn inplace_decrement<T>(x: Value<T>, val: Value<T>) -> Result<Value<T>>
where
    T: Element,
{
    combine(x, val, "inplace_decrement", |lhs, rhs| {
        // SAFETY: `combine` checked that the shapes broadcast.
        unsafe { SelectedBackend::<T>::sub(lhs, rhs) }
    })
}

fn combine<T, F>(
    x: Value<T>,
    val: Value<T>,
    op: &'static str,
    f: F,
) -> Result<Value<T>>
where
    T: Element,
    F: FnOnce(
        &<SelectedBackend<T> as Backend>::Tensor,
        &<SelectedBackend<T> as Backend>::Tensor,
    ) -> <SelectedBackend<T> as Backend>::Tensor,
{
    let result = {
        let lhs = x.to_native()?;
        let rhs = val.to_native()?;
        if broadcast_shapes(lhs.shape(), rhs.shape()).is_none() {
            return Err(Error::shape_mismatch(lhs.shape(), rhs.shape()));
        }
        debug!(lhs = ?lhs.shape(), rhs = ?rhs.shape(), op);
        f(&*lhs, &*rhs)
    };

    Ok(match x {
        Value::Framework(mut tensor) => {
            tensor.rebind(result);
            Value::Framework(tensor)
        }
        Value::Native(_) | Value::Traced(_) | Value::Scalar(_) => {
            Value::Framework(Tensor::from(result))
        }
    })
}
