//! Dynamically classified operands.
//!
//! The framework hands the backend values whose nature is only known at run
//! time: its own [`Tensor`] handles, bare native arrays, proxies produced while
//! a function is being traced, or plain numbers. [`Value`] captures that
//! union, and [`is_native_array()`] classifies it against two explicit tag
//! sets.

use std::borrow::Cow;

use ndarray::{ArrayD, IxDyn};

use crate::{
    error::{Error, Result},
    tensor::Tensor,
};

/// Runtime kind of a value the engine recognises as its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    /// A materialised array holding data.
    Array,
    /// A forward-mode differentiation tracer.
    DualTracer,
    /// An abstract value carrying only shape information.
    Shaped,
    /// A tracer recorded while staging a function for compilation.
    StagedTracer,
}

/// Kinds that hold concrete data.
pub const MATERIALIZED_KINDS: &[NativeKind] = &[NativeKind::Array];

/// Kinds that stand in for data produced by a transformation.
pub const TRACE_KINDS: &[NativeKind] = &[
    NativeKind::DualTracer,
    NativeKind::Shaped,
    NativeKind::StagedTracer,
];

/// The transformation a [`Tracer`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceKind {
    /// Forward-mode differentiation.
    Dual,
    /// Shape-only abstract evaluation.
    Shaped,
    /// Staging for deferred compilation.
    Staged,
}

impl From<TraceKind> for NativeKind {
    #[inline]
    fn from(kind: TraceKind) -> Self {
        match kind {
            TraceKind::Dual => Self::DualTracer,
            TraceKind::Shaped => Self::Shaped,
            TraceKind::Staged => Self::StagedTracer,
        }
    }
}

/// Placeholder for an array that has not been materialised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tracer {
    kind: TraceKind,
    shape: Vec<usize>,
}

impl Tracer {
    /// Creates a tracer of `kind` standing in for an array of `shape`.
    #[inline]
    pub const fn new(kind: TraceKind, shape: Vec<usize>) -> Self {
        Self { kind, shape }
    }

    /// The transformation this tracer belongs to.
    #[inline]
    pub const fn kind(&self) -> TraceKind {
        self.kind
    }

    /// Shape of the array it stands in for.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

/// Any operand the framework may pass to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T> {
    /// A framework-owned tensor with a rebindable data slot.
    Framework(Tensor<T>),
    /// A bare native array.
    Native(ArrayD<T>),
    /// A trace proxy with no data.
    Traced(Tracer),
    /// A plain number.
    Scalar(T),
}

impl<T> Value<T> {
    /// The native kind of this value, or `None` for framework tensors and
    /// scalars.
    pub fn native_kind(&self) -> Option<NativeKind> {
        match self {
            Self::Native(_) => Some(NativeKind::Array),
            Self::Traced(tracer) => Some(tracer.kind().into()),
            Self::Framework(_) | Self::Scalar(_) => None,
        }
    }

    /// Returns `true` for anything array-like, framework-owned or native.
    #[inline]
    pub const fn is_array(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }

    /// Returns `true` only for framework-owned tensors.
    #[inline]
    pub const fn is_framework_array(&self) -> bool {
        matches!(self, Self::Framework(_))
    }
}

impl<T> Value<T>
where
    T: Clone,
{
    /// Borrows or builds the native array behind this value.
    ///
    /// Scalars become zero-dimensional arrays.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AbstractValue`] for trace proxies.
    pub fn to_native(&self) -> Result<Cow<'_, ArrayD<T>>> {
        match self {
            Self::Framework(tensor) => Ok(Cow::Borrowed(tensor.data())),
            Self::Native(array) => Ok(Cow::Borrowed(array)),
            Self::Scalar(value) => {
                Ok(Cow::Owned(ArrayD::from_elem(IxDyn(&[]), value.clone())))
            }
            Self::Traced(tracer) => Err(Error::AbstractValue {
                shape: tracer.shape().to_vec(),
            }),
        }
    }

    /// Consumes the value, returning its native array.
    ///
    /// # Errors
    ///
    /// See [`Value::to_native()`].
    pub fn into_native(self) -> Result<ArrayD<T>> {
        match self {
            Self::Framework(tensor) => Ok(tensor.into_native()),
            Self::Native(array) => Ok(array),
            other => other.to_native().map(Cow::into_owned),
        }
    }
}

impl<T> From<Tensor<T>> for Value<T> {
    #[inline]
    fn from(tensor: Tensor<T>) -> Self {
        Self::Framework(tensor)
    }
}

impl<T> From<ArrayD<T>> for Value<T> {
    #[inline]
    fn from(array: ArrayD<T>) -> Self {
        Self::Native(array)
    }
}

impl<T> From<Tracer> for Value<T> {
    #[inline]
    fn from(tracer: Tracer) -> Self {
        Self::Traced(tracer)
    }
}

/// Reports whether `x` is one of the engine's own array kinds.
///
/// With `exclusive` only [`MATERIALIZED_KINDS`] count; otherwise
/// [`TRACE_KINDS`] count as well. Framework tensors and scalars are never
/// native.
pub fn is_native_array<T>(x: &Value<T>, exclusive: bool) -> bool {
    x.native_kind().is_some_and(|kind| {
        MATERIALIZED_KINDS.contains(&kind)
            || (!exclusive && TRACE_KINDS.contains(&kind))
    })
}
