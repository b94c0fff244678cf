//! [`ndarray`] crate backend.
//!
//! Arrays of this backend are immutable values: every operation builds and
//! returns a new [`ArrayD`]. In-place mutation is emulated one level up, by
//! rebinding the data slot of a [`Tensor`](crate::tensor::Tensor).

mod gather;
mod index;
mod scatter;

use core::{fmt::Debug, marker::PhantomData, ops::Sub};

use ndarray::{ArrayD, IxDyn};
use num_traits::{One, Zero};
use tracing::trace;

use crate::{
    backend::{Backend, Reduction, ScatterIndices},
    config::{self, Device},
    error::Result,
};

/// Element types the [`ndarray`] backend can store.
pub trait Element:
    Clone + Debug + PartialOrd + Zero + One + Sub<Output = Self>
{
}

impl<T> Element for T where
    T: Clone + Debug + PartialOrd + Zero + One + Sub<Output = Self>
{
}

/// Marker type for the [`ndarray`] backend.
#[derive(Debug)]
pub struct NdarrayBackend<T>
where
    T: Clone,
{
    _marker: PhantomData<T>,
}

impl<T> Backend for NdarrayBackend<T>
where
    T: Element,
{
    type Indices = ArrayD<i64>;
    type Primitive = T;
    type Tensor = ArrayD<T>;

    const NAME: &'static str = "ndarray";

    #[inline]
    unsafe fn add(lhs: &Self::Tensor, rhs: &Self::Tensor) -> Self::Tensor {
        lhs + rhs
    }

    #[inline]
    fn array_equal(lhs: &Self::Tensor, rhs: &Self::Tensor) -> bool {
        lhs == rhs
    }

    #[inline]
    unsafe fn from_vec(
        data: Vec<Self::Primitive>,
        shape: &[usize],
    ) -> Self::Tensor {
        // SAFETY: The caller has already guaranteed that the shape is valid
        // and the element count in `data` matches the shape's requirements.
        unsafe { ArrayD::from_shape_vec_unchecked(IxDyn(shape), data) }
    }

    fn gather(
        params: &Self::Tensor,
        indices: &Self::Indices,
        axis: isize,
        batch_dims: usize,
    ) -> Result<Self::Tensor> {
        gather::gather(params, indices, axis, batch_dims).map(Self::to_device)
    }

    fn gather_nd(
        params: &Self::Tensor,
        indices: &Self::Indices,
    ) -> Result<Self::Tensor> {
        gather::gather_nd(params, indices).map(Self::to_device)
    }

    #[inline]
    fn inplace_arrays_supported() -> bool {
        false
    }

    #[inline]
    fn inplace_variables_supported() -> bool {
        false
    }

    #[inline]
    fn ndim(tensor: &Self::Tensor) -> usize {
        tensor.ndim()
    }

    fn scatter_flat(
        indices: &Self::Indices,
        updates: &Self::Tensor,
        size: Option<usize>,
        reduction: Reduction,
        target: Option<&Self::Tensor>,
    ) -> Result<Self::Tensor> {
        scatter::scatter_flat(indices, updates, size, reduction, target)
            .map(Self::to_device)
    }

    fn scatter_nd(
        indices: ScatterIndices<&Self::Indices>,
        updates: &Self::Tensor,
        shape: Option<&[usize]>,
        reduction: Reduction,
        target: Option<&Self::Tensor>,
    ) -> Result<Self::Tensor> {
        scatter::scatter_nd(indices, updates, shape, reduction, target)
            .map(Self::to_device)
    }

    #[inline]
    fn shape(tensor: &Self::Tensor) -> &[usize] {
        tensor.shape()
    }

    #[inline]
    unsafe fn sub(lhs: &Self::Tensor, rhs: &Self::Tensor) -> Self::Tensor {
        lhs - rhs
    }

    fn to_device(tensor: Self::Tensor) -> Self::Tensor {
        match config::current().device {
            Device::Cpu if tensor.is_standard_layout() => tensor,
            Device::Cpu => {
                trace!(shape = ?tensor.shape(), "relayout to row-major");
                tensor.as_standard_layout().into_owned()
            }
        }
    }

    #[inline]
    fn to_vec(tensor: &Self::Tensor) -> Vec<Self::Primitive> {
        tensor.iter().cloned().collect()
    }

    #[inline]
    unsafe fn zeros(shape: &[usize]) -> Self::Tensor {
        ArrayD::zeros(IxDyn(shape))
    }
}
