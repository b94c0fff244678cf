//! Error type shared by every backend operation.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Failures surfaced by gather/scatter, the mutation layer and configuration.
///
/// Every variant carries enough context for the dispatch layer to report the
/// failure without inspecting the arguments again.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A reduction string did not name one of the supported policies.
    #[error(
        "reduction is {received}, but it must be one of \"sum\", \
         \"replace\", \"min\" or \"max\""
    )]
    InvalidReduction {
        /// The string that was rejected.
        received: String,
    },

    /// Two shapes that must agree (or broadcast) do not.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The shape the operation required.
        expected: Vec<usize>,
        /// The shape it was given.
        actual: Vec<usize>,
    },

    /// An argument combination the operation cannot work with.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Human readable description of the problem.
        reason: String,
    },

    /// An axis outside `[-ndim, ndim)`.
    #[error("axis {axis} is out of bounds for array of dimension {ndim}")]
    AxisOutOfBounds {
        /// The axis as requested by the caller.
        axis: isize,
        /// Rank of the indexed array.
        ndim: usize,
    },

    /// An index outside `[-len, len)` under [`IndexMode::Strict`].
    ///
    /// [`IndexMode::Strict`]: crate::config::IndexMode::Strict
    #[error("index {index} is out of bounds for axis {axis} with size {len}")]
    IndexOutOfBounds {
        /// The index as requested by the caller.
        index: i64,
        /// Axis of the indexed array the index addresses.
        axis: usize,
        /// Extent of that axis.
        len: usize,
    },

    /// The engine's arrays are immutable values and cannot be written in
    /// place.
    #[error("{backend} does not natively support inplace updates")]
    InplaceUnsupported {
        /// Name of the active backend.
        backend: &'static str,
    },

    /// A trace proxy was used where concrete data is required.
    #[error("traced value of shape {shape:?} holds no concrete data")]
    AbstractValue {
        /// Shape the proxy stands in for.
        shape: Vec<usize>,
    },

    /// A shape error raised by the underlying array engine.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

impl Error {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn oversized_shape(shape: &[usize]) -> Self {
        Self::invalid_argument(format!(
            "shape {shape:?} holds more than isize::MAX elements"
        ))
    }

    pub(crate) fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;

    #[test]
    fn invalid_reduction_message_names_received_value() {
        let error = Error::InvalidReduction {
            received: "avg".to_owned(),
        };

        assert!(error.to_string().starts_with("reduction is avg,"));
    }

    #[test]
    fn inplace_unsupported_message_names_backend() {
        let error = Error::InplaceUnsupported { backend: "ndarray" };

        assert_eq!(
            error.to_string(),
            "ndarray does not natively support inplace updates"
        );
    }
}
