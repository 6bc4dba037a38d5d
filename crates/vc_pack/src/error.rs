use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::String;

use thiserror::Error;

// -----------------------------------------------------------------------------
// PackError

/// Errors raised by the packing engine.
///
/// All failures are raised synchronously at the point of detection.
/// Nothing is retried automatically.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackError {
    /// Growth beyond `MAX_CAPACITY` or the configured ceiling.
    #[error("buffer capacity exceeded: requested {requested} bytes, limit is {limit}")]
    CapacityExceeded { requested: usize, limit: usize },

    /// A read went past the logical length of the buffer.
    #[error("unexpected end of data: needed {needed} bytes, {available} available")]
    UnexpectedEndOfData { needed: usize, available: usize },

    /// A mutation was attempted on a read-only buffer.
    #[error("attempted to modify a read-only buffer")]
    ReadOnlyViolation,

    /// A position was set outside `[0, length]`.
    #[error("position {position} is out of range, length is {length}")]
    OutOfRange { position: usize, length: usize },

    /// Malformed varint, header or payload.
    #[error("invalid encoding: {reason}")]
    InvalidEncoding { reason: Cow<'static, str> },

    /// Any unexpected failure while walking an object graph.
    ///
    /// The original failure is kept as [`source`](core::error::Error::source).
    #[error("data corruption while walking `{type_path}`{trace}: {source}")]
    DataCorruption {
        type_path: &'static str,
        trace: Box<str>,
        source: Box<PackError>,
    },

    /// Nesting went deeper than the configured maximum.
    #[error("maximum nesting depth {limit} exceeded")]
    DepthLimitExceeded { limit: usize },

    /// The registry has no dispatch entry for the type.
    #[error("type `{type_name}` is not registered")]
    UnregisteredType { type_name: Cow<'static, str> },

    /// A value or back-reference resolved to a different type than requested.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: Cow<'static, str>,
    },

    /// A `RefCell` was mutably borrowed while being packed.
    #[error("`{type_path}` is mutably borrowed and cannot be packed")]
    AlreadyBorrowed { type_path: &'static str },

    /// Failure reported by a backing codec.
    #[error("backing codec `{codec}` failed: {message}")]
    Codec { codec: &'static str, message: String },

    /// Failure of an external transport, surfaced unchanged.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// Alias of `Result<T, PackError>`.
pub type PackResult<T> = Result<T, PackError>;

impl PackError {
    #[inline]
    pub(crate) fn invalid(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidEncoding {
            reason: reason.into(),
        }
    }

    #[inline]
    pub(crate) const fn end_of_data(needed: usize, available: usize) -> Self {
        Self::UnexpectedEndOfData { needed, available }
    }

    /// Returns `true` for the recognized end-of-stream condition,
    /// the only failure that is not wrapped into [`PackError::DataCorruption`].
    #[inline]
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, Self::UnexpectedEndOfData { .. })
    }

    /// Returns the innermost error, skipping every `DataCorruption` wrapper.
    ///
    /// # Examples
    ///
    /// ```
    /// use vc_pack::PackError;
    ///
    /// let err = PackError::DataCorruption {
    ///     type_path: "demo::Outer",
    ///     trace: "".into(),
    ///     source: Box::new(PackError::ReadOnlyViolation),
    /// };
    /// assert!(matches!(err.root_cause(), PackError::ReadOnlyViolation));
    /// ```
    pub fn root_cause(&self) -> &PackError {
        let mut current = self;
        while let Self::DataCorruption { source, .. } = current {
            current = source;
        }
        current
    }

    /// Wraps `self` as a [`PackError::DataCorruption`] for `type_path`.
    ///
    /// End-of-data errors and already wrapped errors pass through unchanged.
    pub(crate) fn corrupted(self, type_path: &'static str, trace: Box<str>) -> Self {
        match self {
            Self::UnexpectedEndOfData { .. } | Self::DataCorruption { .. } => self,
            other => {
                log::debug!("wrapping failure in `{type_path}` as data corruption: {other}");
                Self::DataCorruption {
                    type_path,
                    trace,
                    source: Box::new(other),
                }
            }
        }
    }
}
