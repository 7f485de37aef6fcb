use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Error raised while deriving a cache key from a call binding.
///
/// A `KeyBuildError` always surfaces before any backend access and before the
/// wrapped callable runs: if the key cannot be derived, nothing else happens.
///
/// # Examples
///
/// ```
/// use generic_cache::{AttrsMethodKeyBuilder, CallBinding, KeyBuildError, KeyBuilder};
///
/// struct NoAttrs;
/// impl generic_cache::AttributeReader for NoAttrs {
///     fn read_attribute(&self, _name: &str) -> Option<generic_cache::KeyValue> {
///         None
///     }
/// }
///
/// let builder = AttrsMethodKeyBuilder::new(["id"]);
/// let err = builder
///     .build(&CallBinding::new(), Some(&NoAttrs))
///     .unwrap_err();
/// assert!(matches!(err, KeyBuildError::MissingAttribute { .. }));
/// ```
#[derive(Debug, Error)]
pub enum KeyBuildError {
    /// A bound value has no canonical encoding (e.g. a `NaN` float).
    #[error("value for `{name}` cannot be canonically encoded: {reason}")]
    UnencodableValue { name: String, reason: String },

    /// A configured attribute could not be read off the receiver instance.
    #[error("attribute `{name}` is not readable on the receiver instance")]
    MissingAttribute { name: String },

    /// A method-style builder was invoked without a receiver.
    #[error("{builder} requires a receiver instance but none was supplied")]
    MissingReceiver { builder: &'static str },

    /// A key component (key type, key version, parameter name) contains
    /// reserved delimiter characters or is empty.
    #[error("invalid {component} `{value}`: {reason}")]
    InvalidKeyComponent {
        component: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Failure reported by a cache backend.
///
/// The orchestrator never interprets these: a failed `get` is *not* treated as
/// a miss, and a failed `set`/`delete` is not swallowed. Backends wrap their
/// transport or storage errors with [`BackendError::with_source`] so callers
/// can still reach the underlying cause.
#[derive(Debug, Error)]
#[error("cache backend failure: {message}")]
pub struct BackendError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl BackendError {
    /// Creates a backend error from a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a backend error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The human-readable failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error returned by cache-side operations (key derivation and backend I/O).
///
/// This is the error type of [`flush`](crate::CachedFunction::flush), where no
/// wrapped callable is involved.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    KeyBuild(#[from] KeyBuildError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Error returned by a cached call.
///
/// Either the cache machinery failed ([`CallError::Cache`]) or the wrapped
/// callable itself failed ([`CallError::Callable`]). Callable failures pass
/// through unchanged and are never stored in the backend.
#[derive(Debug, Error)]
pub enum CallError<E> {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("wrapped callable failed: {0}")]
    Callable(E),
}

impl<E> From<KeyBuildError> for CallError<E> {
    fn from(err: KeyBuildError) -> Self {
        CallError::Cache(CacheError::KeyBuild(err))
    }
}

impl<E> From<BackendError> for CallError<E> {
    fn from(err: BackendError) -> Self {
        CallError::Cache(CacheError::Backend(err))
    }
}

impl<E> CallError<E> {
    /// Returns the wrapped callable error, if that is what failed.
    pub fn into_callable(self) -> Option<E> {
        match self {
            CallError::Callable(err) => Some(err),
            CallError::Cache(_) => None,
        }
    }
}

impl<E: fmt::Display> CallError<E> {
    /// True when the failure came from the wrapped callable rather than the
    /// cache machinery.
    pub fn is_callable(&self) -> bool {
        matches!(self, CallError::Callable(_))
    }
}
