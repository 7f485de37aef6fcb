use crate::key_value::KeyValue;

/// A normalized call binding: parameter names mapped to their values for one
/// invocation.
///
/// Two call sites that bind the same values to the same parameter names must
/// produce the same cache key, however they spell the call. Every argument is
/// bound to its parameter name when the binding is built, and the fragment
/// renderer sorts pairs by name, so the order in which `arg` is called never
/// affects the key.
///
/// Binding the same name twice keeps the later value.
///
/// # Examples
///
/// ```
/// use generic_cache::CallBinding;
///
/// let b = CallBinding::new().arg("a", 1i64).arg("b", "two");
/// assert_eq!(b.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CallBinding {
    pairs: Vec<(String, KeyValue)>,
}

impl CallBinding {
    /// Creates an empty binding (a zero-argument call).
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Binds `value` to the parameter `name`, consuming and returning the
    /// binding for chaining.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<KeyValue>) -> Self {
        self.pairs.push((name.into(), value.into()));
        self
    }

    /// Number of bound parameters (duplicates counted once per `arg` call).
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates over the pairs in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyValue)> {
        self.pairs.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// The seam between a callable's argument shape and the key pipeline.
///
/// A wrapped callable takes its arguments as one value (typically a small
/// struct or tuple-like type); implementing `CacheArgs` for that value states
/// how each argument binds to its parameter name. The same binding is used for
/// normal calls and for [`flush`](crate::CachedFunction::flush), which is what
/// keeps the two keyed identically.
///
/// # Examples
///
/// ```
/// use generic_cache::{CacheArgs, CallBinding};
///
/// struct SumArgs {
///     a: i64,
///     b: i64,
/// }
///
/// impl CacheArgs for SumArgs {
///     fn bind(&self) -> CallBinding {
///         CallBinding::new().arg("a", self.a).arg("b", self.b)
///     }
/// }
/// ```
pub trait CacheArgs {
    /// Produces the normalized binding for this invocation.
    fn bind(&self) -> CallBinding;
}

/// A zero-argument call.
impl CacheArgs for () {
    fn bind(&self) -> CallBinding {
        CallBinding::new()
    }
}

/// A pre-built binding passes through unchanged.
impl CacheArgs for CallBinding {
    fn bind(&self) -> CallBinding {
        self.clone()
    }
}
