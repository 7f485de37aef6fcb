use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::backend::CacheBackend;
use crate::binding::CacheArgs;
use crate::error::{CacheError, CallError, KeyBuildError};
use crate::key::{CacheKey, KeySpec};
use crate::key_builder::{AttributeReader, KeyBuilder};
#[cfg(feature = "stats")]
use crate::stats::CacheStats;
#[cfg(feature = "stats")]
use crate::stats_registry;

/// Per-call cache control flags.
///
/// These never reach the key builder or the wrapped callable: they travel as
/// a separate options value, outside the argument shape, and are discarded
/// when the call returns.
///
/// The two flags are independent. `disable_cache` bypasses the read (the
/// callable always runs) but the result is still written;
/// `disable_cache_overwrite` bypasses the write after a computation. Set both
/// to neither read nor write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Skip the backend lookup; the wrapped callable executes unconditionally.
    pub disable_cache: bool,
    /// Skip storing a freshly computed result.
    pub disable_cache_overwrite: bool,
}

impl CallOptions {
    /// Both flags off, the normal caching path.
    pub const fn new() -> Self {
        Self {
            disable_cache: false,
            disable_cache_overwrite: false,
        }
    }
}

/// Orchestrator configuration: key prefix, backend, key builder, and default
/// timeout, fixed at construction.
///
/// A `GenericCache` hands out [`CachedFunction`] and [`CachedMethod`]
/// wrappers that share its backend and key builder. It holds no per-call
/// state of its own.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
/// use generic_cache::{
///     CacheArgs, CallBinding, FunctionKeyBuilder, GenericCache, InMemoryBackend, KeySpec,
/// };
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
///
/// let cache = GenericCache::new("Demo.", InMemoryBackend::new(), FunctionKeyBuilder, None);
/// let sum = cache.cached_fn(KeySpec::new("sum").unwrap(), |args: &SumArgs| {
///     Ok::<i64, Infallible>(args.a + args.b)
/// });
///
/// let args = SumArgs { a: 1, b: 2 };
/// assert_eq!(sum.call(&args).unwrap(), 3);
/// assert_eq!(sum.call(&args).unwrap(), 3); // served from the backend
/// sum.flush(&args).unwrap();
/// ```
pub struct GenericCache<B> {
    prefix: String,
    backend: Arc<B>,
    key_builder: Arc<dyn KeyBuilder>,
    default_timeout: Option<Duration>,
}

impl<B> GenericCache<B> {
    /// Creates an orchestrator with the given prefix, backend, key builder,
    /// and default timeout (`None` defers to the backend's own retention).
    pub fn new(
        prefix: impl Into<String>,
        backend: B,
        key_builder: impl KeyBuilder + 'static,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            backend: Arc::new(backend),
            key_builder: Arc::new(key_builder),
            default_timeout,
        }
    }

    /// The shared backend instance.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The configured key prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The configured default timeout.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Wraps a free function (or closure) under the given key spec.
    ///
    /// The callable receives the argument value by reference; its `Err` is
    /// passed through unchanged and never stored.
    pub fn cached_fn<F>(&self, spec: KeySpec, func: F) -> CachedFunction<B, F> {
        CachedFunction {
            core: self.core(spec),
            func,
        }
    }

    /// Wraps a method-like callable: the receiver travels separately from
    /// the arguments and is available to attribute-sensitive key builders.
    pub fn cached_method<F>(&self, spec: KeySpec, func: F) -> CachedMethod<B, F> {
        CachedMethod {
            core: self.core(spec),
            func,
        }
    }

    fn core(&self, spec: KeySpec) -> CacheCore<B> {
        #[cfg(feature = "stats")]
        let stats = stats_registry::register(&format!("{}{}", self.prefix, spec.key_type()));
        CacheCore {
            prefix: self.prefix.clone(),
            backend: Arc::clone(&self.backend),
            key_builder: Arc::clone(&self.key_builder),
            default_timeout: self.default_timeout,
            spec,
            #[cfg(feature = "stats")]
            stats,
        }
    }
}

/// Shared per-wrapper state and the lookup/compute/store/flush pipeline.
struct CacheCore<B> {
    prefix: String,
    backend: Arc<B>,
    key_builder: Arc<dyn KeyBuilder>,
    default_timeout: Option<Duration>,
    spec: KeySpec,
    #[cfg(feature = "stats")]
    stats: Arc<CacheStats>,
}

impl<B> CacheCore<B> {
    fn build_key<A: CacheArgs>(
        &self,
        args: &A,
        receiver: Option<&dyn AttributeReader>,
    ) -> Result<CacheKey, KeyBuildError> {
        let binding = args.bind();
        let fragment = self.key_builder.build(&binding, receiver)?;
        Ok(CacheKey::assemble(&self.prefix, &self.spec, &fragment))
    }

    /// Key timeout wins over the orchestrator default; `None` leaves
    /// retention to the backend.
    fn effective_timeout(&self) -> Option<Duration> {
        self.spec.timeout().or(self.default_timeout)
    }
}

impl<B: CacheBackend> CacheCore<B> {
    fn lookup_or_compute<E>(
        &self,
        key: &CacheKey,
        options: CallOptions,
        compute: impl FnOnce() -> Result<B::Value, E>,
    ) -> Result<B::Value, CallError<E>>
    where
        B::Value: Clone,
    {
        if !options.disable_cache {
            if let Some(value) = self.backend.get(key.as_str())? {
                debug!(key = %key, "cache hit");
                #[cfg(feature = "stats")]
                self.stats.record_hit();
                return Ok(value);
            }
            debug!(key = %key, "cache miss");
            #[cfg(feature = "stats")]
            self.stats.record_miss();
        }

        let value = compute().map_err(CallError::Callable)?;

        if !options.disable_cache_overwrite {
            self.backend
                .set(key.as_str(), value.clone(), self.effective_timeout())?;
            debug!(key = %key, "stored computed value");
            #[cfg(feature = "stats")]
            self.stats.record_store();
        }
        Ok(value)
    }

    fn flush_key(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.backend.delete(key.as_str())?;
        debug!(key = %key, "flushed");
        #[cfg(feature = "stats")]
        self.stats.record_flush();
        Ok(())
    }
}

/// A free function wrapped with caching behavior.
///
/// The wrapper is itself the callable surface: [`call`](Self::call) runs the
/// lookup-or-compute-and-store pipeline, [`flush`](Self::flush) deletes the
/// entry the same arguments would have hit. The original callable is owned,
/// never mutated.
pub struct CachedFunction<B, F> {
    core: CacheCore<B>,
    func: F,
}

impl<B: CacheBackend, F> CachedFunction<B, F> {
    /// Calls through the cache with default [`CallOptions`].
    pub fn call<A, E>(&self, args: &A) -> Result<B::Value, CallError<E>>
    where
        A: CacheArgs,
        B::Value: Clone,
        F: Fn(&A) -> Result<B::Value, E>,
    {
        self.call_with_options(args, CallOptions::new())
    }

    /// Calls through the cache.
    ///
    /// Pipeline: derive the key (failures surface before anything else), then
    /// unless `disable_cache` consult the backend; a hit returns immediately
    /// without invoking the callable. On a miss the callable runs with the
    /// original arguments; unless `disable_cache_overwrite` its result is
    /// stored under the key with the effective timeout.
    ///
    /// Exactly one backend read happens per call (none when `disable_cache`)
    /// and at most one write. Concurrent callers racing on a missing key may
    /// each compute and write; the last write wins.
    pub fn call_with_options<A, E>(
        &self,
        args: &A,
        options: CallOptions,
    ) -> Result<B::Value, CallError<E>>
    where
        A: CacheArgs,
        B::Value: Clone,
        F: Fn(&A) -> Result<B::Value, E>,
    {
        let key = self.core.build_key(args, None)?;
        self.core
            .lookup_or_compute(&key, options, || (self.func)(args))
    }

    /// Deletes the entry the same arguments would address. No read, no
    /// callable invocation.
    pub fn flush<A: CacheArgs>(&self, args: &A) -> Result<(), CacheError> {
        let key = self.core.build_key(args, None)?;
        self.core.flush_key(&key)
    }

    /// The key a call with these arguments would use.
    pub fn cache_key<A: CacheArgs>(&self, args: &A) -> Result<CacheKey, KeyBuildError> {
        self.core.build_key(args, None)
    }

    /// This wrapper's statistics counters.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.core.stats
    }
}

/// A method wrapped with caching behavior.
///
/// Identical contract to [`CachedFunction`], with the receiver passed
/// alongside the arguments on every operation, including
/// [`flush`](Self::flush), which must address the same key a call would.
/// Attribute-sensitive key builders read their configured attributes off the
/// receiver through [`AttributeReader`].
pub struct CachedMethod<B, F> {
    core: CacheCore<B>,
    func: F,
}

impl<B: CacheBackend, F> CachedMethod<B, F> {
    /// Calls through the cache with default [`CallOptions`].
    pub fn call<I, A, E>(&self, receiver: &I, args: &A) -> Result<B::Value, CallError<E>>
    where
        I: AttributeReader,
        A: CacheArgs,
        B::Value: Clone,
        F: Fn(&I, &A) -> Result<B::Value, E>,
    {
        self.call_with_options(receiver, args, CallOptions::new())
    }

    /// Calls through the cache; see [`CachedFunction::call_with_options`]
    /// for the pipeline contract.
    pub fn call_with_options<I, A, E>(
        &self,
        receiver: &I,
        args: &A,
        options: CallOptions,
    ) -> Result<B::Value, CallError<E>>
    where
        I: AttributeReader,
        A: CacheArgs,
        B::Value: Clone,
        F: Fn(&I, &A) -> Result<B::Value, E>,
    {
        let key = self.core.build_key(args, Some(receiver))?;
        self.core
            .lookup_or_compute(&key, options, || (self.func)(receiver, args))
    }

    /// Deletes the entry the same receiver and arguments would address.
    pub fn flush<I, A>(&self, receiver: &I, args: &A) -> Result<(), CacheError>
    where
        I: AttributeReader,
        A: CacheArgs,
    {
        let key = self.core.build_key(args, Some(receiver))?;
        self.core.flush_key(&key)
    }

    /// The key a call with this receiver and these arguments would use.
    pub fn cache_key<I, A>(&self, receiver: &I, args: &A) -> Result<CacheKey, KeyBuildError>
    where
        I: AttributeReader,
        A: CacheArgs,
    {
        self.core.build_key(args, Some(receiver))
    }

    /// This wrapper's statistics counters.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.core.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::CallBinding;
    use crate::key_builder::FunctionKeyBuilder;
    use crate::InMemoryBackend;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct XArgs {
        x: i64,
    }

    impl CacheArgs for XArgs {
        fn bind(&self) -> CallBinding {
            CallBinding::new().arg("x", self.x)
        }
    }

    fn cache() -> GenericCache<InMemoryBackend<i64>> {
        GenericCache::new("Test.", InMemoryBackend::new(), FunctionKeyBuilder, None)
    }

    #[test]
    fn test_hit_skips_the_callable() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let double = cache.cached_fn(KeySpec::new("double").unwrap(), |args: &XArgs| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(args.x * 2)
        });

        assert_eq!(double.call(&XArgs { x: 3 }).unwrap(), 6);
        assert_eq!(double.call(&XArgs { x: 3 }).unwrap(), 6);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_args_use_distinct_keys() {
        let cache = cache();
        let double = cache.cached_fn(KeySpec::new("double").unwrap(), |args: &XArgs| {
            Ok::<_, Infallible>(args.x * 2)
        });

        assert_eq!(double.call(&XArgs { x: 1 }).unwrap(), 2);
        assert_eq!(double.call(&XArgs { x: 2 }).unwrap(), 4);
        assert_eq!(cache.backend().len(), 2);
    }

    #[test]
    fn test_key_layout() {
        let cache = cache();
        let double = cache.cached_fn(KeySpec::new("double").unwrap(), |args: &XArgs| {
            Ok::<_, Infallible>(args.x * 2)
        });
        let key = double.cache_key(&XArgs { x: 3 }).unwrap();
        assert_eq!(key.as_str(), "Test.double__x_i:3");
    }

    #[test]
    fn test_flush_then_call_recomputes() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let double = cache.cached_fn(KeySpec::new("double").unwrap(), |args: &XArgs| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(args.x * 2)
        });

        double.call(&XArgs { x: 3 }).unwrap();
        double.flush(&XArgs { x: 3 }).unwrap();
        double.call(&XArgs { x: 3 }).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callable_error_is_not_stored() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let flaky = cache.cached_fn(KeySpec::new("flaky").unwrap(), |_args: &XArgs| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("first call fails".to_string())
            } else {
                Ok(7)
            }
        });

        let err = flaky.call(&XArgs { x: 1 }).unwrap_err();
        assert!(err.is_callable());
        assert!(cache.backend().is_empty());

        // A later call re-attempts and caches the success.
        assert_eq!(flaky.call(&XArgs { x: 1 }).unwrap(), 7);
        assert_eq!(cache.backend().len(), 1);
    }

    #[test]
    fn test_key_build_error_precedes_everything() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let nan = cache.cached_fn(KeySpec::new("nan").unwrap(), |_args: &CallBinding| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(0)
        });

        let args = CallBinding::new().arg("x", f64::NAN);
        let err = nan.call(&args).unwrap_err();
        assert!(matches!(
            err,
            CallError::Cache(CacheError::KeyBuild(KeyBuildError::UnencodableValue { .. }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.backend().is_empty());
    }

    #[test]
    fn test_effective_timeout_prefers_spec_over_default() {
        let cache = GenericCache::new(
            "Test.",
            InMemoryBackend::<i64>::new(),
            FunctionKeyBuilder,
            Some(Duration::from_secs(60)),
        );
        let spec = KeySpec::new("t")
            .unwrap()
            .with_timeout(Duration::from_secs(10));
        let core = cache.core(spec);
        assert_eq!(core.effective_timeout(), Some(Duration::from_secs(10)));

        let core = cache.core(KeySpec::new("u").unwrap());
        assert_eq!(core.effective_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_no_timeout_anywhere_defers_to_backend() {
        let cache = cache();
        let core = cache.core(KeySpec::new("t").unwrap());
        assert_eq!(core.effective_timeout(), None);
    }
}
