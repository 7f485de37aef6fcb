//! # generic-cache
//!
//! Argument-keyed memoization of callables behind pluggable storage backends.
//!
//! A [`GenericCache`] wraps callables so that each invocation derives a
//! deterministic storage key from its arguments (and, optionally, selected
//! attributes of the receiver), then runs a lookup-or-compute-and-store
//! pipeline against a [`CacheBackend`]. Storage policy such as eviction,
//! persistence, or distribution lives entirely in the backend and can be
//! swapped without touching call sites.
//!
//! ## Key derivation
//!
//! - Arguments are normalized into a [`CallBinding`] (name → value), so the
//!   key never depends on how a call site spells its arguments.
//! - A [`KeyBuilder`] renders the binding into a canonical fragment:
//!   [`FunctionKeyBuilder`] for free functions, [`MethodKeyBuilder`] for
//!   methods, [`AttrsMethodKeyBuilder`] to additionally key on selected
//!   receiver attributes read through [`AttributeReader`].
//! - [`CacheKey`] assembles `prefix + key_type [+ "_" + version] + "__" +
//!   fragment`. Bumping the version in a [`KeySpec`] invalidates every key of
//!   a callable by orphaning the old entries.
//!
//! Values are rendered through [`KeyValue`]'s tagged, type-stable encoding:
//! the integer `1` and the string `"1"` can never produce the same key.
//!
//! ## Per-call control
//!
//! [`CallOptions`] carries two independent flags: `disable_cache` bypasses
//! the read (the callable always executes), `disable_cache_overwrite`
//! bypasses the write. Neither is ever part of the key or visible to the
//! wrapped callable. Each wrapper also exposes `flush`, keyed exactly like a
//! call, whose only effect is a backend delete.
//!
//! ## What this crate does not do
//!
//! There is no cache-stampede protection: two callers racing on the same
//! missing key may both compute and both write, last write wins. Backend
//! failures are not masked as misses, and callable failures are never
//! cached.
//!
//! ## Example
//!
//! ```
//! use std::convert::Infallible;
//! use generic_cache::{
//!     AttrsMethodKeyBuilder, AttributeReader, CacheArgs, CallBinding, GenericCache,
//!     InMemoryBackend, KeySpec, KeyValue,
//! };
//!
//! struct Account {
//!     id_number: u64,
//! }
//!
//! impl AttributeReader for Account {
//!     fn read_attribute(&self, name: &str) -> Option<KeyValue> {
//!         match name {
//!             "id_number" => Some(KeyValue::from(self.id_number)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! struct AddArgs {
//!     n: i64,
//! }
//!
//! impl CacheArgs for AddArgs {
//!     fn bind(&self) -> CallBinding {
//!         CallBinding::new().arg("n", self.n)
//!     }
//! }
//!
//! let cache = GenericCache::new(
//!     "Accounts.",
//!     InMemoryBackend::new(),
//!     AttrsMethodKeyBuilder::new(["id_number"]),
//!     None,
//! );
//! let long_id_sum = cache.cached_method(
//!     KeySpec::new("long-id-sum").unwrap(),
//!     |account: &Account, args: &AddArgs| {
//!         Ok::<i64, Infallible>(account.id_number as i64 + args.n)
//!     },
//! );
//!
//! let account = Account { id_number: 42 };
//! assert_eq!(long_id_sum.call(&account, &AddArgs { n: 1 }).unwrap(), 43);
//! ```

mod backend;
mod binding;
mod cache;
mod error;
mod key;
mod key_builder;
mod key_value;

#[cfg(feature = "stats")]
mod stats;

#[cfg(feature = "stats")]
pub mod stats_registry;

pub use backend::{CacheBackend, InMemoryBackend};
pub use binding::{CacheArgs, CallBinding};
pub use cache::{CachedFunction, CachedMethod, CallOptions, GenericCache};
pub use error::{BackendError, CacheError, CallError, KeyBuildError};
pub use key::{CacheKey, KeySpec};
pub use key_builder::{
    AttributeReader, AttrsMethodKeyBuilder, FunctionKeyBuilder, KeyBuilder, MethodKeyBuilder,
};
pub use key_value::KeyValue;

#[cfg(feature = "stats")]
pub use stats::CacheStats;
