use std::fmt;
use std::time::Duration;

use crate::error::KeyBuildError;
use crate::key_builder::PAIR_DELIMITER;

/// Per-function key configuration: the key type tag, an optional version tag,
/// and an optional timeout override.
///
/// The key type identifies one decorated callable inside a shared prefix.
/// Bumping the version changes every key the callable produces, which is the
/// supported way to invalidate all of its entries at once: old entries are
/// orphaned (unreachable), not deleted.
///
/// The underscore is reserved key syntax, so key types and versions must not
/// contain it (use hyphens). This is what keeps assembly injective: no two
/// distinct `(key_type, key_version, fragment)` triples can render the same
/// key for a fixed prefix.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use generic_cache::KeySpec;
///
/// let spec = KeySpec::new("long-id-sum")
///     .unwrap()
///     .with_version("v2")
///     .unwrap()
///     .with_timeout(Duration::from_secs(30));
/// assert_eq!(spec.key_type(), "long-id-sum");
/// ```
#[derive(Clone, Debug)]
pub struct KeySpec {
    key_type: String,
    key_version: Option<String>,
    timeout: Option<Duration>,
}

impl KeySpec {
    /// Creates a spec for the given key type tag.
    ///
    /// Fails if the tag is empty or contains `_`.
    pub fn new(key_type: impl Into<String>) -> Result<Self, KeyBuildError> {
        let key_type = key_type.into();
        validate_component("key type", &key_type)?;
        Ok(Self {
            key_type,
            key_version: None,
            timeout: None,
        })
    }

    /// Sets the key version tag.
    ///
    /// Fails if the tag is empty or contains `_`.
    pub fn with_version(mut self, version: impl Into<String>) -> Result<Self, KeyBuildError> {
        let version = version.into();
        validate_component("key version", &version)?;
        self.key_version = Some(version);
        Ok(self)
    }

    /// Sets the per-function timeout override.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    pub fn key_version(&self) -> Option<&str> {
        self.key_version.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// A fully assembled backend key.
///
/// Layout: `prefix + key_type [+ "_" + key_version] [+ "__" + fragment]`.
/// The fragment part is omitted for zero-argument calls.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Assembles the final key. Pure and stateless; component validation has
    /// already happened in [`KeySpec`] and the key builder.
    pub fn assemble(prefix: &str, spec: &KeySpec, fragment: &str) -> Self {
        let mut key = String::with_capacity(
            prefix.len() + spec.key_type.len() + fragment.len() + 8,
        );
        key.push_str(prefix);
        key.push_str(&spec.key_type);
        if let Some(version) = &spec.key_version {
            key.push('_');
            key.push_str(version);
        }
        if !fragment.is_empty() {
            key.push_str(PAIR_DELIMITER);
            key.push_str(fragment);
        }
        CacheKey(key)
    }

    /// The key as seen by the backend.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_component(component: &'static str, value: &str) -> Result<(), KeyBuildError> {
    if value.is_empty() {
        return Err(KeyBuildError::InvalidKeyComponent {
            component,
            value: value.to_string(),
            reason: "must not be empty",
        });
    }
    if value.contains('_') {
        return Err(KeyBuildError::InvalidKeyComponent {
            component,
            value: value.to_string(),
            reason: "must not contain `_` (reserved key syntax, use `-`)",
        });
    }
    Ok(())
}
