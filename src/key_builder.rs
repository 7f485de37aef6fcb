use std::collections::BTreeMap;

use crate::binding::CallBinding;
use crate::error::KeyBuildError;
use crate::key_value::KeyValue;

/// Delimiter between `name_value` pairs inside a key fragment.
pub(crate) const PAIR_DELIMITER: &str = "__";

/// Capability to read named attributes off a receiver instance.
///
/// Given an attribute name, an implementor returns the corresponding
/// [`KeyValue`], or `None` when the attribute does not exist. The
/// attribute-sensitive builder turns a `None` into
/// [`KeyBuildError::MissingAttribute`].
///
/// # Examples
///
/// ```
/// use generic_cache::{AttributeReader, KeyValue};
///
/// struct Account {
///     id_number: u64,
/// }
///
/// impl AttributeReader for Account {
///     fn read_attribute(&self, name: &str) -> Option<KeyValue> {
///         match name {
///             "id_number" => Some(KeyValue::from(self.id_number)),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait AttributeReader {
    /// Resolves `name` against this instance, or `None` if absent.
    fn read_attribute(&self, name: &str) -> Option<KeyValue>;
}

/// Maps a normalized call binding (plus optional receiver) to a key fragment.
///
/// The fragment is a pure, deterministic function of its inputs: pairs are
/// collected into a name-sorted map before rendering, so neither binding order
/// nor any hash-map iteration order can leak into the key.
pub trait KeyBuilder: Send + Sync {
    /// Builds the key fragment for one invocation.
    fn build(
        &self,
        binding: &CallBinding,
        receiver: Option<&dyn AttributeReader>,
    ) -> Result<String, KeyBuildError>;
}

/// Key builder for free functions: the fragment covers the full binding and
/// no receiver participates. A receiver passed anyway is ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct FunctionKeyBuilder;

impl KeyBuilder for FunctionKeyBuilder {
    fn build(
        &self,
        binding: &CallBinding,
        _receiver: Option<&dyn AttributeReader>,
    ) -> Result<String, KeyBuildError> {
        render_fragment(collect_pairs(binding)?)
    }
}

/// Key builder for methods.
///
/// The receiver never enters the [`CallBinding`] in this API; it travels as
/// the separate `receiver` argument, so the fragment is identical to the
/// function-style one. What this builder adds is the wiring check: building a
/// method key without a receiver is a configuration mistake and fails with
/// [`KeyBuildError::MissingReceiver`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MethodKeyBuilder;

impl KeyBuilder for MethodKeyBuilder {
    fn build(
        &self,
        binding: &CallBinding,
        receiver: Option<&dyn AttributeReader>,
    ) -> Result<String, KeyBuildError> {
        if receiver.is_none() {
            return Err(KeyBuildError::MissingReceiver {
                builder: "MethodKeyBuilder",
            });
        }
        render_fragment(collect_pairs(binding)?)
    }
}

/// Method key builder that also keys on selected receiver attributes.
///
/// The configured attribute names are read off the receiver on every call, in
/// order, and their values join the binding pairs in the fragment. Attributes
/// outside the selection never influence the key, even if they change between
/// calls. An attribute sharing a name with a bound parameter overrides it.
///
/// # Examples
///
/// ```
/// use generic_cache::{AttrsMethodKeyBuilder, AttributeReader, CallBinding, KeyBuilder, KeyValue};
///
/// struct Account {
///     id_number: u64,
///     nickname: String,
/// }
///
/// impl AttributeReader for Account {
///     fn read_attribute(&self, name: &str) -> Option<KeyValue> {
///         match name {
///             "id_number" => Some(KeyValue::from(self.id_number)),
///             "nickname" => Some(KeyValue::from(self.nickname.as_str())),
///             _ => None,
///         }
///     }
/// }
///
/// let builder = AttrsMethodKeyBuilder::new(["id_number"]);
/// let account = Account { id_number: 42, nickname: "ignored".to_string() };
/// let fragment = builder
///     .build(&CallBinding::new().arg("x", 1i64), Some(&account))
///     .unwrap();
/// assert_eq!(fragment, "id_number_u:42__x_i:1");
/// ```
#[derive(Clone, Debug)]
pub struct AttrsMethodKeyBuilder {
    attrs: Vec<String>,
}

impl AttrsMethodKeyBuilder {
    /// Creates a builder keyed on the given attribute names, in order.
    pub fn new<I, S>(attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attrs: attrs.into_iter().map(Into::into).collect(),
        }
    }

    /// The configured attribute selection.
    pub fn attrs(&self) -> &[String] {
        &self.attrs
    }
}

impl KeyBuilder for AttrsMethodKeyBuilder {
    fn build(
        &self,
        binding: &CallBinding,
        receiver: Option<&dyn AttributeReader>,
    ) -> Result<String, KeyBuildError> {
        let receiver = receiver.ok_or(KeyBuildError::MissingReceiver {
            builder: "AttrsMethodKeyBuilder",
        })?;

        let mut pairs = collect_pairs(binding)?;
        for attr in &self.attrs {
            validate_name(attr)?;
            let value =
                receiver
                    .read_attribute(attr)
                    .ok_or_else(|| KeyBuildError::MissingAttribute {
                        name: attr.clone(),
                    })?;
            pairs.insert(attr.clone(), value.encode(attr)?);
        }
        render_fragment(pairs)
    }
}

/// Encodes the binding into a name-sorted pair map; later duplicates win.
fn collect_pairs(binding: &CallBinding) -> Result<BTreeMap<String, String>, KeyBuildError> {
    let mut pairs = BTreeMap::new();
    for (name, value) in binding.iter() {
        validate_name(name)?;
        pairs.insert(name.to_string(), value.encode(name)?);
    }
    Ok(pairs)
}

/// Renders sorted pairs as `name_value` joined by [`PAIR_DELIMITER`].
fn render_fragment(pairs: BTreeMap<String, String>) -> Result<String, KeyBuildError> {
    let rendered: Vec<String> = pairs
        .into_iter()
        .map(|(name, encoded)| format!("{name}_{encoded}"))
        .collect();
    Ok(rendered.join(PAIR_DELIMITER))
}

/// Parameter and attribute names may contain `_` (encoded values carry a `:`
/// at a fixed offset, which keeps the pair parse unambiguous) but not `:`,
/// and must be non-empty.
fn validate_name(name: &str) -> Result<(), KeyBuildError> {
    if name.is_empty() {
        return Err(KeyBuildError::InvalidKeyComponent {
            component: "parameter name",
            value: name.to_string(),
            reason: "must not be empty",
        });
    }
    if name.contains(':') {
        return Err(KeyBuildError::InvalidKeyComponent {
            component: "parameter name",
            value: name.to_string(),
            reason: "must not contain `:`",
        });
    }
    Ok(())
}
