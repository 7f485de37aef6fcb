use crate::error::KeyBuildError;

/// A canonically encodable argument or attribute value.
///
/// Cache keys are derived from textual renderings of the values bound to a
/// call. The rendering has to be *type-stable*: the integer `1` and the string
/// `"1"` must never collide, and a string containing the fragment delimiter
/// must not be able to forge another pair. `KeyValue` achieves this with
/// tagged tokens and byte-length-prefixed strings:
///
/// | Variant        | Encoding        | Example          |
/// |----------------|-----------------|------------------|
/// | `Bool`         | `b:<lit>`       | `b:true`         |
/// | `Int`          | `i:<digits>`    | `i:-7`           |
/// | `UInt`         | `u:<digits>`    | `u:42`           |
/// | `Float`        | `f:<display>`   | `f:2.5`          |
/// | `Str`          | `s:<len>:<raw>` | `s:5:hello`      |
/// | `Bytes`        | `y:<hex>`       | `y:0aff`         |
/// | `None`         | `n:`            | `n:`             |
/// | `Seq`          | `v:<n>:<e,..>`  | `v:2:i:1,i:2`    |
///
/// `NaN` floats have no canonical form and fail with
/// [`KeyBuildError::UnencodableValue`].
///
/// Most values convert via `From`:
///
/// ```
/// use generic_cache::KeyValue;
///
/// assert_eq!(KeyValue::from(1i64), KeyValue::Int(1));
/// assert_eq!(KeyValue::from("1"), KeyValue::Str("1".to_string()));
/// assert_ne!(KeyValue::from(1i64), KeyValue::from("1"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum KeyValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    None,
    Seq(Vec<KeyValue>),
}

impl KeyValue {
    /// Renders the canonical token for this value.
    ///
    /// `name` is only used to contextualize encoding failures.
    pub(crate) fn encode(&self, name: &str) -> Result<String, KeyBuildError> {
        match self {
            KeyValue::Bool(b) => Ok(format!("b:{b}")),
            KeyValue::Int(i) => Ok(format!("i:{i}")),
            KeyValue::UInt(u) => Ok(format!("u:{u}")),
            KeyValue::Float(f) => {
                if f.is_nan() {
                    return Err(KeyBuildError::UnencodableValue {
                        name: name.to_string(),
                        reason: "NaN has no canonical encoding".to_string(),
                    });
                }
                Ok(format!("f:{f}"))
            }
            KeyValue::Str(s) => Ok(format!("s:{}:{}", s.len(), s)),
            KeyValue::Bytes(bytes) => {
                let mut out = String::with_capacity(2 + bytes.len() * 2);
                out.push_str("y:");
                for byte in bytes {
                    out.push_str(&format!("{byte:02x}"));
                }
                Ok(out)
            }
            KeyValue::None => Ok("n:".to_string()),
            KeyValue::Seq(items) => {
                let mut encoded = Vec::with_capacity(items.len());
                for item in items {
                    encoded.push(item.encode(name)?);
                }
                Ok(format!("v:{}:{}", items.len(), encoded.join(",")))
            }
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for KeyValue {
                fn from(value: $ty) -> Self {
                    KeyValue::Int(value as i64)
                }
            }
        )*
    };
}

macro_rules! impl_from_uint {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for KeyValue {
                fn from(value: $ty) -> Self {
                    KeyValue::UInt(value as u64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, isize);
impl_from_uint!(u8, u16, u32, u64, usize);

impl From<bool> for KeyValue {
    fn from(value: bool) -> Self {
        KeyValue::Bool(value)
    }
}

impl From<f32> for KeyValue {
    fn from(value: f32) -> Self {
        KeyValue::Float(value as f64)
    }
}

impl From<f64> for KeyValue {
    fn from(value: f64) -> Self {
        KeyValue::Float(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Str(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Str(value)
    }
}

impl From<char> for KeyValue {
    fn from(value: char) -> Self {
        KeyValue::Str(value.to_string())
    }
}

impl<T: Into<KeyValue>> From<Option<T>> for KeyValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => KeyValue::None,
        }
    }
}

impl<T: Into<KeyValue>> From<Vec<T>> for KeyValue {
    fn from(values: Vec<T>) -> Self {
        KeyValue::Seq(values.into_iter().map(Into::into).collect())
    }
}

impl From<&String> for KeyValue {
    fn from(value: &String) -> Self {
        KeyValue::Str(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(value: impl Into<KeyValue>) -> String {
        value.into().encode("test").unwrap()
    }

    #[test]
    fn test_int_and_str_never_collide() {
        assert_eq!(enc(1i64), "i:1");
        assert_eq!(enc("1"), "s:1:1");
        assert_ne!(enc(1i64), enc("1"));
    }

    #[test]
    fn test_signed_and_unsigned_are_distinct() {
        assert_eq!(enc(7i32), "i:7");
        assert_eq!(enc(7u32), "u:7");
    }

    #[test]
    fn test_string_length_prefix_blocks_delimiter_forgery() {
        // A value containing the pair delimiter cannot masquerade as a pair
        // boundary: the length prefix pins down its extent.
        assert_eq!(enc("a__b_i:1"), "s:8:a__b_i:1");
    }

    #[test]
    fn test_bool_encoding() {
        assert_eq!(enc(true), "b:true");
        assert_eq!(enc(false), "b:false");
    }

    #[test]
    fn test_float_encoding() {
        assert_eq!(enc(2.5f64), "f:2.5");
        assert_eq!(enc(-0.0f64), "f:-0");
        assert_eq!(enc(f64::INFINITY), "f:inf");
    }

    #[test]
    fn test_nan_is_rejected() {
        let err = KeyValue::Float(f64::NAN).encode("x").unwrap_err();
        match err {
            KeyBuildError::UnencodableValue { name, .. } => assert_eq!(name, "x"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_option_encoding() {
        assert_eq!(enc(Option::<i64>::None), "n:");
        assert_eq!(enc(Some(3i64)), "i:3");
    }

    #[test]
    fn test_seq_encoding() {
        assert_eq!(enc(vec![1i64, 2, 3]), "v:3:i:1,i:2,i:3");
        assert_eq!(enc(Vec::<i64>::new()), "v:0:");
    }

    #[test]
    fn test_nested_seq_with_strings() {
        let value = KeyValue::Seq(vec![KeyValue::from("a,b"), KeyValue::from(1i64)]);
        assert_eq!(value.encode("test").unwrap(), "v:2:s:3:a,b,i:1");
    }

    #[test]
    fn test_bytes_encoding() {
        assert_eq!(KeyValue::Bytes(vec![0x0a, 0xff]).encode("b").unwrap(), "y:0aff");
        assert_eq!(KeyValue::Bytes(vec![]).encode("b").unwrap(), "y:");
    }

    #[test]
    fn test_unicode_string_uses_byte_length() {
        assert_eq!(enc("héllo"), format!("s:{}:héllo", "héllo".len()));
    }
}
