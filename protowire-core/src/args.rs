//! Argument conversion for Query and Form encodings.
//!
//! Query and Form parameters travel as strings keyed by the wire-cased
//! parameter name. [`ToArgument`] stringifies a value on the client,
//! [`FromArgument`] reads it back on the server. A per-parameter
//! [`ArgumentCodec`] overrides both directions for one field only.

use crate::ProtoError;

/// Conversion from a raw Query/Form value.
///
/// A missing or empty raw value yields the type's default so that Form
/// default-value omission round-trips. A present but malformed value is a
/// serialization error, promoted to the generic structured error path.
pub trait FromArgument: Sized {
    fn from_argument(name: &str, raw: Option<&str>) -> Result<Self, ProtoError>;
}

/// Conversion to a raw Query/Form value.
pub trait ToArgument {
    fn to_argument(&self) -> String;

    /// Whether a Form encoder must omit this value entirely. Query encoding
    /// never omits.
    fn is_omitted(&self) -> bool {
        false
    }
}

/// Custom serialization override for a single parameter, substituted for the
/// default scalar read/write logic on that field only.
pub trait ArgumentCodec<T> {
    fn decode(name: &str, raw: Option<&str>) -> Result<T, ProtoError>;
    fn encode(value: &T) -> String;
}

macro_rules! scalar_argument {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromArgument for $ty {
                fn from_argument(name: &str, raw: Option<&str>) -> Result<Self, ProtoError> {
                    match raw {
                        None | Some("") => Ok(Self::default()),
                        Some(value) => value.parse().map_err(|_| {
                            ProtoError::generic(format!(
                                "malformed value {value:?} for parameter `{name}`"
                            ))
                        }),
                    }
                }
            }

            impl ToArgument for $ty {
                fn to_argument(&self) -> String {
                    self.to_string()
                }

                fn is_omitted(&self) -> bool {
                    *self == Self::default()
                }
            }
        )*
    };
}

scalar_argument!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize, f32, f64, bool);

impl FromArgument for String {
    fn from_argument(_name: &str, raw: Option<&str>) -> Result<Self, ProtoError> {
        Ok(raw.unwrap_or_default().to_owned())
    }
}

impl ToArgument for String {
    fn to_argument(&self) -> String {
        self.clone()
    }
}

impl ToArgument for &str {
    fn to_argument(&self) -> String {
        (*self).to_owned()
    }
}

impl<T: FromArgument> FromArgument for Option<T> {
    fn from_argument(name: &str, raw: Option<&str>) -> Result<Self, ProtoError> {
        match raw {
            None => Ok(None),
            Some(value) => T::from_argument(name, Some(value)).map(Some),
        }
    }
}

impl<T: ToArgument> ToArgument for Option<T> {
    fn to_argument(&self) -> String {
        match self {
            Some(value) => value.to_argument(),
            None => String::new(),
        }
    }

    fn is_omitted(&self) -> bool {
        self.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_scalar_reads_as_default() {
        assert_eq!(i32::from_argument("id", None).unwrap(), 0);
        assert_eq!(i32::from_argument("id", Some("")).unwrap(), 0);
        assert!(!bool::from_argument("flag", None).unwrap());
    }

    #[test]
    fn test_malformed_scalar_is_generic_error() {
        let err = i32::from_argument("id", Some("abc")).unwrap_err();
        assert_eq!(err.error_code(), crate::GENERIC_ERROR);
    }

    #[test]
    fn test_scalar_roundtrip() {
        assert_eq!(i32::from_argument("id", Some("5")).unwrap(), 5);
        assert_eq!(5i32.to_argument(), "5");
        assert_eq!(true.to_argument(), "true");
    }

    #[test]
    fn test_form_omission() {
        assert!(0i32.is_omitted());
        assert!(!1i32.is_omitted());
        assert!(None::<i32>.is_omitted());
        assert!(!Some(0i32).is_omitted());
        // Strings are never omitted, only absent options are.
        assert!(!String::new().is_omitted());
    }

    #[test]
    fn test_option_reads() {
        assert_eq!(Option::<i32>::from_argument("id", None).unwrap(), None);
        assert_eq!(
            Option::<i32>::from_argument("id", Some("7")).unwrap(),
            Some(7)
        );
    }
}
