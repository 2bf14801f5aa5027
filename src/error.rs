use serde::{de, ser};

use std::fmt::{self, Display};
use std::io;
use std::str;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding or decoding a record.
///
/// Decoding stops at the first error. The destination record is only
/// assigned once every field converted successfully, so after an error it
/// still holds whatever it held before the call.
#[derive(Debug)]
pub enum Error {
    /// A custom error message, usually raised by a field's own serde impl.
    Custom(String),

    /// The decode destination is not a record (e.g. `i32`, `Vec<_>`, a map).
    InvalidDestination(&'static str),

    /// The record declares a field outside the supported set.
    UnsupportedFieldType {
        field: &'static str,
        ty: &'static str,
    },

    /// A query value for a `bool` field was not exactly `true` or `false`.
    InvalidBool {
        field: &'static str,
        key: String,
        value: String,
    },

    /// A query value for an integer field was not a decimal integer that
    /// fits the field.
    InvalidInt {
        field: &'static str,
        key: String,
        value: String,
    },

    /// A query value for an `f32`/`f64` field was not a float literal.
    InvalidFloat {
        field: &'static str,
        key: String,
        value: String,
    },

    /// A scalar field received more than one value while
    /// [`DuplicateScalar::Reject`](crate::DuplicateScalar::Reject) is set.
    DuplicateValue { field: &'static str, key: String },

    /// The value handed to the encoder is not a record.
    Unsupported(&'static str),

    /// Writing the encoded query failed.
    Io(io::Error),

    /// A percent-decoded key or value was not valid UTF-8.
    Utf8(str::Utf8Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Custom(msg) => write!(f, "{msg}"),
            Error::InvalidDestination(ty) => {
                write!(f, "cannot decode into `{ty}`: destination must be a struct")
            }
            Error::UnsupportedFieldType { field, ty } => {
                write!(f, "field `{field}` has unsupported type: {ty}")
            }
            Error::InvalidBool { field, key, value } => write!(
                f,
                "field `{field}`: invalid bool {value:?} for key `{key}` (expected `true` or `false`)"
            ),
            Error::InvalidInt { field, key, value } => {
                write!(f, "field `{field}`: invalid integer {value:?} for key `{key}`")
            }
            Error::InvalidFloat { field, key, value } => {
                write!(f, "field `{field}`: invalid float {value:?} for key `{key}`")
            }
            Error::DuplicateValue { field, key } => {
                write!(f, "field `{field}`: multiple values for key `{key}`")
            }
            Error::Unsupported(ty) => {
                write!(f, "cannot encode `{ty}` at the top level, try encoding a struct")
            }
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Utf8(err) => write!(f, "invalid utf-8 in query: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Utf8(err) => Some(err),
            _ => None,
        }
    }
}

impl Error {
    /// The record field this error is about, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Error::UnsupportedFieldType { field, .. }
            | Error::InvalidBool { field, .. }
            | Error::InvalidInt { field, .. }
            | Error::InvalidFloat { field, .. }
            | Error::DuplicateValue { field, .. } => Some(*field),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<str::Utf8Error> for Error {
    fn from(err: str::Utf8Error) -> Self {
        Error::Utf8(err)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Utf8(err.utf8_error())
    }
}

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}
