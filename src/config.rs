use std::io::Write;

use serde::{de, ser};

use crate::error::Result;
use crate::query::QueryMap;

/// Configuration for encoding and decoding behavior.
///
/// The defaults match the plain [`to_string`](crate::to_string) and
/// [`from_query_into`](crate::from_query_into) functions: query-string
/// percent-encoding, six fractional digits for floats and last-value-wins
/// for scalar fields that receive several values.
///
/// ```
/// use qparams::{Config, DuplicateScalar};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
/// struct Query {
///     page: u32,
///     scale: f64,
/// }
///
/// let config = Config::new()
///     .float_precision(2)
///     .duplicate_scalar(DuplicateScalar::First);
///
/// let encoded = config
///     .serialize_string(&Query { page: 3, scale: 0.5 })
///     .unwrap();
/// assert_eq!(encoded, "?page=3&scale=0.50");
///
/// let mut q = Query::default();
/// config.deserialize_str_into("page=1&page=2", &mut q).unwrap();
/// assert_eq!(q.page, 1);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Config {
    use_form_encoding: bool,
    float_precision: usize,
    duplicate_scalar: DuplicateScalar,
}

/// What a scalar field does when its key carries more than one value.
///
/// Sequence fields are not affected, they always take every value in order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateScalar {
    /// Use the first value, e.g. `a=1&a=2` gives `1`.
    First,
    /// Use the last value, e.g. `a=1&a=2` gives `2`.
    #[default]
    Last,
    /// Fail with [`Error::DuplicateValue`](crate::Error::DuplicateValue).
    Reject,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            use_form_encoding: false,
            float_precision: 6,
            duplicate_scalar: DuplicateScalar::Last,
        }
    }

    /// By default, `qparams` uses query-string encoding, as defined
    /// in [WHATWG](https://url.spec.whatwg.org/#query-percent-encode-set).
    ///
    /// This is a relatively lax encoding scheme, which does not
    /// percent encode many characters (like `/` or `?`).
    ///
    /// To percent encode everything except ASCII alphanumerics and `*-._`,
    /// as `application/x-www-form-urlencoded` does, set this to `true`.
    /// Spaces are written as `+` either way.
    pub const fn use_form_encoding(mut self, use_form_encoding: bool) -> Self {
        self.use_form_encoding = use_form_encoding;
        self
    }

    /// Number of fractional digits written for `f32` and `f64` fields.
    /// Default is 6.
    pub const fn float_precision(mut self, float_precision: usize) -> Self {
        self.float_precision = float_precision;
        self
    }

    /// Specifies how scalar fields handle repeated keys when decoding.
    /// Default is [`DuplicateScalar::Last`].
    pub const fn duplicate_scalar(mut self, duplicate_scalar: DuplicateScalar) -> Self {
        self.duplicate_scalar = duplicate_scalar;
        self
    }

    /// Encodes a record into a [`QueryMap`] using this `Config`.
    pub fn serialize_query_map<T: ser::Serialize>(self, input: &T) -> Result<QueryMap> {
        let fields = crate::ser::capture(input)?;
        Ok(crate::ser::render(&fields, self.float_precision))
    }

    /// Encodes a record into a query string using this `Config`.
    pub fn serialize_string<T: ser::Serialize>(self, input: &T) -> Result<String> {
        self.serialize_query_map(input)?
            .to_query_string(self.use_form_encoding)
    }

    /// Encodes a record into a writer using this `Config`.
    pub fn serialize_to_writer<T: ser::Serialize, W: Write>(
        self,
        input: &T,
        writer: &mut W,
    ) -> Result<()> {
        self.serialize_query_map(input)?
            .write_to(writer, self.use_form_encoding)
    }

    /// Decodes a query into an existing record using this `Config`.
    ///
    /// On error `dest` is left as it was.
    pub fn deserialize_into<T>(self, query: &QueryMap, dest: &mut T) -> Result<()>
    where
        T: ser::Serialize + de::DeserializeOwned,
    {
        crate::de::decode(query, dest, self.duplicate_scalar)
    }

    /// Parses a raw query string and decodes it into an existing record
    /// using this `Config`.
    pub fn deserialize_str_into<T>(self, input: &str, dest: &mut T) -> Result<()>
    where
        T: ser::Serialize + de::DeserializeOwned,
    {
        let query = QueryMap::parse(input)?;
        self.deserialize_into(&query, dest)
    }

    /// Decodes a query into a fresh `T::default()` using this `Config`.
    pub fn deserialize_query<T>(self, query: &QueryMap) -> Result<T>
    where
        T: ser::Serialize + de::DeserializeOwned + Default,
    {
        let mut dest = T::default();
        self.deserialize_into(query, &mut dest)?;
        Ok(dest)
    }
}
