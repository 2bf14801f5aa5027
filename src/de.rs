//! Deserialization support for query strings.
//!
//! ### An overview of the design of `RecordDeserializer`
//!
//! Decoding writes into an existing record. Fields the query does not mention
//! keep their value, so before anything is parsed the destination is captured
//! through its `Serialize` impl (see `ser::capture`).
//!
//! The destination type is described first (see [`describe`]). A type that
//! is not a struct, or that declares a field outside the supported set, is
//! rejected before the query is looked at.
//!
//! We then build a plan with one source per field: query keys in query
//! order, each matched against the lowercased field names (unknown keys are
//! skipped), followed by the captured current value of every field the query
//! did not mention (a zero value if the record's `Serialize` impl skipped it). `RecordDeserializer` replays that plan as a map into the
//! record's `Deserialize` impl. Query values are converted on demand, driven
//! by the method the field asks for (`deserialize_bool`, `deserialize_i32`,
//! ...), and a failed conversion aborts the whole decode.
//!
//! The new record is only assigned once deserialization succeeded, so a
//! failed decode never leaves the destination half-written.

use serde::de::{self, IntoDeserializer};
use serde::ser;

use crate::config::DuplicateScalar;
use crate::error::*;
use crate::introspect::{FieldType, Zero, describe};
use crate::query::QueryMap;
use crate::value::{CapturedDeserializer, FieldValue};

/// Decodes a query into an existing record.
///
/// ```
/// # use serde::{Deserialize, Serialize};
/// #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
/// struct Query {
///     name: String,
///     age: u8,
///     tags: Vec<String>,
/// }
///
/// let mut q = Query {
///     name: "Alice".to_owned(),
///     ..Default::default()
/// };
/// let query = qparams::QueryMap::parse("age=24&tags=a&tags=b&other=ignored").unwrap();
/// qparams::from_query_into(&query, &mut q).unwrap();
///
/// assert_eq!(
///     q,
///     Query {
///         name: "Alice".to_owned(),
///         age: 24,
///         tags: vec!["a".to_owned(), "b".to_owned()],
///     }
/// );
/// ```
pub fn from_query_into<T>(query: &QueryMap, dest: &mut T) -> Result<()>
where
    T: ser::Serialize + de::DeserializeOwned,
{
    crate::Config::default().deserialize_into(query, dest)
}

/// Decodes a query into a fresh `T::default()`.
pub fn from_query<T>(query: &QueryMap) -> Result<T>
where
    T: ser::Serialize + de::DeserializeOwned + Default,
{
    crate::Config::default().deserialize_query(query)
}

/// Parses a raw query string and decodes it into an existing record.
pub fn from_str_into<T>(input: &str, dest: &mut T) -> Result<()>
where
    T: ser::Serialize + de::DeserializeOwned,
{
    crate::Config::default().deserialize_str_into(input, dest)
}

/// Parses a raw query string and decodes it into a fresh `T::default()`.
///
/// ```
/// # use serde::{Deserialize, Serialize};
/// #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
/// struct Query {
///     b: bool,
///     f: Vec<f32>,
/// }
///
/// let q: Query = qparams::from_str("?b=true&f=1.5&f=3").unwrap();
/// assert_eq!(q, Query { b: true, f: vec![1.5, 3.0] });
/// ```
pub fn from_str<T>(input: &str) -> Result<T>
where
    T: ser::Serialize + de::DeserializeOwned + Default,
{
    let mut dest = T::default();
    from_str_into(input, &mut dest)?;
    Ok(dest)
}

pub(crate) fn decode<T>(query: &QueryMap, dest: &mut T, policy: DuplicateScalar) -> Result<()>
where
    T: ser::Serialize + de::DeserializeOwned,
{
    let fields = describe::<T>()?;
    for field in &fields {
        if let FieldType::Unsupported(ty) = field.ty {
            return Err(Error::UnsupportedFieldType {
                field: field.name,
                ty,
            });
        }
    }

    let current = crate::ser::capture(dest)?;

    let mut plan = Vec::with_capacity(fields.len());
    for (key, values) in query.iter() {
        match fields.iter().find(|f| f.key == key) {
            Some(field) if !values.is_empty() => plan.push(Source::Query {
                field: field.name,
                key,
                values,
            }),
            Some(_) => {}
            None => tracing::trace!(key, "ignoring unknown query parameter"),
        }
    }
    for field in &fields {
        if plan.iter().any(|source| source.field() == field.name) {
            continue;
        }
        // fields skipped by `skip_serializing(_if)` were not captured
        match current.iter().find(|c| c.name == field.name) {
            Some(captured) => plan.push(Source::Current {
                field: field.name,
                value: &captured.value,
            }),
            None => plan.push(Source::Zero { field: field.name }),
        }
    }

    let record = T::deserialize(RecordDeserializer {
        plan: plan.into_iter(),
        pending: None,
        policy,
        ty: std::any::type_name::<T>(),
    })?;
    *dest = record;
    Ok(())
}

/// Where the value of one field comes from.
enum Source<'a> {
    Query {
        field: &'static str,
        key: &'a str,
        values: &'a [String],
    },
    Current {
        field: &'static str,
        value: &'a FieldValue,
    },
    Zero {
        field: &'static str,
    },
}

impl Source<'_> {
    fn field(&self) -> &'static str {
        match self {
            Source::Query { field, .. }
            | Source::Current { field, .. }
            | Source::Zero { field } => *field,
        }
    }
}

/// Replays a decode plan into a record's `Deserialize` impl.
struct RecordDeserializer<'a> {
    plan: std::vec::IntoIter<Source<'a>>,
    pending: Option<Source<'a>>,
    policy: DuplicateScalar,
    ty: &'static str,
}

impl<'de> de::Deserializer<'de> for RecordDeserializer<'_> {
    type Error = Error;

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(Error::InvalidDestination(self.ty))
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_map(self)
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

impl<'de> de::MapAccess<'de> for RecordDeserializer<'_> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        let Some(source) = self.plan.next() else {
            return Ok(None);
        };
        let field = source.field();
        self.pending = Some(source);
        seed.deserialize(field.into_deserializer()).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.pending.take() {
            Some(Source::Query { field, key, values }) => seed.deserialize(ValuesDeserializer {
                field,
                key,
                values,
                policy: self.policy,
            }),
            Some(Source::Current { value, .. }) => seed.deserialize(CapturedDeserializer(value)),
            Some(Source::Zero { .. }) => seed.deserialize(Zero),
            None => Err(de::Error::custom(
                "Somehow the list was empty after a non-empty key was returned",
            )),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.plan.len())
    }
}

/// Converts the query values of one field.
struct ValuesDeserializer<'a> {
    field: &'static str,
    key: &'a str,
    values: &'a [String],
    policy: DuplicateScalar,
}

impl<'a> ValuesDeserializer<'a> {
    /// Picks the value a scalar field receives.
    fn scalar(&self) -> Result<&'a str> {
        let value = match self.policy {
            DuplicateScalar::First => self.values.first(),
            DuplicateScalar::Last => self.values.last(),
            DuplicateScalar::Reject if self.values.len() > 1 => {
                return Err(Error::DuplicateValue {
                    field: self.field,
                    key: self.key.to_owned(),
                });
            }
            DuplicateScalar::Reject => self.values.first(),
        };
        value.map(String::as_str).ok_or_else(|| {
            Error::Custom(format!("field `{}`: no value for key `{}`", self.field, self.key))
        })
    }

    fn unsupported(&self, ty: &'static str) -> Error {
        Error::UnsupportedFieldType {
            field: self.field,
            ty,
        }
    }
}

/// Whether `text` spells out infinity or NaN, rather than a finite literal
/// that overflowed.
fn names_non_finite(text: &str) -> bool {
    let digits = text.trim_start_matches(['+', '-']);
    ["inf", "infinity", "nan"]
        .iter()
        .any(|name| digits.eq_ignore_ascii_case(name))
}

macro_rules! deserialize_parsed {
    ($($ty:ty => $method:ident => $visit:ident => $err:ident $(unless $overflow:ident)?,)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                let value = self.scalar()?;
                let parsed = value.parse::<$ty>().map_err(|err| err.to_string())
                    $(.and_then(|parsed| {
                        if parsed.$overflow() || names_non_finite(value) {
                            Ok(parsed)
                        } else {
                            Err("value out of range".to_owned())
                        }
                    }))?;
                match parsed {
                    Ok(parsed) => visitor.$visit(parsed),
                    Err(err) => {
                        tracing::debug!(
                            field = self.field,
                            key = self.key,
                            value,
                            %err,
                            "failed to convert query value"
                        );
                        Err(Error::$err {
                            field: self.field,
                            key: self.key.to_owned(),
                            value: value.to_owned(),
                        })
                    }
                }
            }
        )*
    };
}

macro_rules! deserialize_unsupported {
    ($($method:ident => $ty:expr,)*) => {
        $(
            fn $method<V>(self, _visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                Err(self.unsupported($ty))
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ValuesDeserializer<'_> {
    type Error = Error;

    deserialize_parsed! {
        bool => deserialize_bool => visit_bool => InvalidBool,
        i8 => deserialize_i8 => visit_i8 => InvalidInt,
        i16 => deserialize_i16 => visit_i16 => InvalidInt,
        i32 => deserialize_i32 => visit_i32 => InvalidInt,
        i64 => deserialize_i64 => visit_i64 => InvalidInt,
        u8 => deserialize_u8 => visit_u8 => InvalidInt,
        u16 => deserialize_u16 => visit_u16 => InvalidInt,
        u32 => deserialize_u32 => visit_u32 => InvalidInt,
        u64 => deserialize_u64 => visit_u64 => InvalidInt,
        f32 => deserialize_f32 => visit_f32 => InvalidFloat unless is_finite,
        f64 => deserialize_f64 => visit_f64 => InvalidFloat unless is_finite,
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_str(self.scalar()?)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_str(self, visitor)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_seq(ValuesSeq {
            field: self.field,
            key: self.key,
            iter: self.values.iter(),
        })
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    deserialize_unsupported! {
        deserialize_any => "any",
        deserialize_i128 => "i128",
        deserialize_u128 => "u128",
        deserialize_char => "char",
        deserialize_bytes => "bytes",
        deserialize_byte_buf => "bytes",
        deserialize_option => "option",
        deserialize_unit => "unit",
        deserialize_map => "map",
        deserialize_identifier => "identifier",
        deserialize_ignored_any => "ignored",
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, _visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(self.unsupported("unit struct"))
    }

    fn deserialize_tuple<V>(self, _len: usize, _visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(self.unsupported("tuple"))
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(self.unsupported("tuple struct"))
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(self.unsupported("struct"))
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(self.unsupported("enum"))
    }
}

/// The values of a sequence field, one element per value.
struct ValuesSeq<'a> {
    field: &'static str,
    key: &'a str,
    iter: std::slice::Iter<'a, String>,
}

impl<'de> de::SeqAccess<'de> for ValuesSeq<'_> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        let Some(value) = self.iter.next() else {
            return Ok(None);
        };
        seed.deserialize(ValuesDeserializer {
            field: self.field,
            key: self.key,
            values: std::slice::from_ref(value),
            policy: DuplicateScalar::Last,
        })
        .map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}
