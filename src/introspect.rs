//! Field descriptors for record types.
//!
//! A record's fields are discovered through its serde impls rather than
//! through hand-written tables: the derive output already lists every field
//! name, and the method a field's `Deserialize` impl calls (`deserialize_bool`,
//! `deserialize_seq`, ...) tells us its type.
//!
//! [`describe`] drives `T::deserialize` with a probing deserializer. Every
//! field is recorded and then handed a zero value so the derive is satisfied
//! and moves on to the next field. Fields outside the supported set are
//! recorded as [`FieldType::Unsupported`] and still handed a zero value of
//! whatever shape they asked for, so one bad field does not hide the rest.

use serde::de::{self, IntoDeserializer};

use crate::error::{Error, Result};

use std::fmt;

/// The closed set of scalar types a field (or sequence element) can have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    /// Any of `i8..=i64`, `u8..=u64`, `isize`, `usize`.
    Int,
    Float32,
    Float64,
    String,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float32 => "f32",
            Kind::Float64 => "f64",
            Kind::String => "string",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Scalar(Kind),
    Sequence(Kind),
    /// Names the shape that was found instead, e.g. `"option"`.
    Unsupported(&'static str),
}

/// One declared field of a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    /// The query key, see [`query_key`].
    pub key: String,
    pub ty: FieldType,
}

/// Maps a field name to its query key: the name lowercased, nothing else.
///
/// ```
/// assert_eq!(qparams::query_key("F32"), "f32");
/// assert_eq!(qparams::query_key("user_id"), "user_id");
/// ```
pub fn query_key(name: &str) -> String {
    name.to_lowercase()
}

/// Lists the fields of record type `T` in declaration order.
///
/// ```
/// use qparams::{describe, FieldType, Kind};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Search {
///     #[serde(rename = "Q")]
///     q: String,
///     tags: Vec<String>,
///     page: Option<u32>,
/// }
///
/// let fields = describe::<Search>().unwrap();
/// assert_eq!(fields[0].key, "q");
/// assert_eq!(fields[0].ty, FieldType::Scalar(Kind::String));
/// assert_eq!(fields[1].ty, FieldType::Sequence(Kind::String));
/// assert_eq!(fields[2].ty, FieldType::Unsupported("option"));
/// ```
///
/// Fails with [`Error::InvalidDestination`] if `T` is not a struct.
pub fn describe<T: de::DeserializeOwned>() -> Result<Vec<Field>> {
    let mut fields = Vec::new();
    T::deserialize(RecordProbe {
        fields: &mut fields,
        ty: std::any::type_name::<T>(),
    })?;
    Ok(fields)
}

/// Top-level probe, only accepts structs.
struct RecordProbe<'a> {
    fields: &'a mut Vec<Field>,
    ty: &'static str,
}

impl<'de> de::Deserializer<'de> for RecordProbe<'_> {
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
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_map(ProbeFields {
            names: fields.iter(),
            current: None,
            out: Some(self.fields),
        })
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

/// Walks the field names of a struct. With `out` set every field is recorded,
/// without it (nested structs) fields only receive zero values.
struct ProbeFields<'a> {
    names: std::slice::Iter<'static, &'static str>,
    current: Option<&'static str>,
    out: Option<&'a mut Vec<Field>>,
}

impl<'de> de::MapAccess<'de> for ProbeFields<'_> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        let Some(&name) = self.names.next() else {
            return Ok(None);
        };
        self.current = Some(name);
        seed.deserialize(name.into_deserializer()).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        let name = self
            .current
            .take()
            .ok_or_else(|| Error::Custom("internal error: field value without a name".into()))?;

        let Some(out) = self.out.as_deref_mut() else {
            return seed.deserialize(Zero);
        };

        let mut ty = None;
        let value = seed.deserialize(FieldProbe { ty: &mut ty });
        let ty = ty.unwrap_or(FieldType::Unsupported("unknown"));
        out.push(Field {
            name,
            key: query_key(name),
            ty,
        });
        match (value, ty) {
            (Ok(value), _) => Ok(value),
            (Err(_), FieldType::Unsupported(ty)) => {
                Err(Error::UnsupportedFieldType { field: name, ty })
            }
            // e.g. `NonZeroU32` asks for a `u32` but refuses `0`
            (Err(err), _) => {
                tracing::debug!(field = name, %err, "field rejected its zero value");
                Err(Error::UnsupportedFieldType {
                    field: name,
                    ty: "type rejecting its zero value",
                })
            }
        }
    }
}

/// Records the type of a single field.
struct FieldProbe<'a> {
    ty: &'a mut Option<FieldType>,
}

impl FieldProbe<'_> {
    fn unsupported(self, ty: &'static str) -> Zero {
        *self.ty = Some(FieldType::Unsupported(ty));
        Zero
    }
}

macro_rules! probe_scalar {
    ($($method:ident => $kind:expr,)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                *self.ty = Some(FieldType::Scalar($kind));
                de::Deserializer::$method(Zero, visitor)
            }
        )*
    };
}

macro_rules! probe_unsupported {
    ($($method:ident => $ty:expr,)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                de::Deserializer::$method(self.unsupported($ty), visitor)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for FieldProbe<'_> {
    type Error = Error;

    probe_scalar! {
        deserialize_bool => Kind::Bool,
        deserialize_i8 => Kind::Int,
        deserialize_i16 => Kind::Int,
        deserialize_i32 => Kind::Int,
        deserialize_i64 => Kind::Int,
        deserialize_u8 => Kind::Int,
        deserialize_u16 => Kind::Int,
        deserialize_u32 => Kind::Int,
        deserialize_u64 => Kind::Int,
        deserialize_f32 => Kind::Float32,
        deserialize_f64 => Kind::Float64,
        deserialize_str => Kind::String,
        deserialize_string => Kind::String,
    }

    probe_unsupported! {
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

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let mut element = None;
        let value = visitor.visit_seq(ProbeElement {
            ty: &mut element,
            done: false,
        });
        *self.ty = Some(match element {
            Some(FieldType::Scalar(kind)) => FieldType::Sequence(kind),
            Some(FieldType::Sequence(_)) => FieldType::Unsupported("nested sequence"),
            Some(unsupported) => unsupported,
            None => FieldType::Unsupported("sequence"),
        });
        value
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_unit_struct<V>(self, name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_unit_struct(self.unsupported("unit struct"), name, visitor)
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_tuple(self.unsupported("tuple"), len, visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let zero = self.unsupported("tuple struct");
        de::Deserializer::deserialize_tuple_struct(zero, name, len, visitor)
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_struct(self.unsupported("struct"), name, fields, visitor)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_enum(self.unsupported("enum"), name, variants, visitor)
    }
}

/// A sequence of exactly one probed element.
struct ProbeElement<'a> {
    ty: &'a mut Option<FieldType>,
    done: bool,
}

impl<'de> de::SeqAccess<'de> for ProbeElement<'_> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        seed.deserialize(FieldProbe { ty: &mut *self.ty }).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(usize::from(!self.done))
    }
}

/// Hands out a zero value of whatever shape is asked for.
pub(crate) struct Zero;

macro_rules! zero_value {
    ($($method:ident => $visit:ident($value:expr),)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                visitor.$visit($value)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Zero {
    type Error = Error;

    zero_value! {
        deserialize_bool => visit_bool(false),
        deserialize_i8 => visit_i8(0),
        deserialize_i16 => visit_i16(0),
        deserialize_i32 => visit_i32(0),
        deserialize_i64 => visit_i64(0),
        deserialize_i128 => visit_i128(0),
        deserialize_u8 => visit_u8(0),
        deserialize_u16 => visit_u16(0),
        deserialize_u32 => visit_u32(0),
        deserialize_u64 => visit_u64(0),
        deserialize_u128 => visit_u128(0),
        deserialize_f32 => visit_f32(0.0),
        deserialize_f64 => visit_f64(0.0),
        deserialize_char => visit_char('\0'),
        deserialize_str => visit_str(""),
        deserialize_string => visit_str(""),
        deserialize_identifier => visit_str(""),
        deserialize_bytes => visit_bytes(&[]),
        deserialize_byte_buf => visit_bytes(&[]),
    }

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_none()
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_seq(ZeroSeq(0))
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_seq(ZeroSeq(len))
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_seq(ZeroSeq(len))
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_map(de::value::MapDeserializer::new(
            std::iter::empty::<(&str, &str)>(),
        ))
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_map(ProbeFields {
            names: fields.iter(),
            current: None,
            out: None,
        })
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let variant = variants
            .first()
            .copied()
            .ok_or_else(|| Error::Custom("enum without variants".into()))?;
        visitor.visit_enum(ZeroVariant(variant))
    }

    serde::forward_to_deserialize_any! {
        unit unit_struct ignored_any
    }
}

struct ZeroSeq(usize);

impl<'de> de::SeqAccess<'de> for ZeroSeq {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        if self.0 == 0 {
            return Ok(None);
        }
        self.0 -= 1;
        seed.deserialize(Zero).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0)
    }
}

struct ZeroVariant(&'static str);

impl<'de> de::EnumAccess<'de> for ZeroVariant {
    type Error = Error;
    type Variant = Zero;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Zero)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(IntoDeserializer::<'de, Error>::into_deserializer(self.0))?;
        Ok((variant, Zero))
    }
}

impl<'de> de::VariantAccess<'de> for Zero {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(Zero)
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_seq(ZeroSeq(len))
    }

    fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_struct(Zero, "", fields, visitor)
    }
}
