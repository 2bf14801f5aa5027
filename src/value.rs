//! Typed field values captured from a record.

use serde::de;

use crate::error::{Error, Result};
use crate::introspect::Kind;

/// One scalar read out of a record, still in its native type.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    String(String),
}

impl Scalar {
    pub fn kind(&self) -> Kind {
        match self {
            Scalar::Bool(_) => Kind::Bool,
            Scalar::Int(_) | Scalar::Uint(_) => Kind::Int,
            Scalar::F32(_) => Kind::Float32,
            Scalar::F64(_) => Kind::Float64,
            Scalar::String(_) => Kind::String,
        }
    }

    /// Renders the scalar as query text. Floats use fixed-point notation with
    /// `float_precision` fractional digits.
    pub fn render(&self, float_precision: usize) -> String {
        match self {
            Scalar::Bool(true) => "true".to_owned(),
            Scalar::Bool(false) => "false".to_owned(),
            Scalar::Int(v) => itoa::Buffer::new().format(*v).to_owned(),
            Scalar::Uint(v) => itoa::Buffer::new().format(*v).to_owned(),
            Scalar::F32(v) => format!("{v:.float_precision$}"),
            Scalar::F64(v) => format!("{v:.float_precision$}"),
            Scalar::String(v) => v.clone(),
        }
    }
}

/// The value of one record field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    Sequence(Vec<Scalar>),
}

/// A record field together with its value.
#[derive(Clone, Debug, PartialEq)]
pub struct Captured {
    pub name: &'static str,
    pub key: String,
    pub value: FieldValue,
}

/// Replays a captured value into a `Deserialize` impl without going
/// through text, so nothing is lost on the way back.
pub struct CapturedDeserializer<'a>(pub &'a FieldValue);

impl<'de> de::Deserializer<'de> for CapturedDeserializer<'_> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.0 {
            FieldValue::Scalar(scalar) => {
                de::Deserializer::deserialize_any(ScalarDeserializer(scalar), visitor)
            }
            FieldValue::Sequence(items) => visitor.visit_seq(ScalarSeq(items.iter())),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

struct ScalarDeserializer<'a>(&'a Scalar);

impl<'de> de::Deserializer<'de> for ScalarDeserializer<'_> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.0 {
            Scalar::Bool(v) => visitor.visit_bool(*v),
            Scalar::Int(v) => visitor.visit_i64(*v),
            Scalar::Uint(v) => visitor.visit_u64(*v),
            Scalar::F32(v) => visitor.visit_f32(*v),
            Scalar::F64(v) => visitor.visit_f64(*v),
            Scalar::String(v) => visitor.visit_str(v),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

struct ScalarSeq<'a>(std::slice::Iter<'a, Scalar>);

impl<'de> de::SeqAccess<'de> for ScalarSeq<'_> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.0.next() {
            Some(scalar) => seed.deserialize(ScalarDeserializer(scalar)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::Scalar;

    #[test]
    fn floats_render_fixed_point() {
        assert_eq!(Scalar::F32(1.0).render(6), "1.000000");
        assert_eq!(Scalar::F32(2.7).render(6), "2.700000");
        assert_eq!(Scalar::F64(-0.1).render(2), "-0.10");
        assert_eq!(Scalar::F64(3.0).render(0), "3");
    }

    #[test]
    fn integers_render_decimal() {
        assert_eq!(Scalar::Int(-42).render(6), "-42");
        assert_eq!(Scalar::Uint(u64::MAX).render(6), "18446744073709551615");
    }
}
