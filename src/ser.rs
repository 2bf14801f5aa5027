//! Serialization support for query strings.
//!
//! ### An overview of the design of `RecordSerializer`
//!
//! Encoding happens in two steps. `RecordSerializer` walks the record through
//! its `Serialize` impl and captures every field as a [`Captured`] value:
//! the field name, its query key and its value in native form (a scalar or a
//! list of scalars). Anything outside that shape is rejected with
//! `UnsupportedFieldType` as soon as the offending field is reached.
//!
//! The captured fields are then rendered into a [`QueryMap`], one pair per
//! scalar and one pair per sequence element, in declaration order, and the
//! map writes itself out as `?key=value&...`.
//!
//! The captured form is also what the decoder uses to keep the current value
//! of fields the query does not mention.

use serde::ser;

use crate::error::*;
use crate::introspect::query_key;
use crate::query::QueryMap;
use crate::value::{Captured, FieldValue, Scalar};

use std::io::Write;

/// Encodes a record into a query string.
///
/// Every field is written, including zero values. Sequences become one pair
/// per element, and an empty sequence writes nothing.
///
/// ```
/// #[derive(serde::Serialize)]
/// struct Query {
///     i: i32,
///     s: String,
///     b: Vec<bool>,
/// }
///
/// let q = Query {
///     i: 27,
///     s: "a string".to_owned(),
///     b: vec![true, false],
/// };
///
/// assert_eq!(
///     qparams::to_string(&q).unwrap(),
///     "?i=27&s=a+string&b=true&b=false"
/// );
/// ```
pub fn to_string<T: ser::Serialize>(input: &T) -> Result<String> {
    let config = crate::Config::default();
    config.serialize_string(input)
}

/// Encodes a record into a generic writer object.
///
/// ```
/// #[derive(serde::Serialize)]
/// struct Query {
///     name: String,
///     age: u8,
/// }
///
/// let q = Query {
///     name: "Alice".to_owned(),
///     age: 24,
/// };
///
/// let mut buffer = Vec::new();
/// qparams::to_writer(&q, &mut buffer).unwrap();
/// assert_eq!(String::from_utf8(buffer).unwrap(), "?name=Alice&age=24");
/// ```
pub fn to_writer<T: ser::Serialize, W: Write>(input: &T, writer: &mut W) -> Result<()> {
    let config = crate::Config::default();
    config.serialize_to_writer(input, writer)
}

/// Encodes a record into a [`QueryMap`] without rendering it.
pub fn to_query_map<T: ser::Serialize>(input: &T) -> Result<QueryMap> {
    let config = crate::Config::default();
    config.serialize_query_map(input)
}

/// Captures every field of `input` in declaration order.
pub(crate) fn capture<T: ser::Serialize + ?Sized>(input: &T) -> Result<Vec<Captured>> {
    let mut serializer = RecordSerializer { fields: Vec::new() };
    input.serialize(&mut serializer)?;
    Ok(serializer.fields)
}

/// Renders captured fields into query pairs.
pub(crate) fn render(fields: &[Captured], float_precision: usize) -> QueryMap {
    let mut map = QueryMap::new();
    for field in fields {
        match &field.value {
            FieldValue::Scalar(scalar) => {
                map.append(field.key.as_str(), scalar.render(float_precision))
            }
            FieldValue::Sequence(items) => {
                for item in items {
                    map.append(field.key.as_str(), item.render(float_precision));
                }
            }
        }
    }
    tracing::trace!(fields = fields.len(), keys = map.len(), "encoded record");
    map
}

/// A serializer that captures the fields of a record.
///
/// Only structs are accepted at the top level: braced structs, unit structs
/// (no fields) and newtype structs wrapping one of those.
pub struct RecordSerializer {
    fields: Vec<Captured>,
}

impl RecordSerializer {
    fn top_level(ty: &'static str) -> Error {
        Error::Unsupported(ty)
    }
}

impl<'a> ser::Serializer for &'a mut RecordSerializer {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = ser::Impossible<(), Error>;
    type SerializeTuple = ser::Impossible<(), Error>;
    type SerializeTupleStruct = ser::Impossible<(), Error>;
    type SerializeTupleVariant = ser::Impossible<(), Error>;
    type SerializeMap = ser::Impossible<(), Error>;
    type SerializeStruct = Self;
    type SerializeStructVariant = ser::Impossible<(), Error>;

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(self)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + ser::Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<()> {
        Err(RecordSerializer::top_level("bool"))
    }

    fn serialize_i8(self, _v: i8) -> Result<()> {
        Err(RecordSerializer::top_level("integer"))
    }

    fn serialize_i16(self, _v: i16) -> Result<()> {
        Err(RecordSerializer::top_level("integer"))
    }

    fn serialize_i32(self, _v: i32) -> Result<()> {
        Err(RecordSerializer::top_level("integer"))
    }

    fn serialize_i64(self, _v: i64) -> Result<()> {
        Err(RecordSerializer::top_level("integer"))
    }

    fn serialize_u8(self, _v: u8) -> Result<()> {
        Err(RecordSerializer::top_level("integer"))
    }

    fn serialize_u16(self, _v: u16) -> Result<()> {
        Err(RecordSerializer::top_level("integer"))
    }

    fn serialize_u32(self, _v: u32) -> Result<()> {
        Err(RecordSerializer::top_level("integer"))
    }

    fn serialize_u64(self, _v: u64) -> Result<()> {
        Err(RecordSerializer::top_level("integer"))
    }

    fn serialize_f32(self, _v: f32) -> Result<()> {
        Err(RecordSerializer::top_level("float"))
    }

    fn serialize_f64(self, _v: f64) -> Result<()> {
        Err(RecordSerializer::top_level("float"))
    }

    fn serialize_char(self, _v: char) -> Result<()> {
        Err(RecordSerializer::top_level("char"))
    }

    fn serialize_str(self, _v: &str) -> Result<()> {
        Err(RecordSerializer::top_level("string"))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<()> {
        Err(RecordSerializer::top_level("bytes"))
    }

    fn serialize_none(self) -> Result<()> {
        Err(RecordSerializer::top_level("option"))
    }

    fn serialize_some<T: ?Sized + ser::Serialize>(self, _value: &T) -> Result<()> {
        Err(RecordSerializer::top_level("option"))
    }

    fn serialize_unit(self) -> Result<()> {
        Err(RecordSerializer::top_level("unit"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        Err(RecordSerializer::top_level("enum"))
    }

    fn serialize_newtype_variant<T: ?Sized + ser::Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        Err(RecordSerializer::top_level("enum"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(RecordSerializer::top_level("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(RecordSerializer::top_level("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(RecordSerializer::top_level("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(RecordSerializer::top_level("enum"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(RecordSerializer::top_level("map"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(RecordSerializer::top_level("enum"))
    }
}

impl ser::SerializeStruct for &mut RecordSerializer {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        let value = value.serialize(FieldSerializer { field: key })?;
        self.fields.push(Captured {
            name: key,
            key: query_key(key),
            value,
        });
        Ok(())
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(())
    }
}

macro_rules! serialize_scalar {
    (
        $($ty:ty => $meth:ident => $variant:ident,)*) => {
        $(
            fn $meth(self, v: $ty) -> Result<Self::Ok> {
                Ok(Scalar::$variant(v.into()).into())
            }
        )*
    };
}

/// Rejects the remaining serde data model for one field (or one sequence
/// element) of a record.
macro_rules! reject_compound {
    () => {
        fn serialize_i128(self, _v: i128) -> Result<Self::Ok> {
            Err(self.unsupported("i128"))
        }

        fn serialize_u128(self, _v: u128) -> Result<Self::Ok> {
            Err(self.unsupported("u128"))
        }

        fn serialize_char(self, _v: char) -> Result<Self::Ok> {
            Err(self.unsupported("char"))
        }

        fn serialize_bytes(self, _v: &[u8]) -> Result<Self::Ok> {
            Err(self.unsupported("bytes"))
        }

        fn serialize_none(self) -> Result<Self::Ok> {
            Err(self.unsupported("option"))
        }

        fn serialize_some<T: ?Sized + ser::Serialize>(self, _value: &T) -> Result<Self::Ok> {
            Err(self.unsupported("option"))
        }

        fn serialize_unit(self) -> Result<Self::Ok> {
            Err(self.unsupported("unit"))
        }

        fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok> {
            Err(self.unsupported("unit struct"))
        }

        fn serialize_unit_variant(
            self,
            _name: &'static str,
            _variant_index: u32,
            _variant: &'static str,
        ) -> Result<Self::Ok> {
            Err(self.unsupported("enum"))
        }

        fn serialize_newtype_struct<T: ?Sized + ser::Serialize>(
            self,
            _name: &'static str,
            value: &T,
        ) -> Result<Self::Ok> {
            value.serialize(self)
        }

        fn serialize_newtype_variant<T: ?Sized + ser::Serialize>(
            self,
            _name: &'static str,
            _variant_index: u32,
            _variant: &'static str,
            _value: &T,
        ) -> Result<Self::Ok> {
            Err(self.unsupported("enum"))
        }

        fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
            Err(self.unsupported("tuple"))
        }

        fn serialize_tuple_struct(
            self,
            _name: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeTupleStruct> {
            Err(self.unsupported("tuple struct"))
        }

        fn serialize_tuple_variant(
            self,
            _name: &'static str,
            _variant_index: u32,
            _variant: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeTupleVariant> {
            Err(self.unsupported("enum"))
        }

        fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
            Err(self.unsupported("map"))
        }

        fn serialize_struct(
            self,
            _name: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeStruct> {
            Err(self.unsupported("struct"))
        }

        fn serialize_struct_variant(
            self,
            _name: &'static str,
            _variant_index: u32,
            _variant: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeStructVariant> {
            Err(self.unsupported("enum"))
        }
    };
}

impl From<Scalar> for FieldValue {
    fn from(scalar: Scalar) -> Self {
        FieldValue::Scalar(scalar)
    }
}

/// Captures the value of one field.
struct FieldSerializer {
    field: &'static str,
}

impl FieldSerializer {
    fn unsupported(&self, ty: &'static str) -> Error {
        Error::UnsupportedFieldType {
            field: self.field,
            ty,
        }
    }
}

impl ser::Serializer for FieldSerializer {
    type Ok = FieldValue;
    type Error = Error;
    type SerializeSeq = SequenceSerializer;
    type SerializeTuple = ser::Impossible<FieldValue, Error>;
    type SerializeTupleStruct = ser::Impossible<FieldValue, Error>;
    type SerializeTupleVariant = ser::Impossible<FieldValue, Error>;
    type SerializeMap = ser::Impossible<FieldValue, Error>;
    type SerializeStruct = ser::Impossible<FieldValue, Error>;
    type SerializeStructVariant = ser::Impossible<FieldValue, Error>;

    serialize_scalar! {
        bool => serialize_bool => Bool,
        i8  => serialize_i8 => Int,
        i16 => serialize_i16 => Int,
        i32 => serialize_i32 => Int,
        i64 => serialize_i64 => Int,
        u8  => serialize_u8 => Uint,
        u16 => serialize_u16 => Uint,
        u32 => serialize_u32 => Uint,
        u64 => serialize_u64 => Uint,
        f32 => serialize_f32 => F32,
        f64 => serialize_f64 => F64,
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok> {
        Ok(Scalar::String(v.to_owned()).into())
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(SequenceSerializer {
            field: self.field,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    reject_compound!();
}

struct SequenceSerializer {
    field: &'static str,
    items: Vec<Scalar>,
}

impl ser::SerializeSeq for SequenceSerializer {
    type Ok = FieldValue;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        let item = value.serialize(ElementSerializer { field: self.field })?;
        if let Some(first) = self.items.first() {
            if first.kind() != item.kind() {
                return Err(Error::UnsupportedFieldType {
                    field: self.field,
                    ty: "mixed sequence",
                });
            }
        }
        self.items.push(item);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(FieldValue::Sequence(self.items))
    }
}

/// Captures one element of a sequence field. Elements must be scalars.
struct ElementSerializer {
    field: &'static str,
}

impl ElementSerializer {
    fn unsupported(&self, ty: &'static str) -> Error {
        Error::UnsupportedFieldType {
            field: self.field,
            ty,
        }
    }
}

impl ser::Serializer for ElementSerializer {
    type Ok = Scalar;
    type Error = Error;
    type SerializeSeq = ser::Impossible<Scalar, Error>;
    type SerializeTuple = ser::Impossible<Scalar, Error>;
    type SerializeTupleStruct = ser::Impossible<Scalar, Error>;
    type SerializeTupleVariant = ser::Impossible<Scalar, Error>;
    type SerializeMap = ser::Impossible<Scalar, Error>;
    type SerializeStruct = ser::Impossible<Scalar, Error>;
    type SerializeStructVariant = ser::Impossible<Scalar, Error>;

    serialize_scalar! {
        bool => serialize_bool => Bool,
        i8  => serialize_i8 => Int,
        i16 => serialize_i16 => Int,
        i32 => serialize_i32 => Int,
        i64 => serialize_i64 => Int,
        u8  => serialize_u8 => Uint,
        u16 => serialize_u16 => Uint,
        u32 => serialize_u32 => Uint,
        u64 => serialize_u64 => Uint,
        f32 => serialize_f32 => F32,
        f64 => serialize_f64 => F64,
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok> {
        Ok(Scalar::String(v.to_owned()))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(self.unsupported("nested sequence"))
    }

    reject_compound!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::Kind;

    #[derive(serde::Serialize)]
    struct Mixed {
        flag: bool,
        count: u16,
        ratios: Vec<f64>,
    }

    #[test]
    fn capture_keeps_native_values() {
        let fields = capture(&Mixed {
            flag: true,
            count: 7,
            ratios: vec![0.5],
        })
        .unwrap();

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].value, FieldValue::Scalar(Scalar::Bool(true)));
        assert_eq!(fields[1].value, FieldValue::Scalar(Scalar::Uint(7)));
        assert_eq!(fields[2].value, FieldValue::Sequence(vec![Scalar::F64(0.5)]));
        match &fields[2].value {
            FieldValue::Sequence(items) => assert_eq!(items[0].kind(), Kind::Float64),
            other => panic!("expected a sequence, got {other:?}"),
        }
    }

    #[test]
    fn mixed_sequence_is_rejected() {
        struct Mixed;

        impl serde::Serialize for Mixed {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&1u8)?;
                seq.serialize_element("two")?;
                seq.end()
            }
        }

        #[derive(serde::Serialize)]
        struct Query {
            items: Mixed,
        }

        let err = capture(&Query { items: Mixed }).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedFieldType {
                field: "items",
                ty: "mixed sequence"
            }
        ));
    }

    #[test]
    fn render_follows_declaration_order() {
        let fields = capture(&Mixed {
            flag: false,
            count: 0,
            ratios: vec![],
        })
        .unwrap();
        assert_eq!(render(&fields, 6).to_string(), "?flag=false&count=0");
    }
}
