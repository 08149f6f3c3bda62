//! Field descriptors and leaf codecs.
//!
//! A payload type describes its declared shape as two static tables of
//! [`Field`]s (input and output). Each entry pairs a field name with an
//! accessor fn pointer into the value, so the walkers in this module's
//! siblings can serialize, deserialize, and validate any payload without
//! runtime type inspection. The tables are consts: the "parameter tree" is
//! built at compile time, once per payload type.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::time::{SystemTime, UNIX_EPOCH};

use super::list::{BodyList, ListValue};
use super::rules::Rule;
use super::{Body, SchemaError};

/// Accessor fn pointer into a payload value.
pub type Accessor<T, V> = fn(&mut T) -> &mut V;

/// One declared field of a payload type.
pub struct Field<T> {
    /// Declared field name; used by error reporting and the paged-query
    /// order-by lookup.
    pub name: &'static str,
    /// What the field is and how to reach it.
    pub kind: FieldKind<T>,
    /// Validation rules, evaluated in declared order.
    pub rules: &'static [Rule],
}

/// Tagged variant tree node: leaf codec, list, or composite.
pub enum FieldKind<T> {
    /// A primitive field bound to a fixed codec.
    Leaf(Accessor<T, dyn PrimitiveValue>),
    /// A homogeneous list of primitives (u16 count prefix).
    List(Accessor<T, dyn ListValue>),
    /// A homogeneous list of composite elements (u16 count prefix).
    NestedList(Accessor<T, dyn BodyList>),
    /// A nested composite whose children are its own declared fields.
    Nested(Accessor<T, dyn Body>),
}

/// Milliseconds since the Unix epoch; the wire form of a point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Construct from a millisecond count.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the epoch.
    #[inline]
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

/// Borrowed view of a leaf value, handed to validation rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(&'a str),
    Time(u64),
}

impl FieldValue<'_> {
    /// Numeric view widened to avoid overflow at the comparison site.
    pub fn as_int(&self) -> Option<i128> {
        match *self {
            FieldValue::Int(v) => Some(v as i128),
            FieldValue::UInt(v) => Some(v as i128),
            FieldValue::Time(v) => Some(v as i128),
            _ => None,
        }
    }

    /// String view, if the value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Object-safe codec implemented by every leaf field type.
pub trait PrimitiveValue: Send {
    /// Append the wire form of this value.
    fn write_value(&self, buf: &mut BytesMut) -> Result<(), SchemaError>;

    /// Replace this value with one read from the stream.
    fn read_into(&mut self, buf: &mut Bytes) -> Result<(), SchemaError>;

    /// View for validation rules.
    fn as_field_value(&self) -> FieldValue<'_>;
}

pub(crate) fn take_u16(buf: &mut Bytes) -> Result<u16, SchemaError> {
    if buf.remaining() < 2 {
        return Err(SchemaError::WrongParameterCount);
    }
    Ok(buf.get_u16())
}

macro_rules! int_primitive {
    ($ty:ty, $put:ident, $get:ident, $len:expr, $variant:ident, $widen:ty) => {
        impl PrimitiveValue for $ty {
            fn write_value(&self, buf: &mut BytesMut) -> Result<(), SchemaError> {
                buf.$put(*self);
                Ok(())
            }

            fn read_into(&mut self, buf: &mut Bytes) -> Result<(), SchemaError> {
                if buf.remaining() < $len {
                    return Err(SchemaError::WrongParameterCount);
                }
                *self = buf.$get();
                Ok(())
            }

            fn as_field_value(&self) -> FieldValue<'_> {
                FieldValue::$variant(*self as $widen)
            }
        }
    };
}

int_primitive!(u8, put_u8, get_u8, 1, UInt, u64);
int_primitive!(i8, put_i8, get_i8, 1, Int, i64);
int_primitive!(u16, put_u16, get_u16, 2, UInt, u64);
int_primitive!(i16, put_i16, get_i16, 2, Int, i64);
int_primitive!(u32, put_u32, get_u32, 4, UInt, u64);
int_primitive!(i32, put_i32, get_i32, 4, Int, i64);
int_primitive!(u64, put_u64, get_u64, 8, UInt, u64);
int_primitive!(i64, put_i64, get_i64, 8, Int, i64);

impl PrimitiveValue for bool {
    fn write_value(&self, buf: &mut BytesMut) -> Result<(), SchemaError> {
        buf.put_u8(*self as u8);
        Ok(())
    }

    fn read_into(&mut self, buf: &mut Bytes) -> Result<(), SchemaError> {
        if buf.remaining() < 1 {
            return Err(SchemaError::WrongParameterCount);
        }
        *self = buf.get_u8() != 0;
        Ok(())
    }

    fn as_field_value(&self) -> FieldValue<'_> {
        FieldValue::Bool(*self)
    }
}

impl PrimitiveValue for String {
    fn write_value(&self, buf: &mut BytesMut) -> Result<(), SchemaError> {
        if self.len() > u16::MAX as usize {
            return Err(SchemaError::StringTooLong);
        }
        buf.put_u16(self.len() as u16);
        buf.put_slice(self.as_bytes());
        Ok(())
    }

    fn read_into(&mut self, buf: &mut Bytes) -> Result<(), SchemaError> {
        let len = take_u16(buf)? as usize;
        if buf.remaining() < len {
            return Err(SchemaError::WrongParameterCount);
        }
        let raw = buf.split_to(len);
        *self = String::from_utf8(raw.to_vec()).map_err(|_| SchemaError::InvalidUtf8)?;
        Ok(())
    }

    fn as_field_value(&self) -> FieldValue<'_> {
        FieldValue::Str(self)
    }
}

impl PrimitiveValue for Timestamp {
    fn write_value(&self, buf: &mut BytesMut) -> Result<(), SchemaError> {
        buf.put_u64(self.0);
        Ok(())
    }

    fn read_into(&mut self, buf: &mut Bytes) -> Result<(), SchemaError> {
        if buf.remaining() < 8 {
            return Err(SchemaError::WrongParameterCount);
        }
        self.0 = buf.get_u64();
        Ok(())
    }

    fn as_field_value(&self) -> FieldValue<'_> {
        FieldValue::Time(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<P: PrimitiveValue + Default + PartialEq + std::fmt::Debug>(value: P) {
        let mut buf = BytesMut::new();
        value.write_value(&mut buf).unwrap();

        let mut bytes = buf.freeze();
        let mut out = P::default();
        out.read_into(&mut bytes).unwrap();

        assert_eq!(out, value);
        assert_eq!(bytes.remaining(), 0);
    }

    #[test]
    fn primitive_roundtrips() {
        roundtrip(0xABu8);
        roundtrip(-5i8);
        roundtrip(0xABCDu16);
        roundtrip(-1234i16);
        roundtrip(0xDEADBEEFu32);
        roundtrip(-123456i32);
        roundtrip(u64::MAX);
        roundtrip(i64::MIN);
        roundtrip(true);
        roundtrip(String::from("hello"));
        roundtrip(Timestamp(1_700_000_000_000));
    }

    #[test]
    fn string_wire_form_is_length_prefixed() {
        let mut buf = BytesMut::new();
        String::from("ab").write_value(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0, 2, b'a', b'b']);
    }

    #[test]
    fn short_stream_is_wrong_parameter_count() {
        let mut bytes = Bytes::from_static(&[0x01]);
        let mut out = 0u32;
        assert_eq!(
            out.read_into(&mut bytes),
            Err(SchemaError::WrongParameterCount)
        );
    }

    #[test]
    fn truncated_string_is_wrong_parameter_count() {
        // Claims 5 bytes, carries 2.
        let mut bytes = Bytes::from_static(&[0, 5, b'a', b'b']);
        let mut out = String::new();
        assert_eq!(
            out.read_into(&mut bytes),
            Err(SchemaError::WrongParameterCount)
        );
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut bytes = Bytes::from_static(&[0, 2, 0xFF, 0xFE]);
        let mut out = String::new();
        assert_eq!(out.read_into(&mut bytes), Err(SchemaError::InvalidUtf8));
    }

    #[test]
    fn field_value_numeric_views() {
        assert_eq!(FieldValue::Int(-3).as_int(), Some(-3));
        assert_eq!(FieldValue::UInt(u64::MAX).as_int(), Some(u64::MAX as i128));
        assert_eq!(FieldValue::Str("x").as_int(), None);
        assert_eq!(FieldValue::Str("x").as_str(), Some("x"));
    }

    #[test]
    fn timestamp_now_is_nonzero() {
        assert!(Timestamp::now().as_millis() > 0);
    }
}
