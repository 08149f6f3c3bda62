//! List fields.
//!
//! Lists travel as a u16 element count followed by the elements back to
//! back. Two erased traits cover the two element shapes: [`ListValue`] for
//! primitive elements, [`BodyList`] for composite elements with their own
//! declared fields. Blanket impls over `Vec` mean payload types just hold
//! plain vectors.

use bytes::{BufMut, Bytes, BytesMut};

use crate::context::MessageContext;
use crate::protocol::wire::response_code;

use super::field::{take_u16, PrimitiveValue};
use super::rules::Rule;
use super::{Body, Direction, Schema, SchemaError};

/// Erased list of primitive elements.
pub trait ListValue: Send {
    fn write(&mut self, buf: &mut BytesMut) -> Result<(), SchemaError>;
    fn read(&mut self, buf: &mut Bytes) -> Result<(), SchemaError>;
    /// Applies the owning field's rules to every element; first failure
    /// wins.
    fn validate(&mut self, rules: &[Rule], ctx: &mut dyn MessageContext) -> u16;
}

impl<P> ListValue for Vec<P>
where
    P: PrimitiveValue + Default + 'static,
{
    fn write(&mut self, buf: &mut BytesMut) -> Result<(), SchemaError> {
        if self.len() > u16::MAX as usize {
            return Err(SchemaError::TooManyElements);
        }
        buf.put_u16(self.len() as u16);
        for element in self.iter() {
            element.write_value(buf)?;
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut Bytes) -> Result<(), SchemaError> {
        let count = take_u16(buf)? as usize;
        self.clear();
        self.reserve(count);
        for _ in 0..count {
            let mut element = P::default();
            element.read_into(buf)?;
            self.push(element);
        }
        Ok(())
    }

    fn validate(&mut self, rules: &[Rule], ctx: &mut dyn MessageContext) -> u16 {
        for element in self.iter() {
            let view = element.as_field_value();
            for rule in rules {
                if !rule.check(&view, ctx) {
                    return rule.code();
                }
            }
        }
        response_code::SUCCESS
    }
}

/// Erased list of composite elements.
pub trait BodyList: Send {
    fn write(&mut self, direction: Direction, buf: &mut BytesMut) -> Result<(), SchemaError>;
    fn read(&mut self, direction: Direction, buf: &mut Bytes) -> Result<(), SchemaError>;
    fn validate(&mut self, direction: Direction, ctx: &mut dyn MessageContext) -> u16;
}

impl<C> BodyList for Vec<C>
where
    C: Schema,
{
    fn write(&mut self, direction: Direction, buf: &mut BytesMut) -> Result<(), SchemaError> {
        if self.len() > u16::MAX as usize {
            return Err(SchemaError::TooManyElements);
        }
        buf.put_u16(self.len() as u16);
        for element in self.iter_mut() {
            Body::serialize(element, direction, buf)?;
        }
        Ok(())
    }

    fn read(&mut self, direction: Direction, buf: &mut Bytes) -> Result<(), SchemaError> {
        let count = take_u16(buf)? as usize;
        self.clear();
        self.reserve(count);
        for _ in 0..count {
            let mut element = C::default();
            Body::deserialize(&mut element, direction, buf)?;
            self.push(element);
        }
        Ok(())
    }

    fn validate(&mut self, direction: Direction, ctx: &mut dyn MessageContext) -> u16 {
        for element in self.iter_mut() {
            let code = Body::validate(element, direction, ctx);
            if code != response_code::SUCCESS {
                return code;
            }
        }
        response_code::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullContext;

    #[test]
    fn primitive_list_roundtrip() {
        let mut list: Vec<u32> = vec![1, 2, 3];
        let mut buf = BytesMut::new();
        ListValue::write(&mut list, &mut buf).unwrap();

        // Count prefix plus three u32s.
        assert_eq!(buf.len(), 2 + 12);
        assert_eq!(&buf[..2], &[0, 3]);

        let mut bytes = buf.freeze();
        let mut out: Vec<u32> = vec![99];
        ListValue::read(&mut out, &mut bytes).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn empty_list_is_just_a_count() {
        let mut list: Vec<u8> = Vec::new();
        let mut buf = BytesMut::new();
        ListValue::write(&mut list, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0, 0]);
    }

    #[test]
    fn truncated_list_is_wrong_parameter_count() {
        // Claims two u16 elements, carries one.
        let mut bytes = Bytes::from_static(&[0, 2, 0, 7]);
        let mut out: Vec<u16> = Vec::new();
        assert_eq!(
            ListValue::read(&mut out, &mut bytes),
            Err(SchemaError::WrongParameterCount)
        );
    }

    #[test]
    fn element_rules_apply_to_every_element() {
        let rules = [Rule::at_least(1)];
        let mut ok: Vec<u32> = vec![1, 2];
        let mut bad: Vec<u32> = vec![1, 0];
        assert_eq!(
            ListValue::validate(&mut ok, &rules, &mut NullContext),
            response_code::SUCCESS
        );
        assert_eq!(
            ListValue::validate(&mut bad, &rules, &mut NullContext),
            response_code::PARAMETER_VALIDATION_FAILED
        );
    }
}
