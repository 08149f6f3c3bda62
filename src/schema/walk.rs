//! Generic walkers over declared field tables.
//!
//! These drive the three passes every payload supports: serialize,
//! deserialize, and validate. Fields are always visited in declared order,
//! which is what fixes the wire layout of a payload.

use bytes::{Bytes, BytesMut};

use crate::context::MessageContext;
use crate::protocol::wire::response_code;

use super::field::{Field, FieldKind};
use super::{Direction, SchemaError};

pub(crate) fn write_fields<T>(
    value: &mut T,
    fields: &[Field<T>],
    direction: Direction,
    buf: &mut BytesMut,
) -> Result<(), SchemaError> {
    for field in fields {
        match field.kind {
            FieldKind::Leaf(get) => get(value).write_value(buf)?,
            FieldKind::List(get) => get(value).write(buf)?,
            FieldKind::NestedList(get) => get(value).write(direction, buf)?,
            FieldKind::Nested(get) => get(value).serialize(direction, buf)?,
        }
    }
    Ok(())
}

pub(crate) fn read_fields<T>(
    value: &mut T,
    fields: &[Field<T>],
    direction: Direction,
    buf: &mut Bytes,
) -> Result<(), SchemaError> {
    for field in fields {
        match field.kind {
            FieldKind::Leaf(get) => get(value).read_into(buf)?,
            FieldKind::List(get) => get(value).read(buf)?,
            FieldKind::NestedList(get) => get(value).read(direction, buf)?,
            FieldKind::Nested(get) => get(value).deserialize(direction, buf)?,
        }
    }
    Ok(())
}

/// Runs every declared rule in order; the first failure's code is the
/// result. Returns [`response_code::SUCCESS`] when everything passes.
pub(crate) fn validate_fields<T>(
    value: &mut T,
    fields: &[Field<T>],
    direction: Direction,
    ctx: &mut dyn MessageContext,
) -> u16 {
    for field in fields {
        let code = match field.kind {
            FieldKind::Leaf(get) => {
                let leaf = get(value);
                let view = leaf.as_field_value();
                field
                    .rules
                    .iter()
                    .find(|rule| !rule.check(&view, ctx))
                    .map(|rule| rule.code())
                    .unwrap_or(response_code::SUCCESS)
            }
            FieldKind::List(get) => get(value).validate(field.rules, ctx),
            FieldKind::NestedList(get) => get(value).validate(direction, ctx),
            FieldKind::Nested(get) => get(value).validate(direction, ctx),
        };
        if code != response_code::SUCCESS {
            return code;
        }
    }
    response_code::SUCCESS
}
