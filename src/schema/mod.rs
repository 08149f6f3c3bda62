//! Declarative payload schemas.
//!
//! A request or response body is an ordinary struct that declares its wire
//! shape as two static field tables, one per direction. The engine walks
//! those tables to serialize, deserialize, and validate, so no payload type
//! carries codec logic of its own:
//!
//! ```text
//!   +-------------+     INPUT table      +-----------------------+
//!   | struct Echo | -------------------> | Field { name, kind }  |
//!   |   text: _   |     OUTPUT table     | Field { name, kind }  |
//!   +-------------+                      +-----------------------+
//!                                          |
//!                        walkers visit fields in declared order
//!                                          v
//!                       serialize / deserialize / validate
//! ```
//!
//! Field kinds form a small tree grammar: a leaf bound to a fixed codec, a
//! list of primitives, a list of composites, or a nested composite. Rules
//! attach to the declarations and run before the handler does.

mod field;
mod list;
pub mod query;
mod rules;
mod walk;

pub use field::{Accessor, Field, FieldKind, FieldValue, PrimitiveValue, Timestamp};
pub use list::{BodyList, ListValue};
pub use query::{PageQuery, SortKey};
pub use rules::Rule;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::context::MessageContext;

/// Which of a payload's two field tables a pass walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Request parameters, read from the client.
    Input,
    /// Response parameters, written to the client.
    Output,
}

/// Structural failure while encoding or decoding a payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The stream ended before every declared field was read, or a read
    /// left unexplained trailing bytes.
    #[error("body does not match the declared parameter count")]
    WrongParameterCount,
    /// A string field carried bytes that are not valid UTF-8.
    #[error("string field is not valid utf-8")]
    InvalidUtf8,
    /// A list exceeds the u16 count prefix.
    #[error("list has too many elements to encode")]
    TooManyElements,
    /// A string exceeds the u16 length prefix.
    #[error("string is too long to encode")]
    StringTooLong,
}

/// A payload type with declared input and output field tables.
///
/// Implementors list their fields once, as consts; everything else comes
/// from the blanket [`Body`] impl. `Default` supplies the blank value the
/// engine deserializes into.
pub trait Schema: Default + Send + 'static {
    /// Fields read from a request body, in wire order.
    const INPUT: &'static [Field<Self>];
    /// Fields written to a response body, in wire order.
    const OUTPUT: &'static [Field<Self>];

    /// The table for a direction.
    fn fields(direction: Direction) -> &'static [Field<Self>] {
        match direction {
            Direction::Input => Self::INPUT,
            Direction::Output => Self::OUTPUT,
        }
    }
}

/// Object-safe view of a payload; what the dispatcher actually drives.
pub trait Body: Send {
    /// Append this payload's wire form for a direction.
    fn serialize(&mut self, direction: Direction, buf: &mut BytesMut) -> Result<(), SchemaError>;

    /// Fill this payload from a body for a direction. The body must be
    /// consumed exactly.
    fn deserialize(&mut self, direction: Direction, buf: &mut Bytes) -> Result<(), SchemaError>;

    /// Run every declared rule; returns the first failing rule's response
    /// code, or [`response_code::SUCCESS`](crate::protocol::wire::response_code::SUCCESS).
    fn validate(&mut self, direction: Direction, ctx: &mut dyn MessageContext) -> u16;
}

impl<T: Schema> Body for T {
    fn serialize(&mut self, direction: Direction, buf: &mut BytesMut) -> Result<(), SchemaError> {
        walk::write_fields(self, T::fields(direction), direction, buf)
    }

    fn deserialize(&mut self, direction: Direction, buf: &mut Bytes) -> Result<(), SchemaError> {
        walk::read_fields(self, T::fields(direction), direction, buf)
    }

    fn validate(&mut self, direction: Direction, ctx: &mut dyn MessageContext) -> u16 {
        walk::validate_fields(self, T::fields(direction), direction, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullContext;
    use crate::protocol::wire::response_code;
    use bytes::Buf;

    #[derive(Default)]
    struct Item {
        id: u64,
        label: String,
    }

    impl Schema for Item {
        const INPUT: &'static [Field<Self>] = &[
            Field {
                name: "id",
                kind: FieldKind::Leaf(|item| &mut item.id),
                rules: &[Rule::object_id()],
            },
            Field {
                name: "label",
                kind: FieldKind::Leaf(|item| &mut item.label),
                rules: &[Rule::string_length(1, 16)],
            },
        ];
        const OUTPUT: &'static [Field<Self>] = Self::INPUT;
    }

    #[derive(Default)]
    struct Basket {
        owner: u64,
        tags: Vec<u16>,
        items: Vec<Item>,
    }

    impl Schema for Basket {
        const INPUT: &'static [Field<Self>] = &[
            Field {
                name: "owner",
                kind: FieldKind::Leaf(|b| &mut b.owner),
                rules: &[],
            },
            Field {
                name: "tags",
                kind: FieldKind::List(|b| &mut b.tags),
                rules: &[Rule::at_least(1)],
            },
            Field {
                name: "items",
                kind: FieldKind::NestedList(|b| &mut b.items),
                rules: &[],
            },
        ];
        const OUTPUT: &'static [Field<Self>] = Self::INPUT;
    }

    fn encode<B: Body>(value: &mut B, direction: Direction) -> Bytes {
        let mut buf = BytesMut::new();
        value.serialize(direction, &mut buf).unwrap();
        buf.freeze()
    }

    #[test]
    fn composite_roundtrip() {
        let mut basket = Basket {
            owner: 9,
            tags: vec![3, 5],
            items: vec![
                Item {
                    id: 1,
                    label: "ore".into(),
                },
                Item {
                    id: 2,
                    label: "gas".into(),
                },
            ],
        };
        let mut bytes = encode(&mut basket, Direction::Input);

        let mut out = Basket::default();
        out.deserialize(Direction::Input, &mut bytes).unwrap();
        assert_eq!(bytes.remaining(), 0);
        assert_eq!(out.owner, 9);
        assert_eq!(out.tags, vec![3, 5]);
        assert_eq!(out.items.len(), 2);
        assert_eq!(out.items[1].label, "gas");
    }

    #[test]
    fn fields_walk_in_declared_order() {
        let mut item = Item {
            id: 0x0102030405060708,
            label: "a".into(),
        };
        let bytes = encode(&mut item, Direction::Input);
        // id first, then the length-prefixed label.
        assert_eq!(
            &bytes[..],
            &[1, 2, 3, 4, 5, 6, 7, 8, 0, 1, b'a']
        );
    }

    #[test]
    fn validation_stops_at_first_failure() {
        let mut item = Item {
            id: 0,
            label: String::new(),
        };
        // Both fields fail; the id rule is declared first.
        assert_eq!(
            item.validate(Direction::Input, &mut NullContext),
            response_code::PARAMETER_VALIDATION_FAILED
        );

        item.id = 1;
        item.label = "fine".into();
        assert_eq!(
            item.validate(Direction::Input, &mut NullContext),
            response_code::SUCCESS
        );
    }

    #[derive(Default)]
    struct Wrapper {
        item: Item,
        count: u16,
    }

    impl Schema for Wrapper {
        const INPUT: &'static [Field<Self>] = &[
            Field {
                name: "item",
                kind: FieldKind::Nested(|w| &mut w.item),
                rules: &[],
            },
            Field {
                name: "count",
                kind: FieldKind::Leaf(|w| &mut w.count),
                rules: &[],
            },
        ];
        const OUTPUT: &'static [Field<Self>] = Self::INPUT;
    }

    #[test]
    fn nested_composite_roundtrip_and_validation() {
        let mut wrapper = Wrapper {
            item: Item {
                id: 4,
                label: "inner".into(),
            },
            count: 2,
        };
        let mut bytes = encode(&mut wrapper, Direction::Input);

        let mut out = Wrapper::default();
        out.deserialize(Direction::Input, &mut bytes).unwrap();
        assert_eq!(bytes.remaining(), 0);
        assert_eq!(out.item.label, "inner");
        assert_eq!(out.count, 2);

        out.item.id = 0;
        assert_eq!(
            out.validate(Direction::Input, &mut NullContext),
            response_code::PARAMETER_VALIDATION_FAILED
        );
    }

    #[derive(Default)]
    struct TwoRules {
        value: u32,
    }

    impl Schema for TwoRules {
        const INPUT: &'static [Field<Self>] = &[Field {
            name: "value",
            kind: FieldKind::Leaf(|t| &mut t.value),
            rules: &[Rule::at_least(10).with_code(77), Rule::one_of(&[99])],
        }];
        const OUTPUT: &'static [Field<Self>] = &[];
    }

    #[test]
    fn first_failing_rule_supplies_the_code() {
        // Both rules fail; the first declared rule's code wins.
        let mut value = TwoRules { value: 0 };
        assert_eq!(value.validate(Direction::Input, &mut NullContext), 77);
    }

    #[test]
    fn nested_list_elements_are_validated() {
        let mut basket = Basket {
            owner: 1,
            tags: vec![2],
            items: vec![Item {
                id: 0,
                label: "x".into(),
            }],
        };
        assert_eq!(
            basket.validate(Direction::Input, &mut NullContext),
            response_code::PARAMETER_VALIDATION_FAILED
        );
    }

    #[test]
    fn short_body_fails_structurally() {
        let mut out = Item::default();
        let mut bytes = Bytes::from_static(&[0, 0, 0, 0]);
        assert_eq!(
            out.deserialize(Direction::Input, &mut bytes),
            Err(SchemaError::WrongParameterCount)
        );
    }
}
