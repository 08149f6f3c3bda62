//! Declarative validation rules.
//!
//! Rules attach to field declarations and run against the deserialized
//! value before a handler executes. Evaluation stops at the first failing
//! rule; its response code becomes the whole message's response. Every
//! constructor is `const` so rule lists can live in the same static tables
//! as the fields they guard.

use crate::context::MessageContext;
use crate::protocol::wire::response_code;

use super::field::FieldValue;

/// One validation rule with the response code it fails with.
pub struct Rule {
    pub(crate) kind: RuleKind,
    pub(crate) code: u16,
}

pub(crate) enum RuleKind {
    StringLength {
        min: usize,
        max: usize,
        allow_whitespace: bool,
    },
    AtLeast {
        bound: i128,
        exclusive: bool,
    },
    ObjectId {
        optional: bool,
    },
    OneOf(&'static [i64]),
    Custom(fn(&FieldValue<'_>, &mut dyn MessageContext) -> bool),
}

impl Rule {
    /// String length must fall within `min..=max`, and the trimmed string
    /// must not be empty.
    pub const fn string_length(min: usize, max: usize) -> Self {
        Self {
            kind: RuleKind::StringLength {
                min,
                max,
                allow_whitespace: false,
            },
            code: response_code::PARAMETER_VALIDATION_FAILED,
        }
    }

    /// String length must fall within `min..=max`; whitespace-only strings
    /// are accepted.
    pub const fn string_length_allow_whitespace(min: usize, max: usize) -> Self {
        Self {
            kind: RuleKind::StringLength {
                min,
                max,
                allow_whitespace: true,
            },
            code: response_code::PARAMETER_VALIDATION_FAILED,
        }
    }

    /// Numeric value must be `>= bound`.
    pub const fn at_least(bound: i64) -> Self {
        Self {
            kind: RuleKind::AtLeast {
                bound: bound as i128,
                exclusive: false,
            },
            code: response_code::PARAMETER_VALIDATION_FAILED,
        }
    }

    /// Numeric value must be `> bound`.
    pub const fn greater_than(bound: i64) -> Self {
        Self {
            kind: RuleKind::AtLeast {
                bound: bound as i128,
                exclusive: true,
            },
            code: response_code::PARAMETER_VALIDATION_FAILED,
        }
    }

    /// Value must be a valid object id (nonzero).
    pub const fn object_id() -> Self {
        Self {
            kind: RuleKind::ObjectId { optional: false },
            code: response_code::PARAMETER_VALIDATION_FAILED,
        }
    }

    /// Value must be a valid object id or the zero sentinel meaning
    /// "no object".
    pub const fn optional_object_id() -> Self {
        Self {
            kind: RuleKind::ObjectId { optional: true },
            code: response_code::PARAMETER_VALIDATION_FAILED,
        }
    }

    /// Numeric value must be one of the listed constants.
    pub const fn one_of(allowed: &'static [i64]) -> Self {
        Self {
            kind: RuleKind::OneOf(allowed),
            code: response_code::PARAMETER_VALIDATION_FAILED,
        }
    }

    /// Arbitrary predicate over the value, with access to the shared
    /// message context.
    pub const fn custom(check: fn(&FieldValue<'_>, &mut dyn MessageContext) -> bool) -> Self {
        Self {
            kind: RuleKind::Custom(check),
            code: response_code::PARAMETER_VALIDATION_FAILED,
        }
    }

    /// Replace the response code this rule fails with.
    pub const fn with_code(self, code: u16) -> Self {
        Self { code, ..self }
    }

    /// The response code returned when this rule fails.
    #[inline]
    pub fn code(&self) -> u16 {
        self.code
    }

    pub(crate) fn check(&self, value: &FieldValue<'_>, ctx: &mut dyn MessageContext) -> bool {
        match self.kind {
            RuleKind::StringLength {
                min,
                max,
                allow_whitespace,
            } => match value.as_str() {
                Some(s) => {
                    s.len() >= min && s.len() <= max && (allow_whitespace || !s.trim().is_empty())
                }
                None => false,
            },
            RuleKind::AtLeast { bound, exclusive } => match value.as_int() {
                Some(v) if exclusive => v > bound,
                Some(v) => v >= bound,
                None => false,
            },
            RuleKind::ObjectId { optional } => match value.as_int() {
                Some(v) => v > 0 || (optional && v == 0),
                None => false,
            },
            RuleKind::OneOf(allowed) => match value.as_int() {
                Some(v) => allowed.iter().any(|a| *a as i128 == v),
                None => false,
            },
            RuleKind::Custom(check) => check(value, ctx),
        }
    }
}
