//! Declarative schema description
//!
//! A schema is a tree of `static` values: objects list their fields, each
//! field names a [`Kind`], and objects may carry cross-field [`Rule`]s.
//! Tagged unions map a discriminator value to the object schema of that
//! variant. The walker in the parent module interprets these values.

use std::fmt;

use serde_json::{Map, Value};

#[derive(Debug)]
pub struct ObjectSchema {
    /// Human name used in messages, e.g. `outbound`
    pub name: &'static str,
    pub fields: &'static [Field],
    pub rules: &'static [Rule],
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
    /// Filled in when the field is absent; only meaningful on optional fields
    pub default: Option<DefaultValue>,
}

impl Field {
    pub const fn required(name: &'static str, kind: Kind) -> Self {
        Field {
            name,
            kind,
            required: true,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: Kind) -> Self {
        Field {
            name,
            kind,
            required: false,
            default: None,
        }
    }

    pub const fn defaulted(name: &'static str, kind: Kind, default: DefaultValue) -> Self {
        Field {
            name,
            kind,
            required: false,
            default: Some(default),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Bool(bool),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            DefaultValue::Bool(b) => Value::Bool(b),
        }
    }
}

#[derive(Debug)]
pub enum Kind {
    /// Any JSON value, copied through
    Any,
    /// Any JSON object, copied through
    OpenObject,
    Bool,
    Integer { min: i64, max: i64 },
    Str(StrRule),
    Array { item: &'static Kind, min_items: usize },
    Object(&'static ObjectSchema),
    Union(&'static UnionSchema),
}

#[derive(Debug, Clone, Copy)]
pub enum StrRule {
    Any,
    Ipv4,
    /// IPv4 literal or domain name
    Address,
    /// Absolute URL
    Url,
    Literal(&'static str),
    OneOf(&'static [&'static str]),
}

/// Object variants selected by the string value of `tag`
#[derive(Debug)]
pub struct UnionSchema {
    pub name: &'static str,
    pub tag: &'static str,
    pub variants: &'static [(&'static str, &'static ObjectSchema)],
}

impl UnionSchema {
    pub fn variant(&self, tag: &str) -> Option<&'static ObjectSchema> {
        self.variants
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, schema)| *schema)
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.variants.iter().map(|(name, _)| *name)
    }
}

/// Cross-field check on a single object
///
/// `check` only runs when every field in `depends_on` validated cleanly,
/// and sees the normalized object (defaults applied).
pub struct Rule {
    pub depends_on: &'static [&'static str],
    pub check: fn(&Map<String, Value>) -> Option<Violation>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Field the issue is reported on, the object itself when `None`
    pub field: Option<&'static str>,
    pub message: String,
}

impl Violation {
    pub fn on(field: &'static str, message: impl Into<String>) -> Self {
        Violation {
            field: Some(field),
            message: message.into(),
        }
    }
}
