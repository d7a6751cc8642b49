//! Validation engine
//!
//! Runs an untyped JSON payload against one of the registered schemas and
//! either returns the typed configuration or every issue found, in
//! document order. The payload is never modified; the typed value is built
//! from a normalized copy with defaults filled in and unknown keys dropped.
//!
//! ```rust
//! use serde_json::json;
//! use tunnelconf::validator::validate_tunnel_config;
//!
//! let errors = validate_tunnel_config(&json!({
//!     "run_type": "client",
//!     "local_addr": "127.0.0.1",
//!     "local_port": 70000,
//!     "remote_addr": "example.com",
//!     "remote_port": 443,
//!     "password": ["secret"]
//! }))
//! .unwrap_err();
//! assert_eq!(errors.issues()[0].path.to_string(), "local_port");
//! ```

pub mod registry;
pub mod schema;

use std::fmt;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{SingBoxConfig, TunnelConfig, TunnelDocument};
use crate::utils::address::{is_valid_address, is_valid_ipv4};
use schema::{Kind, ObjectSchema, StrRule, UnionSchema};

pub use registry::SchemaId;

const REQUIRED: &str = "required field is missing";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of an issue inside a document
///
/// Renders keys joined by `.` and indices in brackets, as in
/// `outbounds[0].tls.server_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IssuePath(Vec<PathSegment>);

impl IssuePath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<PathSegment>> for IssuePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        IssuePath(segments)
    }
}

impl fmt::Display for IssuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{}", key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub path: IssuePath,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every issue found in a rejected document; never empty
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    issues: Vec<Issue>,
}

impl ValidationErrors {
    fn new(issues: Vec<Issue>) -> Self {
        debug_assert!(!issues.is_empty());
        Self { issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Rendered `path: message` lines, as shown to users
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    /// First issue reported at exactly `path`
    pub fn at(&self, path: &str) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.path.to_string() == path)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages().join("; "))
    }
}

impl IntoIterator for ValidationErrors {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

/// Check `payload` against `schema`, returning the normalized document
pub fn check(payload: &Value, schema: &ObjectSchema) -> Result<Value, ValidationErrors> {
    let mut walker = Walker::default();
    let normalized = walker.object(schema, payload);
    if walker.issues.is_empty() {
        Ok(normalized)
    } else {
        debug!(
            "{} rejected with {} issue(s)",
            schema.name,
            walker.issues.len()
        );
        Err(ValidationErrors::new(walker.issues))
    }
}

/// Check `payload` against a registered schema and build the typed value
pub fn validate<T: DeserializeOwned>(payload: &Value, schema: SchemaId) -> Result<T, ValidationErrors> {
    let normalized = check(payload, schema.schema())?;
    serde_json::from_value(normalized).map_err(|e| {
        ValidationErrors::new(vec![Issue {
            path: IssuePath::default(),
            message: format!("{} cannot be built: {}", schema.name(), e),
        }])
    })
}

pub fn validate_tunnel_config(payload: &Value) -> Result<TunnelConfig, ValidationErrors> {
    validate(payload, SchemaId::Tunnel)
}

pub fn validate_singbox_config(payload: &Value) -> Result<SingBoxConfig, ValidationErrors> {
    validate(payload, SchemaId::SingBox)
}

/// Validate against whichever schema [`SchemaId::detect`] picks
pub fn validate_document(payload: &Value) -> Result<TunnelDocument, ValidationErrors> {
    match SchemaId::detect(payload) {
        SchemaId::Tunnel => validate_tunnel_config(payload).map(TunnelDocument::Legacy),
        SchemaId::SingBox => validate_singbox_config(payload).map(TunnelDocument::SingBox),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Default)]
struct Walker {
    path: Vec<PathSegment>,
    issues: Vec<Issue>,
}

impl Walker {
    fn report(&mut self, message: impl Into<String>) {
        self.issues.push(Issue {
            path: IssuePath(self.path.clone()),
            message: message.into(),
        });
    }

    fn report_at(&mut self, field: &str, message: impl Into<String>) {
        self.path.push(PathSegment::Key(field.to_string()));
        self.report(message);
        self.path.pop();
    }

    fn mismatch(&mut self, expected: &str, value: &Value) -> Value {
        self.report(format!("expected {}, received {}", expected, type_name(value)));
        value.clone()
    }

    fn kind(&mut self, kind: &Kind, value: &Value) -> Value {
        match kind {
            Kind::Any => value.clone(),
            Kind::OpenObject => match value {
                Value::Object(_) => value.clone(),
                _ => self.mismatch("object", value),
            },
            Kind::Bool => match value {
                Value::Bool(_) => value.clone(),
                _ => self.mismatch("boolean", value),
            },
            Kind::Integer { min, max } => self.integer(*min, *max, value),
            Kind::Str(rule) => self.string(*rule, value),
            Kind::Array { item, min_items } => self.array(item, *min_items, value),
            Kind::Object(schema) => self.object(schema, value),
            Kind::Union(schema) => self.union(schema, value),
        }
    }

    fn integer(&mut self, min: i64, max: i64, value: &Value) -> Value {
        let Value::Number(number) = value else {
            return self.mismatch("integer", value);
        };
        let parsed = match (number.as_i64(), number.as_u64(), number.as_f64()) {
            (Some(n), _, _) => Some(n),
            // above i64::MAX, out of any range we use
            (None, Some(_), _) => None,
            (None, None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(f as i64)
            }
            _ => {
                self.report("expected integer, received float");
                return value.clone();
            }
        };
        match parsed {
            Some(n) if (min..=max).contains(&n) => Value::from(n),
            _ => {
                self.report(format!("number must be between {} and {}", min, max));
                value.clone()
            }
        }
    }

    fn string(&mut self, rule: StrRule, value: &Value) -> Value {
        let Some(s) = value.as_str() else {
            return self.mismatch("string", value);
        };
        let problem = match rule {
            StrRule::Any => None,
            StrRule::Ipv4 if !is_valid_ipv4(s) => Some(format!("invalid IPv4 address \"{}\"", s)),
            StrRule::Address if !is_valid_address(s) => Some(format!(
                "\"{}\" is not a valid IPv4 address or domain name",
                s
            )),
            StrRule::Url if url::Url::parse(s).is_err() => Some(format!("invalid URL \"{}\"", s)),
            StrRule::Literal(expected) if s != expected => {
                Some(format!("expected \"{}\", received \"{}\"", expected, s))
            }
            StrRule::OneOf(options) if !options.contains(&s) => Some(format!(
                "invalid value \"{}\", expected one of: {}",
                s,
                options.join(", ")
            )),
            _ => None,
        };
        if let Some(message) = problem {
            self.report(message);
        }
        value.clone()
    }

    fn array(&mut self, item: &Kind, min_items: usize, value: &Value) -> Value {
        let Some(items) = value.as_array() else {
            return self.mismatch("array", value);
        };
        if items.len() < min_items {
            self.report(format!(
                "must contain at least {} element{}",
                min_items,
                if min_items == 1 { "" } else { "s" }
            ));
        }
        let normalized = items
            .iter()
            .enumerate()
            .map(|(index, element)| {
                self.path.push(PathSegment::Index(index));
                let normalized = self.kind(item, element);
                self.path.pop();
                normalized
            })
            .collect();
        Value::Array(normalized)
    }

    fn object(&mut self, schema: &ObjectSchema, value: &Value) -> Value {
        let Some(map) = value.as_object() else {
            return self.mismatch("object", value);
        };

        let mut normalized = Map::new();
        let mut dirty: Vec<&str> = Vec::new();
        for field in schema.fields {
            let before = self.issues.len();
            self.path.push(PathSegment::Key(field.name.to_string()));
            match map.get(field.name) {
                Some(present) => {
                    let checked = self.kind(&field.kind, present);
                    normalized.insert(field.name.to_string(), checked);
                }
                None => match field.default {
                    Some(default) => {
                        normalized.insert(field.name.to_string(), default.to_value());
                    }
                    None if field.required => self.report(REQUIRED),
                    None => {}
                },
            }
            self.path.pop();
            if self.issues.len() > before {
                dirty.push(field.name);
            }
        }

        for rule in schema.rules {
            if rule.depends_on.iter().any(|name| dirty.contains(name)) {
                continue;
            }
            if let Some(violation) = (rule.check)(&normalized) {
                match violation.field {
                    Some(field) => self.report_at(field, violation.message),
                    None => self.report(violation.message),
                }
            }
        }

        Value::Object(normalized)
    }

    fn union(&mut self, schema: &UnionSchema, value: &Value) -> Value {
        let Some(map) = value.as_object() else {
            return self.mismatch("object", value);
        };
        let allowed = schema.tags().collect::<Vec<_>>().join(", ");
        match map.get(schema.tag) {
            None => {
                self.report_at(
                    schema.tag,
                    format!("missing {} {}, expected one of: {}", schema.name, schema.tag, allowed),
                );
                value.clone()
            }
            Some(tag) => match tag.as_str().and_then(|t| schema.variant(t)) {
                Some(variant) => self.object(variant, value),
                None => {
                    self.report_at(
                        schema.tag,
                        format!(
                            "invalid {} {} {}, expected one of: {}",
                            schema.name, schema.tag, tag, allowed
                        ),
                    );
                    value.clone()
                }
            },
        }
    }
}
