//! Templates and the matching algorithm
//!
//! A template is tuple-shaped; each field is a literal, a type wildcard, or a
//! nested template. Template `m` matches tuple `t` iff they have the same
//! arity and every position matches:
//!
//! - `Literal(v)`: `t[i] == v` by value equality
//! - `Type(ty)`: `t[i]` is non-null and of runtime type `ty`
//! - `Nested(n)`: `t[i]` is a nested tuple and `n` matches it
//!
//! Matching dispatches on the field tag; it never inspects anything but the
//! stored value.

use crate::tuple::Tuple;
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One position of a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateField {
    /// Must equal the stored field by value
    Literal(Value),
    /// Must be a non-null value of this runtime type
    Type(ValueType),
    /// Must be a nested tuple matched by this template
    Nested(Template),
}

impl TemplateField {
    /// Literal field from anything convertible into a [`Value`]
    pub fn literal(value: impl Into<Value>) -> Self {
        TemplateField::Literal(value.into())
    }

    /// Type wildcard field
    pub fn of_type(ty: ValueType) -> Self {
        TemplateField::Type(ty)
    }

    /// Check if a stored field matches this template field
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            TemplateField::Literal(expected) => value == expected,
            TemplateField::Type(ty) => ty.admits(value),
            TemplateField::Nested(template) => match value {
                Value::Tuple(inner) => template.matches(inner),
                _ => false,
            },
        }
    }
}

impl From<ValueType> for TemplateField {
    fn from(ty: ValueType) -> Self {
        TemplateField::Type(ty)
    }
}

impl From<Value> for TemplateField {
    fn from(value: Value) -> Self {
        TemplateField::Literal(value)
    }
}

impl From<Template> for TemplateField {
    fn from(template: Template) -> Self {
        TemplateField::Nested(template)
    }
}

impl From<&str> for TemplateField {
    fn from(s: &str) -> Self {
        TemplateField::Literal(Value::from(s))
    }
}

impl From<String> for TemplateField {
    fn from(s: String) -> Self {
        TemplateField::Literal(Value::from(s))
    }
}

impl From<bool> for TemplateField {
    fn from(b: bool) -> Self {
        TemplateField::Literal(Value::Bool(b))
    }
}

impl From<i64> for TemplateField {
    fn from(i: i64) -> Self {
        TemplateField::Literal(Value::Int(i))
    }
}

impl From<i32> for TemplateField {
    fn from(i: i32) -> Self {
        TemplateField::Literal(Value::Int(i as i64))
    }
}

impl From<f64> for TemplateField {
    fn from(f: f64) -> Self {
        TemplateField::Literal(Value::Float(f))
    }
}

impl fmt::Display for TemplateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateField::Literal(v) => write!(f, "{}", v),
            TemplateField::Type(ty) => write!(f, "<{}>", ty),
            TemplateField::Nested(t) => write!(f, "{}", t),
        }
    }
}

/// Pattern for matching tuples
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Template {
    fields: Vec<TemplateField>,
}

impl Template {
    /// Create a new template
    pub fn new(fields: Vec<TemplateField>) -> Self {
        Template { fields }
    }

    /// Template that matches exactly `tuple` (every field a literal)
    pub fn exact(tuple: &Tuple) -> Self {
        Template::new(
            tuple
                .fields()
                .iter()
                .cloned()
                .map(TemplateField::Literal)
                .collect(),
        )
    }

    /// Template of `arity` `Any` wildcards
    pub fn any(arity: usize) -> Self {
        Template::new(vec![TemplateField::Type(ValueType::Any); arity])
    }

    /// Get the fields of the template
    pub fn fields(&self) -> &[TemplateField] {
        &self.fields
    }

    /// Number of fields
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Nesting depth: 1 for a flat template, plus one per nested level
    pub fn depth(&self) -> usize {
        1 + self
            .fields
            .iter()
            .map(|field| match field {
                TemplateField::Literal(v) => v.depth(),
                TemplateField::Type(_) => 0,
                TemplateField::Nested(t) => t.depth(),
            })
            .max()
            .unwrap_or(0)
    }

    /// Check if a tuple matches this template
    pub fn matches(&self, tuple: &Tuple) -> bool {
        if self.fields.len() != tuple.arity() {
            return false;
        }

        self.fields
            .iter()
            .zip(tuple.fields())
            .all(|(pattern, value)| pattern.matches(value))
    }
}

impl From<Vec<TemplateField>> for Template {
    fn from(fields: Vec<TemplateField>) -> Self {
        Template::new(fields)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, "]")
    }
}

/// Does `template` match `tuple`
pub fn matches(template: &Template, tuple: &Tuple) -> bool {
    template.matches(tuple)
}

/// Build a [`Template`] from values convertible into [`TemplateField`]
///
/// Plain Rust values become literals, [`ValueType`]s become type wildcards
/// and nested [`Template`]s recurse.
///
/// ```
/// use linda_core::{template, tuple, ValueType};
///
/// let m = template![ValueType::Int, "hello"];
/// assert!(m.matches(&tuple![42, "hello"]));
/// ```
#[macro_export]
macro_rules! template {
    () => {
        $crate::Template::new(::std::vec::Vec::new())
    };
    ($($field:expr),+ $(,)?) => {
        $crate::Template::new(::std::vec![$($crate::TemplateField::from($field)),+])
    };
}
