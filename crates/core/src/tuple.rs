//! Tuple: the ordered, fixed-arity record exchanged through a space
//!
//! Tuples are plain owned values. Handing a tuple to a space moves it in, and
//! every delivery out of a space is a fresh clone, so two holders can never
//! observe each other's mutation.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of typed values
///
/// Arity and positional order are significant; equality is field-wise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tuple {
    fields: Vec<Value>,
}

impl Tuple {
    /// Create a new tuple from fields
    pub fn new(fields: Vec<Value>) -> Self {
        Tuple { fields }
    }

    /// Get the fields of the tuple
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Consume the tuple, returning its fields
    pub fn into_fields(self) -> Vec<Value> {
        self.fields
    }

    /// Number of fields
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Field at `index`, if any
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    /// Nesting depth: 1 for a flat tuple, plus one per level of nested tuple
    pub fn depth(&self) -> usize {
        1 + self.fields.iter().map(Value::depth).max().unwrap_or(0)
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(fields: Vec<Value>) -> Self {
        Tuple::new(fields)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, ")")
    }
}

/// Build a [`Tuple`] from values convertible into [`Value`]
///
/// ```
/// use linda_core::{tuple, Value};
///
/// let t = tuple![42, "hello"];
/// assert_eq!(t.get(0), Some(&Value::Int(42)));
/// ```
#[macro_export]
macro_rules! tuple {
    () => {
        $crate::Tuple::new(::std::vec::Vec::new())
    };
    ($($field:expr),+ $(,)?) => {
        $crate::Tuple::new(::std::vec![$($crate::Value::from($field)),+])
    };
}
