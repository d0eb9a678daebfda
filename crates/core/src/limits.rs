//! Shape limits for tuples and templates
//!
//! A tuple or template that violates these limits is a programming error on
//! the caller's side. Spaces reject it immediately with `InvalidTuple` /
//! `InvalidTemplate`; it is never treated as "no match".

use crate::template::{Template, TemplateField};
use crate::tuple::Tuple;
use crate::value::Value;
use thiserror::Error;

/// Default maximum number of fields per tuple or template
pub const DEFAULT_MAX_ARITY: usize = 64;

/// Default maximum nesting depth (a flat tuple has depth 1)
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Shape limits enforced on every argument crossing into a space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of fields (default: 64)
    pub max_arity: usize,

    /// Maximum nesting depth (default: 16)
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_arity: DEFAULT_MAX_ARITY,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Limits {
    /// Create limits with small values for testing
    pub fn with_small_limits() -> Self {
        Limits {
            max_arity: 4,
            max_depth: 2,
        }
    }

    /// Validate a tuple about to be written
    pub fn validate_tuple(&self, tuple: &Tuple) -> Result<(), LimitError> {
        self.validate_tuple_impl(tuple, 1)
    }

    fn validate_tuple_impl(&self, tuple: &Tuple, depth: usize) -> Result<(), LimitError> {
        if depth > self.max_depth {
            return Err(LimitError::NestingTooDeep {
                actual: depth,
                max: self.max_depth,
            });
        }
        if tuple.arity() > self.max_arity {
            return Err(LimitError::ArityTooLarge {
                actual: tuple.arity(),
                max: self.max_arity,
            });
        }
        for value in tuple.fields() {
            if let Value::Tuple(inner) = value {
                self.validate_tuple_impl(inner, depth + 1)?;
            }
        }
        Ok(())
    }

    /// Validate a template used for matching or registration
    ///
    /// Besides shape, a NaN float literal is rejected: it can never equal any
    /// stored value, so the template could never match anything.
    pub fn validate_template(&self, template: &Template) -> Result<(), LimitError> {
        self.validate_template_impl(template, 1)
    }

    fn validate_template_impl(&self, template: &Template, depth: usize) -> Result<(), LimitError> {
        if depth > self.max_depth {
            return Err(LimitError::NestingTooDeep {
                actual: depth,
                max: self.max_depth,
            });
        }
        if template.arity() > self.max_arity {
            return Err(LimitError::ArityTooLarge {
                actual: template.arity(),
                max: self.max_arity,
            });
        }
        for (position, field) in template.fields().iter().enumerate() {
            match field {
                TemplateField::Literal(Value::Float(f)) if f.is_nan() => {
                    return Err(LimitError::NanLiteral { position });
                }
                TemplateField::Literal(Value::Tuple(inner)) => {
                    self.validate_tuple_impl(inner, depth + 1)?;
                }
                TemplateField::Nested(inner) => {
                    self.validate_template_impl(inner, depth + 1)?;
                }
                TemplateField::Literal(_) | TemplateField::Type(_) => {}
            }
        }
        Ok(())
    }
}

/// Limit violation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LimitError {
    /// Too many fields
    #[error("arity {actual} exceeds maximum {max}")]
    ArityTooLarge {
        /// Actual arity
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Nested too deeply
    #[error("nesting depth {actual} exceeds maximum {max}")]
    NestingTooDeep {
        /// Actual depth
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// NaN literal in a template
    #[error("NaN literal at position {position} can never match")]
    NanLiteral {
        /// Field position
        position: usize,
    },
}
