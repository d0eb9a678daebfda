//! Core types for Linda tuple spaces
//!
//! This crate defines the foundational types used throughout the system:
//! - Value / ValueType: typed tuple fields and the type-wildcard tag
//! - Tuple: ordered, fixed-arity record stored in a space
//! - Template / TemplateField: patterns and the matching algorithm
//! - Limits: shape checks that reject ill-formed arguments
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod template;
pub mod tuple;
pub mod value;

pub use error::{Error, Result};
pub use limits::{LimitError, Limits, DEFAULT_MAX_ARITY, DEFAULT_MAX_DEPTH};
pub use template::{matches, Template, TemplateField};
pub use tuple::Tuple;
pub use value::{Value, ValueType};
