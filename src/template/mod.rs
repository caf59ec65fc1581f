//! Reference markers embedded in definition text.
//!
//! Expressions, filters, table lists and join conditions all carry
//! `{{ head('arg', ...) }}` markers. This module turns that text into a typed
//! [`Template`] and never looks anything up; binding markers to catalog
//! entries is the resolver's job.

pub mod ast;
pub mod condition;
pub mod parser;

pub use ast::{Marker, Reference, Segment, Span, Template};
pub use condition::{parse_condition, ConditionError, JoinCondition, JoinOperand, JoinOperator};
pub use parser::{parse_table_entry, parse_template, ReferenceSyntaxError};
