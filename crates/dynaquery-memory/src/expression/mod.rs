//! Expression language understood by the in-memory store.
//!
//! Expressions are lexed, parsed into an [`Expr`] tree by recursive descent,
//! and then either evaluated against an item ([`EvalContext`]) or, for key
//! conditions, translated into a partition lookup plus a sort-key range.

pub mod ast;
pub mod evaluator;
pub mod parser;

pub use ast::{AttributePath, CompareOp, Expr, FunctionName, LogicalOp, Operand, PathElement};
pub use evaluator::EvalContext;
pub use parser::{ExpressionError, parse_condition, parse_projection};
