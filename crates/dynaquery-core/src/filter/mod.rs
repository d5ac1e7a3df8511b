//! Filter predicates and their compilation.
//!
//! Predicates are built from [`attr`] (also exported as [`value_of`]) and
//! combined with `&`, `|` and `!`:
//!
//! ```
//! use dynaquery_core::filter::attr;
//!
//! let filter = attr("number").between(5, 10) & !attr("archived").exists();
//! ```

mod compiler;
mod predicate;

pub use compiler::{CompiledFilter, ExpressionCompiler, FilterCompiler, merge_placeholders};
pub use predicate::{
    AttributeKind, Comparator, Operand, Predicate, SizeOf, ValueOf, attr, attr as value_of,
};
