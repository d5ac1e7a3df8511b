//! Errors raised while building or executing requests.

use dynaquery_model::ModelError;

/// Boxed failure reported by an executor; passed through unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by builders and the execution helpers.
///
/// Everything but [`QueryError::Executor`] is a local validation failure
/// raised synchronously by the call that violated the contract.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// More key conditions than the partition + sort key schema allows.
    #[error("at most {max} key conditions are allowed, got {count}")]
    TooManyKeyConditions {
        /// The cap.
        max: usize,
        /// How many conditions the call would have produced.
        count: usize,
    },
    /// A request needs at least one key condition.
    #[error("no key conditions specified; a request requires at least one key condition")]
    NoKeyCondition,
    /// Execution was attempted without a table name.
    #[error("no table name specified")]
    NoTable,
    /// Execution was attempted without an executor (client).
    #[error("no executor available; attach one to the table or pass one explicitly")]
    NoExecutor,
    /// The key-condition operator has no expression form.
    #[error("operator `{operator}` is not supported in key-condition expressions")]
    UnsupportedOperator {
        /// The operator as written.
        operator: String,
    },
    /// The operator was given the wrong number of operands.
    #[error("operator `{operator}` takes {expected} operand(s)")]
    OperandArity {
        /// The operator.
        operator: String,
        /// Operands it needs.
        expected: usize,
    },
    /// A string operand references a parameter that was not supplied.
    #[error("template {template:?} references missing parameter `{key}`")]
    TemplateSubstitution {
        /// The template text.
        template: String,
        /// The missing (or malformed) parameter reference.
        key: String,
    },
    /// Two placeholder sources bound the same placeholder to different targets.
    #[error("placeholder `{placeholder}` is bound to conflicting values")]
    PlaceholderCollision {
        /// The contested placeholder.
        placeholder: String,
    },
    /// The filter predicate cannot be expressed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    /// JSON conversion failed (request preview or typed item mapping).
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A model value could not be produced.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// The executor failed; the original error is the source.
    #[error("executor request failed: {0}")]
    Executor(#[source] BoxError),
}
