//! Key conditions and their expression rendering.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use dynaquery_model::{AttributeValue, Value, codec};

use crate::error::QueryError;
use crate::params::Params;
use crate::resolver::{ResolvedName, escape_name};

/// Key conditions a request may carry: one per partition and sort key.
pub const MAX_KEY_CONDITIONS: usize = 2;

/// Separator between attribute name and operator in the suffix form.
const OPERATOR_SEPARATOR: &str = "__";

const KEY_PLACEHOLDER_PREFIX: &str = ":k_";

/// Operators allowed in a key-condition expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyOperator {
    /// `attr = :v`
    Eq,
    /// `begins_with(attr, :v)`
    BeginsWith,
    /// `attr >= :v`
    Gte,
    /// `attr <= :v`
    Lte,
    /// `attr > :v`
    Gt,
    /// `attr < :v`
    Lt,
    /// `attr BETWEEN :v_lower AND :v_upper`
    Between,
    /// A suffix with no key-condition form. Accepted when the condition is
    /// added; rendering fails with `UnsupportedOperator`.
    Unsupported(String),
}

impl KeyOperator {
    /// Number of operands the operator takes.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Between => 2,
            _ => 1,
        }
    }
}

impl FromStr for KeyOperator {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" | "=" => Self::Eq,
            "begins_with" => Self::BeginsWith,
            "gte" => Self::Gte,
            "lte" => Self::Lte,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "between" => Self::Between,
            other => Self::Unsupported(other.to_owned()),
        })
    }
}

impl fmt::Display for KeyOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "eq"),
            Self::BeginsWith => write!(f, "begins_with"),
            Self::Gte => write!(f, "gte"),
            Self::Lte => write!(f, "lte"),
            Self::Gt => write!(f, "gt"),
            Self::Lt => write!(f, "lt"),
            Self::Between => write!(f, "between"),
            Self::Unsupported(other) => write!(f, "{other}"),
        }
    }
}

/// Right-hand side of a key condition.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOperand {
    /// One value.
    Single(Value),
    /// Inclusive `(lower, upper)` bounds.
    Range(Value, Value),
}

/// A key condition as supplied by the caller: attribute, operator, operand.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    attribute: String,
    operator: KeyOperator,
    operand: KeyOperand,
}

impl KeyCondition {
    /// A condition from its three parts.
    #[must_use]
    pub fn new(attribute: impl Into<String>, operator: KeyOperator, operand: KeyOperand) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            operand,
        }
    }

    /// `attribute = value`
    #[must_use]
    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(attribute, KeyOperator::Eq, value)
    }

    /// `begins_with(attribute, prefix)`
    #[must_use]
    pub fn begins_with(attribute: impl Into<String>, prefix: impl Into<Value>) -> Self {
        Self::single(attribute, KeyOperator::BeginsWith, prefix)
    }

    /// `attribute >= value`
    #[must_use]
    pub fn gte(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(attribute, KeyOperator::Gte, value)
    }

    /// `attribute <= value`
    #[must_use]
    pub fn lte(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(attribute, KeyOperator::Lte, value)
    }

    /// `attribute > value`
    #[must_use]
    pub fn gt(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(attribute, KeyOperator::Gt, value)
    }

    /// `attribute < value`
    #[must_use]
    pub fn lt(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(attribute, KeyOperator::Lt, value)
    }

    /// `attribute BETWEEN lower AND upper`
    #[must_use]
    pub fn between(
        attribute: impl Into<String>,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> Self {
        Self::new(
            attribute,
            KeyOperator::Between,
            KeyOperand::Range(lower.into(), upper.into()),
        )
    }

    /// Parse the `attr__operator` form (`"SK__begins_with"`); a bare name
    /// means equality. Unknown operators are kept and fail at render time.
    #[must_use]
    pub fn parse(key: &str, value: impl Into<Value>) -> Self {
        let (attribute, operator) = match key.split_once(OPERATOR_SEPARATOR) {
            Some((attr, op)) => (attr, op.parse().unwrap_or(KeyOperator::Eq)),
            None => (key, KeyOperator::Eq),
        };
        Self::single(attribute, operator, value)
    }

    fn single(attribute: impl Into<String>, operator: KeyOperator, value: impl Into<Value>) -> Self {
        Self::new(attribute, operator, KeyOperand::Single(value.into()))
    }

    /// The attribute the condition applies to.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The operator.
    #[must_use]
    pub fn operator(&self) -> &KeyOperator {
        &self.operator
    }

    /// Bind the condition to the expression token chosen for its attribute.
    #[must_use]
    pub fn resolve(self, name: ResolvedName) -> Condition {
        Condition {
            name,
            operator: self.operator,
            operand: self.operand,
        }
    }
}

/// A key condition bound to its resolved attribute name, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    name: ResolvedName,
    operator: KeyOperator,
    operand: KeyOperand,
}

impl Condition {
    /// The resolved attribute name.
    #[must_use]
    pub fn name(&self) -> &ResolvedName {
        &self.name
    }

    /// Base of this condition's value placeholders: `:k_` plus the escaped
    /// attribute name. Distinct attributes get distinct bases, and the `k_`
    /// namespace is disjoint from the filter compiler's `:v<i>`.
    fn placeholder(&self) -> String {
        format!("{KEY_PLACEHOLDER_PREFIX}{}", escape_name(self.name.original()))
    }

    fn check_arity(&self) -> Result<(), QueryError> {
        let given = match self.operand {
            KeyOperand::Single(_) => 1,
            KeyOperand::Range(..) => 2,
        };
        if given == self.operator.arity() {
            Ok(())
        } else {
            Err(QueryError::OperandArity {
                operator: self.operator.to_string(),
                expected: self.operator.arity(),
            })
        }
    }

    /// Render the expression fragment.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperator` for operators without a key-condition
    /// form, and `OperandArity` when the operand shape does not fit.
    pub fn render_expression(&self) -> Result<String, QueryError> {
        let attr = self.name.expression();
        let v = self.placeholder();
        let expression = match &self.operator {
            KeyOperator::Eq => format!("{attr} = {v}"),
            KeyOperator::BeginsWith => format!("begins_with({attr}, {v})"),
            KeyOperator::Gte => format!("{attr} >= {v}"),
            KeyOperator::Lte => format!("{attr} <= {v}"),
            KeyOperator::Gt => format!("{attr} > {v}"),
            KeyOperator::Lt => format!("{attr} < {v}"),
            KeyOperator::Between => format!("{attr} BETWEEN {v}_lower AND {v}_upper"),
            KeyOperator::Unsupported(other) => {
                return Err(QueryError::UnsupportedOperator {
                    operator: other.clone(),
                });
            }
        };
        self.check_arity()?;
        Ok(expression)
    }

    /// Render the value placeholders, substituting string templates.
    ///
    /// # Errors
    ///
    /// Returns `TemplateSubstitution` when a string operand references a
    /// missing parameter, plus the errors of [`Condition::render_expression`].
    pub fn render_value_placeholders(
        &self,
        params: &Params,
    ) -> Result<HashMap<String, AttributeValue>, QueryError> {
        if let KeyOperator::Unsupported(other) = &self.operator {
            return Err(QueryError::UnsupportedOperator {
                operator: other.clone(),
            });
        }
        self.check_arity()?;

        let v = self.placeholder();
        let mut values = HashMap::new();
        match &self.operand {
            KeyOperand::Single(value) => {
                values.insert(v, encode_operand(value, params)?);
            }
            KeyOperand::Range(lower, upper) => {
                values.insert(format!("{v}_lower"), encode_operand(lower, params)?);
                values.insert(format!("{v}_upper"), encode_operand(upper, params)?);
            }
        }
        Ok(values)
    }
}

/// Strings are templates; every other value is encoded as given.
fn encode_operand(value: &Value, params: &Params) -> Result<AttributeValue, QueryError> {
    match value {
        Value::String(template) => Ok(AttributeValue::S(params.substitute(template)?)),
        other => Ok(codec::serialize(other)),
    }
}
