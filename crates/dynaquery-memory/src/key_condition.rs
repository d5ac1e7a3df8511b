//! Turns a parsed key-condition expression into a partition lookup.

use std::collections::HashMap;

use dynaquery_model::AttributeValue;

use crate::error::MemoryError;
use crate::expression::{CompareOp, Expr, ExpressionError, FunctionName, LogicalOp, Operand, PathElement};
use crate::storage::{KeyAttribute, KeySchema, SortKeyCondition, SortableAttributeValue, validate_key_type};

/// Partition value and optional sort-key range extracted from a key condition.
#[derive(Debug, Clone)]
pub struct KeyLookup {
    /// Partition key value.
    pub partition: SortableAttributeValue,
    /// Sort-key range.
    pub sort: Option<SortKeyCondition>,
}

/// Extract a [`KeyLookup`] for `schema` from a key-condition expression.
///
/// The expression must hold an equality on the partition key, optionally
/// ANDed with one condition on the sort key. OR and NOT are rejected.
///
/// # Errors
///
/// Returns `MemoryError::InvalidKeyCondition` for any other shape, and
/// expression or storage errors for unresolved placeholders and mistyped
/// key values.
pub fn extract_key_lookup(
    expr: &Expr,
    schema: &KeySchema,
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
) -> Result<KeyLookup, MemoryError> {
    let mut conjuncts = Vec::new();
    flatten_and(expr, &mut conjuncts)?;
    if conjuncts.len() > 2 {
        return Err(MemoryError::InvalidKeyCondition(
            "a key condition may only reference the partition key and the sort key".to_owned(),
        ));
    }

    let mut partition = None;
    let mut sort = None;
    for conjunct in conjuncts {
        let term = KeyTerm::from_expr(conjunct, names)?;
        if term.attribute == schema.partition_key.name {
            if partition.is_some() {
                return Err(duplicate(&term.attribute));
            }
            partition = Some(term.partition_value(&schema.partition_key, values)?);
        } else if let Some(sort_key) = schema.sort_key.as_ref().filter(|k| k.name == term.attribute) {
            if sort.is_some() {
                return Err(duplicate(&term.attribute));
            }
            sort = Some(term.sort_condition(sort_key, values)?);
        } else {
            return Err(MemoryError::InvalidKeyCondition(format!(
                "query key condition not supported on non-key attribute: {}",
                term.attribute
            )));
        }
    }

    let partition = partition.ok_or_else(|| {
        MemoryError::InvalidKeyCondition(format!(
            "query condition missed key schema element: {}",
            schema.partition_key.name
        ))
    })?;
    Ok(KeyLookup { partition, sort })
}

fn duplicate(attribute: &str) -> MemoryError {
    MemoryError::InvalidKeyCondition(format!(
        "key attribute {attribute} appears in more than one condition"
    ))
}

fn flatten_and<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) -> Result<(), MemoryError> {
    match expr {
        Expr::Logical {
            op: LogicalOp::And,
            left,
            right,
        } => {
            flatten_and(left, out)?;
            flatten_and(right, out)
        }
        Expr::Logical { op: LogicalOp::Or, .. } => Err(MemoryError::InvalidKeyCondition(
            "invalid operator used in key condition: OR".to_owned(),
        )),
        Expr::Not(_) => Err(MemoryError::InvalidKeyCondition(
            "invalid operator used in key condition: NOT".to_owned(),
        )),
        other => {
            out.push(other);
            Ok(())
        }
    }
}

#[derive(Debug)]
enum TermOp<'e> {
    Compare(CompareOp, &'e str),
    Between(&'e str, &'e str),
    BeginsWith(&'e str),
}

/// One `attribute <op> :value` conjunct.
#[derive(Debug)]
struct KeyTerm<'e> {
    attribute: String,
    op: TermOp<'e>,
}

impl<'e> KeyTerm<'e> {
    fn from_expr(expr: &'e Expr, names: &HashMap<String, String>) -> Result<Self, MemoryError> {
        let (path, op) = match expr {
            Expr::Compare { left, op, right } => match (&**left, &**right) {
                (Operand::Path(_), Operand::Value(v)) => (&**left, TermOp::Compare(*op, v)),
                (Operand::Value(v), Operand::Path(_)) => (&**right, TermOp::Compare(flip(*op), v)),
                _ => return Err(unsupported(expr)),
            },
            Expr::Between { value, low, high } => match (&**low, &**high) {
                (Operand::Value(lo), Operand::Value(hi)) => (&**value, TermOp::Between(lo, hi)),
                _ => return Err(unsupported(expr)),
            },
            Expr::Function {
                name: FunctionName::BeginsWith,
                args,
            } => match args.as_slice() {
                [path, Operand::Value(prefix)] => (path, TermOp::BeginsWith(prefix)),
                _ => return Err(unsupported(expr)),
            },
            _ => return Err(unsupported(expr)),
        };

        let Operand::Path(path) = path else {
            return Err(unsupported(expr));
        };
        let [PathElement::Attribute(name)] = path.elements.as_slice() else {
            return Err(MemoryError::InvalidKeyCondition(format!(
                "key attribute must be a top-level attribute: {path}"
            )));
        };
        let attribute = if name.starts_with('#') {
            names
                .get(name)
                .cloned()
                .ok_or_else(|| ExpressionError::UnresolvedName { name: name.clone() })?
        } else {
            name.clone()
        };
        Ok(Self { attribute, op })
    }

    fn partition_value(
        &self,
        attr: &KeyAttribute,
        values: &HashMap<String, AttributeValue>,
    ) -> Result<SortableAttributeValue, MemoryError> {
        match self.op {
            TermOp::Compare(CompareOp::Eq, value) => key_value(attr, value, values),
            _ => Err(MemoryError::InvalidKeyCondition(format!(
                "partition key {} only supports equality",
                attr.name
            ))),
        }
    }

    fn sort_condition(
        &self,
        attr: &KeyAttribute,
        values: &HashMap<String, AttributeValue>,
    ) -> Result<SortKeyCondition, MemoryError> {
        Ok(match self.op {
            TermOp::Compare(op, value) => {
                let v = key_value(attr, value, values)?;
                match op {
                    CompareOp::Eq => SortKeyCondition::Eq(v),
                    CompareOp::Lt => SortKeyCondition::Lt(v),
                    CompareOp::Le => SortKeyCondition::Le(v),
                    CompareOp::Gt => SortKeyCondition::Gt(v),
                    CompareOp::Ge => SortKeyCondition::Ge(v),
                    CompareOp::Ne => {
                        return Err(MemoryError::InvalidKeyCondition(
                            "unsupported operator on key: <>".to_owned(),
                        ));
                    }
                }
            }
            TermOp::Between(lo, hi) => {
                let lo = key_value(attr, lo, values)?;
                let hi = key_value(attr, hi, values)?;
                if lo > hi {
                    return Err(MemoryError::InvalidKeyCondition(
                        "BETWEEN lower bound is greater than the upper bound".to_owned(),
                    ));
                }
                SortKeyCondition::Between(lo, hi)
            }
            TermOp::BeginsWith(prefix) => match key_value(attr, prefix, values)? {
                SortableAttributeValue::S(prefix) => SortKeyCondition::BeginsWith(prefix),
                _ => {
                    return Err(MemoryError::InvalidKeyCondition(format!(
                        "begins_with requires a string sort key: {}",
                        attr.name
                    )));
                }
            },
        })
    }
}

fn key_value(
    attr: &KeyAttribute,
    placeholder: &str,
    values: &HashMap<String, AttributeValue>,
) -> Result<SortableAttributeValue, MemoryError> {
    let key = format!(":{placeholder}");
    let value = values
        .get(&key)
        .ok_or(ExpressionError::UnresolvedValue { name: key })?;
    validate_key_type(attr, value)?;
    Ok(SortableAttributeValue::from_attribute_value(&attr.name, value)?)
}

fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Le => CompareOp::Ge,
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Ge => CompareOp::Le,
        other => other,
    }
}

fn unsupported(expr: &Expr) -> MemoryError {
    MemoryError::InvalidKeyCondition(format!("unsupported key condition term: {expr:?}"))
}
