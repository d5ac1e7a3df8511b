//! Evaluates parsed filter expressions and projections against stored items.

use std::collections::HashMap;

use dynaquery_model::{AttributeValue, Item};

use super::ast::{AttributePath, CompareOp, Expr, FunctionName, LogicalOp, Operand, PathElement};
use super::parser::ExpressionError;

/// An item bound to the placeholder maps of one request.
#[derive(Debug)]
pub struct EvalContext<'a> {
    /// The item under evaluation.
    pub item: &'a Item,
    /// `#name` to attribute name.
    pub names: &'a HashMap<String, String>,
    /// `:value` to attribute value.
    pub values: &'a HashMap<String, AttributeValue>,
}

impl EvalContext<'_> {
    /// Evaluate a condition against the item.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError` for unresolved placeholders or operands of
    /// the wrong shape.
    pub fn evaluate(&self, expr: &Expr) -> Result<bool, ExpressionError> {
        match expr {
            Expr::Compare { left, op, right } => self.eval_compare(left, *op, right),
            Expr::Between { value, low, high } => self.eval_between(value, low, high),
            Expr::In { value, list } => self.eval_in(value, list),
            Expr::Logical { op, left, right } => self.eval_logical(*op, left, right),
            Expr::Not(inner) => self.evaluate(inner).map(|v| !v),
            Expr::Function { name, args } => self.eval_function(*name, args),
        }
    }

    fn eval_compare(
        &self,
        left: &Operand,
        op: CompareOp,
        right: &Operand,
    ) -> Result<bool, ExpressionError> {
        let lval = self.resolve_operand(left)?;
        let rval = self.resolve_operand(right)?;

        // A missing attribute never compares true.
        let (Some(lv), Some(rv)) = (&lval, &rval) else {
            return Ok(false);
        };
        compare_values(lv, rv, op)
    }

    fn eval_between(
        &self,
        value: &Operand,
        low: &Operand,
        high: &Operand,
    ) -> Result<bool, ExpressionError> {
        let v = self.resolve_operand(value)?;
        let lo = self.resolve_operand(low)?;
        let hi = self.resolve_operand(high)?;

        let (Some(v), Some(lo), Some(hi)) = (&v, &lo, &hi) else {
            return Ok(false);
        };
        Ok(compare_values(v, lo, CompareOp::Ge)? && compare_values(v, hi, CompareOp::Le)?)
    }

    fn eval_in(&self, value: &Operand, list: &[Operand]) -> Result<bool, ExpressionError> {
        let Some(v) = self.resolve_operand(value)? else {
            return Ok(false);
        };
        for candidate in list {
            if let Some(c) = self.resolve_operand(candidate)? {
                if compare_values(&v, &c, CompareOp::Eq)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn eval_logical(&self, op: LogicalOp, left: &Expr, right: &Expr) -> Result<bool, ExpressionError> {
        match op {
            LogicalOp::And => Ok(self.evaluate(left)? && self.evaluate(right)?),
            LogicalOp::Or => Ok(self.evaluate(left)? || self.evaluate(right)?),
        }
    }

    fn eval_function(&self, name: FunctionName, args: &[Operand]) -> Result<bool, ExpressionError> {
        let path = operand_as_path(args.first(), name)?;
        match name {
            FunctionName::AttributeExists => Ok(self.resolve_path(path).is_some()),
            FunctionName::AttributeNotExists => Ok(self.resolve_path(path).is_none()),
            FunctionName::AttributeType => {
                let Some(AttributeValue::S(expected)) = self.second_arg(args, name)? else {
                    return Err(ExpressionError::TypeMismatch {
                        message: "attribute_type second argument must be a string".to_owned(),
                    });
                };
                Ok(self
                    .resolve_path(path)
                    .is_some_and(|val| val.type_descriptor() == expected))
            }
            FunctionName::BeginsWith => {
                let prefix = self.second_arg(args, name)?;
                let Some(attr) = self.resolve_path(path) else {
                    return Ok(false);
                };
                match (attr, prefix) {
                    (AttributeValue::S(s), Some(AttributeValue::S(p))) => Ok(s.starts_with(&p)),
                    (AttributeValue::B(b), Some(AttributeValue::B(p))) => Ok(b.starts_with(&p)),
                    (_, Some(AttributeValue::S(_) | AttributeValue::B(_))) => Ok(false),
                    _ => Err(ExpressionError::TypeMismatch {
                        message: "begins_with prefix must be a string or binary".to_owned(),
                    }),
                }
            }
            FunctionName::Contains => {
                let search = self.second_arg(args, name)?;
                let (Some(attr), Some(search)) = (self.resolve_path(path), search) else {
                    return Ok(false);
                };
                Ok(match (attr, &search) {
                    (AttributeValue::S(s), AttributeValue::S(sub)) => s.contains(sub.as_str()),
                    (AttributeValue::Ss(set), AttributeValue::S(val))
                    | (AttributeValue::Ns(set), AttributeValue::N(val)) => set.contains(val),
                    (AttributeValue::Bs(set), AttributeValue::B(val)) => set.contains(val),
                    (AttributeValue::L(list), _) => list.contains(&search),
                    _ => false,
                })
            }
        }
    }

    fn second_arg(
        &self,
        args: &[Operand],
        name: FunctionName,
    ) -> Result<Option<AttributeValue>, ExpressionError> {
        let operand = args.get(1).ok_or_else(|| ExpressionError::InvalidOperand {
            operation: name.to_string(),
            message: "missing second argument".to_owned(),
        })?;
        self.resolve_operand(operand)
    }

    /// Resolve an operand to a value, `None` when the path is absent.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError::UnresolvedValue` for an unknown `:value`.
    pub fn resolve_operand(
        &self,
        operand: &Operand,
    ) -> Result<Option<AttributeValue>, ExpressionError> {
        match operand {
            Operand::Path(path) => Ok(self.resolve_path(path).cloned()),
            Operand::Value(name) => {
                let key = format!(":{name}");
                match self.values.get(&key) {
                    Some(v) => Ok(Some(v.clone())),
                    None => Err(ExpressionError::UnresolvedValue { name: key }),
                }
            }
            Operand::Size(path) => Ok(self
                .resolve_path(path)
                .map(|v| AttributeValue::N(attribute_size(v).to_string()))),
        }
    }

    /// Walk a path through the item, substituting `#name` placeholders.
    #[must_use]
    pub fn resolve_path(&self, path: &AttributePath) -> Option<&AttributeValue> {
        let mut current: Option<&AttributeValue> = None;

        for (i, element) in path.elements.iter().enumerate() {
            match element {
                PathElement::Attribute(name) => {
                    let name = self.substitute(name)?;
                    current = if i == 0 {
                        self.item.get(name)
                    } else {
                        current?.as_m()?.get(name)
                    };
                }
                PathElement::Index(idx) => {
                    current = current?.as_l()?.get(*idx);
                }
            }
        }
        current
    }

    fn substitute<'n>(&'n self, name: &'n str) -> Option<&'n str> {
        if name.starts_with('#') {
            self.names.get(name).map(String::as_str)
        } else {
            Some(name)
        }
    }

    /// Keep only the projected attributes. A nested path keeps its whole
    /// top-level attribute.
    #[must_use]
    pub fn apply_projection(&self, paths: &[AttributePath]) -> Item {
        let mut result = Item::new();
        for path in paths {
            if self.resolve_path(path).is_none() {
                continue;
            }
            let Some(PathElement::Attribute(top)) = path.elements.first() else {
                continue;
            };
            if let Some(top) = self.substitute(top) {
                if let Some(val) = self.item.get(top) {
                    result.insert(top.to_owned(), val.clone());
                }
            }
        }
        result
    }
}

/// Compare two values. Mismatched types only satisfy `<>`.
///
/// # Errors
///
/// Returns `ExpressionError::TypeMismatch` for malformed number text.
pub fn compare_values(
    left: &AttributeValue,
    right: &AttributeValue,
    op: CompareOp,
) -> Result<bool, ExpressionError> {
    match (left, right) {
        (AttributeValue::S(a), AttributeValue::S(b)) => Ok(compare_ord(a, b, op)),
        (AttributeValue::N(a), AttributeValue::N(b)) => {
            Ok(compare_f64(parse_number(a)?, parse_number(b)?, op))
        }
        (AttributeValue::B(a), AttributeValue::B(b)) => Ok(compare_ord(a, b, op)),
        (AttributeValue::Bool(a), AttributeValue::Bool(b)) => Ok(compare_ord(a, b, op)),
        (AttributeValue::Null(_), AttributeValue::Null(_)) => {
            Ok(matches!(op, CompareOp::Eq | CompareOp::Le | CompareOp::Ge))
        }
        (
            AttributeValue::Ss(_)
            | AttributeValue::Ns(_)
            | AttributeValue::Bs(_)
            | AttributeValue::L(_)
            | AttributeValue::M(_),
            _,
        ) if matches!(op, CompareOp::Eq | CompareOp::Ne) => {
            Ok((left == right) == (op == CompareOp::Eq))
        }
        _ => Ok(op == CompareOp::Ne),
    }
}

fn compare_ord<T: Ord + ?Sized>(a: &T, b: &T, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

fn compare_f64(a: f64, b: f64, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => (a - b).abs() < f64::EPSILON,
        CompareOp::Ne => (a - b).abs() >= f64::EPSILON,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

fn parse_number(s: &str) -> Result<f64, ExpressionError> {
    s.parse::<f64>().map_err(|_| ExpressionError::TypeMismatch {
        message: format!("'{s}' is not a valid number"),
    })
}

fn attribute_size(val: &AttributeValue) -> usize {
    match val {
        AttributeValue::S(s) | AttributeValue::N(s) => s.len(),
        AttributeValue::B(b) => b.len(),
        AttributeValue::Ss(v) | AttributeValue::Ns(v) => v.len(),
        AttributeValue::Bs(v) => v.len(),
        AttributeValue::Bool(_) | AttributeValue::Null(_) => 1,
        AttributeValue::L(v) => v.len(),
        AttributeValue::M(m) => m.len(),
    }
}

fn operand_as_path(
    operand: Option<&Operand>,
    name: FunctionName,
) -> Result<&AttributePath, ExpressionError> {
    match operand {
        Some(Operand::Path(path)) => Ok(path),
        _ => Err(ExpressionError::InvalidOperand {
            operation: name.to_string(),
            message: "first argument must be an attribute path".to_owned(),
        }),
    }
}
