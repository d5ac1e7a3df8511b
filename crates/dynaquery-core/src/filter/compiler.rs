//! Predicate compilation into expression text plus placeholder maps.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use dynaquery_model::{AttributeValue, Value, codec};

use super::predicate::{Operand, Predicate};
use crate::error::QueryError;

/// A compiled filter: expression and the placeholders it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    /// Expression text.
    pub expression: String,
    /// Name placeholder to attribute name.
    pub names: HashMap<String, String>,
    /// Value placeholder to wire value.
    pub values: HashMap<String, AttributeValue>,
}

/// Turns a predicate tree into a [`CompiledFilter`].
///
/// Implementations must keep the three parts consistent: every placeholder
/// the expression uses is defined, and nothing else is.
pub trait FilterCompiler {
    /// Compile `predicate`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidFilter` when the predicate has no
    /// expression form.
    fn compile(&self, predicate: &Predicate) -> Result<CompiledFilter, QueryError>;
}

/// The default compiler: `#n<i>` name placeholders (one per distinct path
/// segment) and `:v<i>` value placeholders (one per operand).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionCompiler;

impl FilterCompiler for ExpressionCompiler {
    fn compile(&self, predicate: &Predicate) -> Result<CompiledFilter, QueryError> {
        let mut state = CompileState::default();
        let expression = state.predicate(predicate)?;
        Ok(CompiledFilter {
            expression,
            names: state
                .names
                .into_iter()
                .map(|(name, placeholder)| (placeholder, name))
                .collect(),
            values: state.values,
        })
    }
}

#[derive(Default)]
struct CompileState {
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl CompileState {
    fn predicate(&mut self, predicate: &Predicate) -> Result<String, QueryError> {
        Ok(match predicate {
            Predicate::Compare {
                operand,
                comparator,
                value,
            } => {
                let lhs = self.operand(operand)?;
                let rhs = self.value(value);
                format!("{lhs} {} {rhs}", comparator.symbol())
            }
            Predicate::Between {
                operand,
                lower,
                upper,
            } => {
                let lhs = self.operand(operand)?;
                let lower = self.value(lower);
                let upper = self.value(upper);
                format!("{lhs} BETWEEN {lower} AND {upper}")
            }
            Predicate::In { path, values } => {
                if values.is_empty() {
                    return Err(QueryError::InvalidFilter(format!(
                        "IN on `{path}` needs at least one candidate"
                    )));
                }
                let lhs = self.path(path)?;
                let candidates: Vec<String> = values.iter().map(|v| self.value(v)).collect();
                format!("{lhs} IN ({})", candidates.join(", "))
            }
            Predicate::BeginsWith { path, prefix } => {
                let lhs = self.path(path)?;
                format!("begins_with({lhs}, {})", self.value(prefix))
            }
            Predicate::Contains { path, value } => {
                let lhs = self.path(path)?;
                format!("contains({lhs}, {})", self.value(value))
            }
            Predicate::Exists(path) => format!("attribute_exists({})", self.path(path)?),
            Predicate::NotExists(path) => format!("attribute_not_exists({})", self.path(path)?),
            Predicate::AttributeType { path, kind } => {
                let lhs = self.path(path)?;
                let kind = self.value(&Value::from(kind.descriptor()));
                format!("attribute_type({lhs}, {kind})")
            }
            Predicate::And(a, b) => format!("({} AND {})", self.predicate(a)?, self.predicate(b)?),
            Predicate::Or(a, b) => format!("({} OR {})", self.predicate(a)?, self.predicate(b)?),
            Predicate::Not(inner) => format!("(NOT {})", self.predicate(inner)?),
        })
    }

    fn operand(&mut self, operand: &Operand) -> Result<String, QueryError> {
        match operand {
            Operand::Path(path) => self.path(path),
            Operand::Size(path) => Ok(format!("size({})", self.path(path)?)),
        }
    }

    /// `a.b[0].c` becomes `#n0.#n1[0].#n2`.
    fn path(&mut self, path: &str) -> Result<String, QueryError> {
        let invalid = || QueryError::InvalidFilter(format!("invalid attribute path `{path}`"));
        let mut rendered = Vec::new();
        for segment in path.split('.') {
            let (name, indexes) = match segment.find('[') {
                Some(pos) => segment.split_at(pos),
                None => (segment, ""),
            };
            if name.is_empty() || !valid_indexes(indexes) {
                return Err(invalid());
            }
            rendered.push(format!("{}{indexes}", self.name(name)));
        }
        Ok(rendered.join("."))
    }

    fn name(&mut self, name: &str) -> String {
        let next = self.names.len();
        match self.names.entry(name.to_owned()) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(e) => e.insert(format!("#n{next}")).clone(),
        }
    }

    fn value(&mut self, value: &Value) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values
            .insert(placeholder.clone(), codec::serialize(value));
        placeholder
    }
}

/// Zero or more `[digits]` groups.
fn valid_indexes(mut rest: &str) -> bool {
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return false;
        };
        let Some(close) = inner.find(']') else {
            return false;
        };
        let digits = &inner[..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        rest = &inner[close + 1..];
    }
    true
}

/// Merge `source` into `target`, failing if a placeholder is already bound to
/// something else.
///
/// # Errors
///
/// Returns `QueryError::PlaceholderCollision` naming the contested key.
pub fn merge_placeholders<V: PartialEq>(
    target: &mut HashMap<String, V>,
    source: HashMap<String, V>,
) -> Result<(), QueryError> {
    for (key, value) in source {
        match target.entry(key) {
            Entry::Occupied(existing) => {
                if *existing.get() != value {
                    return Err(QueryError::PlaceholderCollision {
                        placeholder: existing.key().clone(),
                    });
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AttributeKind, attr};

    fn compile(predicate: &Predicate) -> CompiledFilter {
        ExpressionCompiler.compile(predicate).unwrap()
    }

    #[test]
    fn test_should_compile_between() {
        let filter = compile(&attr("number").between(5, 10));
        assert_eq!(filter.expression, "#n0 BETWEEN :v0 AND :v1");
        assert_eq!(filter.names["#n0"], "number");
        assert_eq!(filter.values[":v0"], AttributeValue::N("5".to_owned()));
        assert_eq!(filter.values[":v1"], AttributeValue::N("10".to_owned()));
    }

    #[test]
    fn test_should_reuse_name_placeholder_for_repeated_segments() {
        let filter = compile(&(attr("a.b").eq(1) & attr("b[2]").exists()));
        assert_eq!(
            filter.expression,
            "(#n0.#n1 = :v0 AND attribute_exists(#n1[2]))"
        );
        assert_eq!(filter.names.len(), 2);
        assert_eq!(filter.names["#n1"], "b");
    }

    #[test]
    fn test_should_compile_functions_and_negation() {
        let filter = compile(
            &(!attr("name").begins_with("x")
                | attr("tags").contains("red")
                | attr("kind").attribute_type(AttributeKind::String)),
        );
        assert_eq!(
            filter.expression,
            "(((NOT begins_with(#n0, :v0)) OR contains(#n1, :v1)) OR attribute_type(#n2, :v2))"
        );
        assert_eq!(filter.values[":v2"], AttributeValue::S("S".to_owned()));
    }

    #[test]
    fn test_should_compile_in_and_size() {
        let filter = compile(&(attr("n").is_in([1, 2, 3]) & attr("l").size().gt(0)));
        assert_eq!(
            filter.expression,
            "(#n0 IN (:v0, :v1, :v2) AND size(#n1) > :v3)"
        );
    }

    #[test]
    fn test_should_reject_empty_in_and_bad_paths() {
        let empty: [i32; 0] = [];
        assert!(matches!(
            ExpressionCompiler.compile(&attr("n").is_in(empty)),
            Err(QueryError::InvalidFilter(_))
        ));
        for bad in ["", "a..b", "a[x]", "a[1", "[0]"] {
            assert!(ExpressionCompiler.compile(&attr(bad).exists()).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_should_merge_compatible_maps() {
        let mut target = HashMap::from([("#a".to_owned(), "a".to_owned())]);
        let source = HashMap::from([
            ("#a".to_owned(), "a".to_owned()),
            ("#b".to_owned(), "b".to_owned()),
        ]);
        merge_placeholders(&mut target, source).unwrap();
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn test_should_fail_on_conflicting_placeholder() {
        let mut target = HashMap::from([(":v0".to_owned(), 1)]);
        let err = merge_placeholders(&mut target, HashMap::from([(":v0".to_owned(), 2)]))
            .unwrap_err();
        assert!(matches!(err, QueryError::PlaceholderCollision { ref placeholder } if placeholder == ":v0"));
    }
}
