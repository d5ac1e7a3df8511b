//! Boolean predicate tree over item attributes.

use std::ops::{BitAnd, BitOr, Not};

use dynaquery_model::Value;

/// Start a predicate on the attribute at `path` (`"a.b[0].c"` style paths are
/// accepted).
#[must_use]
pub fn attr(path: impl Into<String>) -> ValueOf {
    ValueOf { path: path.into() }
}

/// Comparison operators shared by attribute and size comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl Comparator {
    /// The expression symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// Stored attribute types, for `attribute_type` checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// String.
    String,
    /// Number.
    Number,
    /// Binary.
    Binary,
    /// String set.
    StringSet,
    /// Number set.
    NumberSet,
    /// Binary set.
    BinarySet,
    /// Boolean.
    Bool,
    /// Null.
    Null,
    /// List.
    List,
    /// Map.
    Map,
}

impl AttributeKind {
    /// Wire type descriptor.
    #[must_use]
    pub fn descriptor(self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
            Self::StringSet => "SS",
            Self::NumberSet => "NS",
            Self::BinarySet => "BS",
            Self::Bool => "BOOL",
            Self::Null => "NULL",
            Self::List => "L",
            Self::Map => "M",
        }
    }
}

/// Left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// The attribute itself.
    Path(String),
    /// `size(attribute)`.
    Size(String),
}

impl Operand {
    /// The attribute path the operand reads.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Path(p) | Self::Size(p) => p,
        }
    }
}

/// A filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `operand <op> value`
    Compare {
        /// Left-hand side.
        operand: Operand,
        /// Operator.
        comparator: Comparator,
        /// Right-hand side.
        value: Value,
    },
    /// `operand BETWEEN lower AND upper`
    Between {
        /// Left-hand side.
        operand: Operand,
        /// Inclusive lower bound.
        lower: Value,
        /// Inclusive upper bound.
        upper: Value,
    },
    /// `path IN (v1, v2, ...)`
    In {
        /// Attribute path.
        path: String,
        /// Candidates.
        values: Vec<Value>,
    },
    /// `begins_with(path, prefix)`
    BeginsWith {
        /// Attribute path.
        path: String,
        /// Prefix.
        prefix: Value,
    },
    /// `contains(path, value)`
    Contains {
        /// Attribute path.
        path: String,
        /// Element or substring.
        value: Value,
    },
    /// `attribute_exists(path)`
    Exists(String),
    /// `attribute_not_exists(path)`
    NotExists(String),
    /// `attribute_type(path, type)`
    AttributeType {
        /// Attribute path.
        path: String,
        /// Expected type.
        kind: AttributeKind,
    },
    /// Both hold.
    And(Box<Predicate>, Box<Predicate>),
    /// Either holds.
    Or(Box<Predicate>, Box<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// `self AND other`
    #[must_use]
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// `self OR other`
    #[must_use]
    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// `NOT self`
    #[must_use]
    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        self.and(rhs)
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        self.or(rhs)
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        self.negate()
    }
}

/// Builder for predicates on one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueOf {
    path: String,
}

macro_rules! comparisons {
    ($($(#[$doc:meta])* $name:ident => $cmp:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub fn $name(&self, value: impl Into<Value>) -> Predicate {
                Predicate::Compare {
                    operand: self.operand(),
                    comparator: Comparator::$cmp,
                    value: value.into(),
                }
            }
        )*
    };
}

impl ValueOf {
    fn operand(&self) -> Operand {
        Operand::Path(self.path.clone())
    }

    comparisons! {
        /// `attr = value`
        eq => Eq,
        /// `attr <> value`
        ne => Ne,
        /// `attr < value`
        lt => Lt,
        /// `attr <= value`
        lte => Lte,
        /// `attr > value`
        gt => Gt,
        /// `attr >= value`
        gte => Gte,
    }

    /// `attr BETWEEN lower AND upper`
    #[must_use]
    pub fn between(&self, lower: impl Into<Value>, upper: impl Into<Value>) -> Predicate {
        Predicate::Between {
            operand: self.operand(),
            lower: lower.into(),
            upper: upper.into(),
        }
    }

    /// `attr IN (...)`
    #[must_use]
    pub fn is_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::In {
            path: self.path.clone(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `begins_with(attr, prefix)`
    #[must_use]
    pub fn begins_with(&self, prefix: impl Into<Value>) -> Predicate {
        Predicate::BeginsWith {
            path: self.path.clone(),
            prefix: prefix.into(),
        }
    }

    /// `contains(attr, value)`
    #[must_use]
    pub fn contains(&self, value: impl Into<Value>) -> Predicate {
        Predicate::Contains {
            path: self.path.clone(),
            value: value.into(),
        }
    }

    /// `attribute_exists(attr)`
    #[must_use]
    pub fn exists(&self) -> Predicate {
        Predicate::Exists(self.path.clone())
    }

    /// `attribute_not_exists(attr)`
    #[must_use]
    pub fn not_exists(&self) -> Predicate {
        Predicate::NotExists(self.path.clone())
    }

    /// `attribute_type(attr, kind)`
    #[must_use]
    pub fn attribute_type(&self, kind: AttributeKind) -> Predicate {
        Predicate::AttributeType {
            path: self.path.clone(),
            kind,
        }
    }

    /// Compare on `size(attr)` instead of the value.
    #[must_use]
    pub fn size(&self) -> SizeOf {
        SizeOf {
            path: self.path.clone(),
        }
    }
}

/// Builder for predicates on `size(attribute)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeOf {
    path: String,
}

impl SizeOf {
    fn operand(&self) -> Operand {
        Operand::Size(self.path.clone())
    }

    comparisons! {
        /// `size(attr) = value`
        eq => Eq,
        /// `size(attr) <> value`
        ne => Ne,
        /// `size(attr) < value`
        lt => Lt,
        /// `size(attr) <= value`
        lte => Lte,
        /// `size(attr) > value`
        gt => Gt,
        /// `size(attr) >= value`
        gte => Gte,
    }

    /// `size(attr) BETWEEN lower AND upper`
    #[must_use]
    pub fn between(&self, lower: impl Into<Value>, upper: impl Into<Value>) -> Predicate {
        Predicate::Between {
            operand: self.operand(),
            lower: lower.into(),
            upper: upper.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_combine_with_operators() {
        let p = attr("a").eq(1) & !attr("b").exists() | attr("c").lt(2);
        let Predicate::Or(left, _) = p else {
            panic!("expected OR at the root");
        };
        assert!(matches!(*left, Predicate::And(_, ref rhs) if matches!(**rhs, Predicate::Not(_))));
    }

    #[test]
    fn test_should_build_size_comparisons() {
        let p = attr("tags").size().gte(2);
        assert_eq!(
            p,
            Predicate::Compare {
                operand: Operand::Size("tags".to_owned()),
                comparator: Comparator::Gte,
                value: Value::from(2),
            }
        );
    }
}
