//! Syntax tree for condition, key-condition and projection expressions.

use std::collections::HashSet;
use std::fmt;

/// A condition, filter or key-condition expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// `left op right`
    Compare {
        /// Left-hand operand.
        left: Box<Operand>,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand operand.
        right: Box<Operand>,
    },
    /// `value BETWEEN low AND high`
    Between {
        /// Value to test.
        value: Box<Operand>,
        /// Inclusive lower bound.
        low: Box<Operand>,
        /// Inclusive upper bound.
        high: Box<Operand>,
    },
    /// `value IN (list...)`
    In {
        /// Value to search for.
        value: Box<Operand>,
        /// Candidates.
        list: Vec<Operand>,
    },
    /// `left AND right` / `left OR right`
    Logical {
        /// Connective.
        op: LogicalOp,
        /// Left-hand expression.
        left: Box<Expr>,
        /// Right-hand expression.
        right: Box<Expr>,
    },
    /// `NOT expr`
    Not(Box<Expr>),
    /// `function(args...)`
    Function {
        /// Function name.
        name: FunctionName,
        /// Arguments.
        args: Vec<Operand>,
    },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "<>"),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// Logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `AND`
    And,
    /// `OR`
    Or,
}

/// Condition functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionName {
    /// `attribute_exists(path)`
    AttributeExists,
    /// `attribute_not_exists(path)`
    AttributeNotExists,
    /// `attribute_type(path, type)`
    AttributeType,
    /// `begins_with(path, prefix)`
    BeginsWith,
    /// `contains(path, operand)`
    Contains,
}

impl FunctionName {
    /// Number of arguments the function takes.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::AttributeExists | Self::AttributeNotExists => 1,
            Self::AttributeType | Self::BeginsWith | Self::Contains => 2,
        }
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttributeExists => write!(f, "attribute_exists"),
            Self::AttributeNotExists => write!(f, "attribute_not_exists"),
            Self::AttributeType => write!(f, "attribute_type"),
            Self::BeginsWith => write!(f, "begins_with"),
            Self::Contains => write!(f, "contains"),
        }
    }
}

/// A value producer inside an expression.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Document path (`info.rating`, `#name`, `tags[0]`).
    Path(AttributePath),
    /// Value placeholder, stored without the leading `:`.
    Value(String),
    /// `size(path)`
    Size(AttributePath),
}

/// A document path.
#[derive(Debug, Clone)]
pub struct AttributePath {
    /// Elements in order.
    pub elements: Vec<PathElement>,
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, elem) in self.elements.iter().enumerate() {
            match elem {
                PathElement::Attribute(name) if i > 0 => write!(f, ".{name}")?,
                PathElement::Attribute(name) => write!(f, "{name}")?,
                PathElement::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// One element of a document path.
#[derive(Debug, Clone)]
pub enum PathElement {
    /// A named attribute or `#placeholder`.
    Attribute(String),
    /// A list index.
    Index(usize),
}

/// Collect every `#name` reference used in `expr`.
#[allow(clippy::implicit_hasher)]
pub fn collect_names(expr: &Expr, names: &mut HashSet<String>) {
    visit_operands(expr, &mut |operand| match operand {
        Operand::Path(path) | Operand::Size(path) => collect_path_names(path, names),
        Operand::Value(_) => {}
    });
}

/// Collect every `:value` reference used in `expr`, with the `:` prefix.
#[allow(clippy::implicit_hasher)]
pub fn collect_values(expr: &Expr, values: &mut HashSet<String>) {
    visit_operands(expr, &mut |operand| {
        if let Operand::Value(name) = operand {
            values.insert(format!(":{name}"));
        }
    });
}

/// Collect every `#name` reference used in projection paths.
#[allow(clippy::implicit_hasher)]
pub fn collect_projection_names(paths: &[AttributePath], names: &mut HashSet<String>) {
    for path in paths {
        collect_path_names(path, names);
    }
}

/// Collect the first element of every path in `expr`, as written.
#[allow(clippy::implicit_hasher)]
pub fn collect_top_level_names(expr: &Expr, names: &mut HashSet<String>) {
    visit_operands(expr, &mut |operand| {
        if let Operand::Path(path) | Operand::Size(path) = operand {
            if let Some(PathElement::Attribute(name)) = path.elements.first() {
                names.insert(name.clone());
            }
        }
    });
}

fn visit_operands(expr: &Expr, visit: &mut impl FnMut(&Operand)) {
    match expr {
        Expr::Compare { left, right, .. } => {
            visit(&**left);
            visit(&**right);
        }
        Expr::Between { value, low, high } => {
            visit(&**value);
            visit(&**low);
            visit(&**high);
        }
        Expr::In { value, list } => {
            visit(&**value);
            list.iter().for_each(&mut *visit);
        }
        Expr::Logical { left, right, .. } => {
            visit_operands(left, visit);
            visit_operands(right, visit);
        }
        Expr::Not(inner) => visit_operands(inner, visit),
        Expr::Function { args, .. } => args.iter().for_each(&mut *visit),
    }
}

fn collect_path_names(path: &AttributePath, names: &mut HashSet<String>) {
    for element in &path.elements {
        if let PathElement::Attribute(name) = element {
            if name.starts_with('#') {
                names.insert(name.clone());
            }
        }
    }
}
