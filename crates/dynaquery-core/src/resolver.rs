//! Attribute name aliasing for reserved keywords and non-identifier names.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;

use crate::reserved::is_reserved;

/// Prefix turning an attribute name into an expression attribute name.
const ALIAS_PREFIX: char = '#';

/// An attribute name as it appears inside an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedName {
    original: String,
    expression: String,
}

impl ResolvedName {
    /// The attribute name as stored.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The token to write into an expression: the name itself, or its alias.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether the name went through an alias.
    #[must_use]
    pub fn is_aliased(&self) -> bool {
        self.original != self.expression
    }
}

/// Maps attribute names to expression tokens, aliasing reserved keywords and
/// names that are not plain identifiers (`user-id`, `a.b`).
///
/// Aliases are `#` followed by [`escape_name`] of the original, so a reserved
/// word keeps its spelling (`#number`). The escape is injective, which makes
/// the mapping a bijection between aliased originals and their tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameResolver {
    aliased: BTreeSet<String>,
}

impl NameResolver {
    /// A resolver with no registrations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name`, registering an alias when it is a reserved keyword or
    /// not a valid bare token.
    pub fn resolve(&mut self, name: &str) -> ResolvedName {
        if !needs_alias(name) {
            return ResolvedName {
                original: name.to_owned(),
                expression: name.to_owned(),
            };
        }

        self.aliased.insert(name.to_owned());
        ResolvedName {
            original: name.to_owned(),
            expression: alias_of(name),
        }
    }

    /// Every registered alias mapped back to its attribute name.
    #[must_use]
    pub fn alias_map(&self) -> HashMap<String, String> {
        self.aliased
            .iter()
            .map(|name| (alias_of(name), name.clone()))
            .collect()
    }

    /// Whether any alias has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliased.is_empty()
    }

    /// Render a comma separated projection over `attributes`, aliasing as
    /// needed. Returns `None` when there is nothing to project.
    pub fn projection<'a>(
        &mut self,
        attributes: impl IntoIterator<Item = &'a String>,
    ) -> Option<String> {
        let tokens: Vec<String> = attributes
            .into_iter()
            .map(|attr| self.resolve(attr).expression)
            .collect();
        (!tokens.is_empty()).then(|| tokens.join(","))
    }
}

/// Escape `name` into `[A-Za-z0-9_]`: ASCII alphanumerics are kept, every
/// other byte (`_` included) becomes `_` plus two uppercase hex digits.
///
/// `_` only ever starts an escape, so distinct names never share an escape.
#[must_use]
pub fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() {
            escaped.push(char::from(byte));
        } else {
            let _ = write!(escaped, "_{byte:02X}");
        }
    }
    escaped
}

fn needs_alias(name: &str) -> bool {
    let mut chars = name.chars();
    let is_identifier = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    !is_identifier || is_reserved(name)
}

fn alias_of(name: &str) -> String {
    format!("{ALIAS_PREFIX}{}", escape_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_leave_ordinary_names_alone() {
        let mut resolver = NameResolver::new();
        for name in ["PK", "SK", "GSI1PK", "createdAt"] {
            let resolved = resolver.resolve(name);
            assert_eq!(resolved.expression(), name);
            assert!(!resolved.is_aliased());
        }
        assert!(resolver.is_empty());
        assert!(resolver.alias_map().is_empty());
    }

    #[test]
    fn test_should_alias_reserved_names() {
        let mut resolver = NameResolver::new();
        let number = resolver.resolve("number");
        let status = resolver.resolve("Status");

        assert_eq!(number.expression(), "#number");
        assert_eq!(status.expression(), "#Status");
        assert_ne!(number.expression(), status.expression());

        let aliases = resolver.alias_map();
        assert_eq!(aliases["#number"], "number");
        assert_eq!(aliases["#Status"], "Status");
        assert_eq!(aliases.len(), 2);
    }

    #[test]
    fn test_should_register_repeated_names_once() {
        let mut resolver = NameResolver::new();
        resolver.resolve("data");
        resolver.resolve("data");
        assert_eq!(resolver.alias_map().len(), 1);
    }

    #[test]
    fn test_should_alias_non_identifier_names() {
        let mut resolver = NameResolver::new();
        let dashed = resolver.resolve("user-id");
        let underscored = resolver.resolve("user_id");

        assert_eq!(dashed.expression(), "#user_2Did");
        assert!(!underscored.is_aliased());
        assert_eq!(resolver.resolve("1st").expression(), "#1st");

        let aliases = resolver.alias_map();
        assert_eq!(aliases["#user_2Did"], "user-id");
        assert_eq!(aliases.len(), 2);
    }

    #[test]
    fn test_should_escape_names_injectively() {
        assert_eq!(escape_name("user-id"), "user_2Did");
        assert_eq!(escape_name("user_id"), "user_5Fid");
        assert_ne!(escape_name("a_2Db"), escape_name("a-b"));
        assert_eq!(escape_name("é"), "_C3_A9");
    }

    #[test]
    fn test_should_render_projection() {
        let mut resolver = NameResolver::new();
        let attrs: BTreeSet<String> = ["boolean", "title"].map(String::from).into();
        assert_eq!(
            resolver.projection(&attrs).as_deref(),
            Some("#boolean,title")
        );
        assert_eq!(resolver.alias_map()["#boolean"], "boolean");
        assert_eq!(resolver.projection(&BTreeSet::new()), None);
    }
}
