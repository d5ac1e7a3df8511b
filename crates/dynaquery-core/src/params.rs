//! Build-time parameters and template substitution.
//!
//! String operands of key conditions are templates: `{name}` is replaced with
//! the parameter `name`, and `{{` / `}}` stand for literal braces. This lets a
//! single builder be reused for many lookups, e.g. `"USER#{user_id}"`.

use std::collections::BTreeMap;

use crate::error::QueryError;

/// Named parameters substituted into string operands at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    /// An empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(name.into(), value.to_string());
        self
    }

    /// Look up a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Substitute every `{name}` in `template`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::TemplateSubstitution` when a referenced parameter
    /// is missing or a brace is left unbalanced.
    pub fn substitute(&self, template: &str) -> Result<String, QueryError> {
        let fail = |key: &str| QueryError::TemplateSubstitution {
            template: template.to_owned(),
            key: key.to_owned(),
        };

        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => return Err(fail(&name)),
                        }
                    }
                    let value = self.get(&name).ok_or_else(|| fail(&name))?;
                    out.push_str(value);
                }
                '}' => return Err(fail("}")),
                c => out.push(c),
            }
        }
        Ok(out)
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_substitute_named_parameters() {
        let params = Params::new().with("user", "42").with("kind", "ORDER");
        assert_eq!(
            params.substitute("USER#{user}#{kind}").unwrap(),
            "USER#42#ORDER"
        );
    }

    #[test]
    fn test_should_pass_plain_strings_through() {
        assert_eq!(
            Params::new().substitute("FluentAPITest").unwrap(),
            "FluentAPITest"
        );
    }

    #[test]
    fn test_should_unescape_doubled_braces() {
        assert_eq!(Params::new().substitute("{{x}}").unwrap(), "{x}");
    }

    #[test]
    fn test_should_fail_on_missing_parameter() {
        let err = Params::new().substitute("USER#{user}").unwrap_err();
        assert!(matches!(
            err,
            QueryError::TemplateSubstitution { ref key, .. } if key == "user"
        ));
    }

    #[test]
    fn test_should_fail_on_unbalanced_braces() {
        assert!(Params::new().substitute("USER#{user").is_err());
        assert!(Params::new().substitute("USER}").is_err());
    }

    #[test]
    fn test_should_collect_from_pairs() {
        let params: Params = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(params.get("b"), Some("2"));
    }
}
