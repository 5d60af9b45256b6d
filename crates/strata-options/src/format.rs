//! Format-tagged values.
//!
//! Every item the transfer model moves around is a [`FormattedValue`]: a raw
//! JSON payload plus a [`Format`] tag that decides rendering and equality.
//! The rest of the crate is format-agnostic and delegates all value
//! semantics here.
//!
//! Two formats exist:
//!
//! - `Variable` - a single variable name (`"a"`)
//! - `Term` - an interaction term, a list of variable names (`["a", "b"]`),
//!   displayed joined with `✻`. Term equality is order-insensitive: the term
//!   `a✻b` equals `b✻a`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a raw payload is interpreted, rendered, and compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// A single variable name; the raw payload is a JSON string.
    Variable,
    /// An interaction term; the raw payload is a JSON array of strings.
    Term,
}

/// A raw payload paired with the format that gives it meaning.
#[derive(Clone, Debug)]
pub struct FormattedValue {
    format: Format,
    raw: Value,
}

impl FormattedValue {
    /// A variable value.
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            format: Format::Variable,
            raw: Value::String(name.into()),
        }
    }

    /// A term value from its component variable names.
    pub fn term(parts: Vec<String>) -> Self {
        Self {
            format: Format::Term,
            raw: Value::Array(parts.into_iter().map(Value::String).collect()),
        }
    }

    /// Interpret an untagged raw payload: a string is a variable, an array
    /// of strings is a term. Anything else is not a transferable value.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        match raw {
            Value::String(_) => Some(Self {
                format: Format::Variable,
                raw: raw.clone(),
            }),
            Value::Array(items) if items.iter().all(Value::is_string) => Some(Self {
                format: Format::Term,
                raw: raw.clone(),
            }),
            _ => None,
        }
    }

    /// The format tag.
    pub fn format(&self) -> Format {
        self.format
    }

    /// The raw payload.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The variable name, when this is a variable value.
    pub fn name(&self) -> Option<&str> {
        match self.format {
            Format::Variable => self.raw.as_str(),
            Format::Term => None,
        }
    }

    /// The component variable names: one for a variable, the element list
    /// for a term.
    pub fn parts(&self) -> Vec<String> {
        match &self.raw {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Format-aware equality.
    ///
    /// Variables compare by name. Terms compare as multisets, so the order
    /// of factors within a term does not matter. Values of different
    /// formats are never equal.
    pub fn equal_to(&self, other: &FormattedValue) -> bool {
        if self.format != other.format {
            return false;
        }
        match self.format {
            Format::Variable => self.raw == other.raw,
            Format::Term => multiset_equal(&self.parts(), &other.parts()),
        }
    }

    /// Convert to another format.
    ///
    /// A variable converted to a term becomes the name repeated `power`
    /// times, so a squared variable participates in expansion as a repeated
    /// factor. A term converts to a variable only when all its factors are
    /// the same name; otherwise the value is returned unchanged.
    pub fn convert(&self, to: Format, power: u8) -> FormattedValue {
        if self.format == to {
            return self.clone();
        }
        match to {
            Format::Term => FormattedValue::term(self.to_term_parts(power)),
            Format::Variable => match self.as_uniform_variable() {
                Some((name, _)) => FormattedValue::variable(name),
                None => self.clone(),
            },
        }
    }

    /// The value as term factors, expanding a variable's power into
    /// repetition.
    pub fn to_term_parts(&self, power: u8) -> Vec<String> {
        match self.format {
            Format::Variable => {
                let name = self.raw.as_str().unwrap_or_default().to_string();
                vec![name; power.max(1) as usize]
            }
            Format::Term => self.parts(),
        }
    }

    /// When every factor of this value is the same name, the name and the
    /// repeat count (the power a variable rendition would carry).
    pub fn as_uniform_variable(&self) -> Option<(String, u8)> {
        let parts = self.parts();
        let first = parts.first()?;
        if parts.iter().all(|p| p == first) {
            Some((first.clone(), parts.len().min(u8::MAX as usize) as u8))
        } else {
            None
        }
    }

    /// A spoken-friendly rendition for assistive technology.
    pub fn aria_label(&self) -> String {
        match self.format {
            Format::Variable => format!("{} variable", self.raw.as_str().unwrap_or_default()),
            Format::Term => {
                let parts = self.parts();
                match parts.len() {
                    0 => String::new(),
                    1 => parts[0].clone(),
                    _ => {
                        let head = parts[..parts.len() - 1].join(", ");
                        format!(
                            "The interaction of {} and {}",
                            head,
                            parts[parts.len() - 1]
                        )
                    }
                }
            }
        }
    }
}

/// Equality delegates to [`FormattedValue::equal_to`], so `==` on values is
/// the model's logical identity (order-insensitive for terms).
impl PartialEq for FormattedValue {
    fn eq(&self, other: &Self) -> bool {
        self.equal_to(other)
    }
}

impl fmt::Display for FormattedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            Format::Variable => write!(f, "{}", self.raw.as_str().unwrap_or_default()),
            Format::Term => {
                let parts = self.parts();
                let mut first = true;
                let mut i = 0;
                while i < parts.len() {
                    // adjacent repeats collapse into a power
                    let mut run = 1;
                    while i + run < parts.len() && parts[i + run] == parts[i] {
                        run += 1;
                    }
                    if !first {
                        write!(f, " ✻ ")?;
                    }
                    if run > 1 {
                        write!(f, "{}^{}", parts[i], run)?;
                    } else {
                        write!(f, "{}", parts[i])?;
                    }
                    first = false;
                    i += run;
                }
                Ok(())
            }
        }
    }
}

fn multiset_equal(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    for x in a {
        let mut found = false;
        for (i, y) in b.iter().enumerate() {
            if !used[i] && x == y {
                used[i] = true;
                found = true;
                break;
            }
        }
        if !found {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variable_equality() {
        let a = FormattedValue::variable("a");
        let a2 = FormattedValue::variable("a");
        let b = FormattedValue::variable("b");
        assert!(a.equal_to(&a2));
        assert!(!a.equal_to(&b));
    }

    #[test]
    fn test_term_equality_ignores_order() {
        let ab = FormattedValue::term(vec!["a".into(), "b".into()]);
        let ba = FormattedValue::term(vec!["b".into(), "a".into()]);
        let ac = FormattedValue::term(vec!["a".into(), "c".into()]);
        assert!(ab.equal_to(&ba));
        assert!(!ab.equal_to(&ac));
    }

    #[test]
    fn test_term_equality_is_multiset() {
        let aab = FormattedValue::term(vec!["a".into(), "a".into(), "b".into()]);
        let aba = FormattedValue::term(vec!["a".into(), "b".into(), "a".into()]);
        let abb = FormattedValue::term(vec!["a".into(), "b".into(), "b".into()]);
        assert!(aab.equal_to(&aba));
        assert!(!aab.equal_to(&abb));
    }

    #[test]
    fn test_formats_never_equal_across() {
        let var = FormattedValue::variable("a");
        let term = FormattedValue::term(vec!["a".into()]);
        assert!(!var.equal_to(&term));
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(
            FormattedValue::from_raw(&json!("x")).map(|v| v.format()),
            Some(Format::Variable)
        );
        assert_eq!(
            FormattedValue::from_raw(&json!(["x", "y"])).map(|v| v.format()),
            Some(Format::Term)
        );
        assert!(FormattedValue::from_raw(&json!(3)).is_none());
    }

    #[test]
    fn test_convert_variable_to_term_expands_power() {
        let a = FormattedValue::variable("a");
        let term = a.convert(Format::Term, 3);
        assert_eq!(term.parts(), vec!["a", "a", "a"]);
    }

    #[test]
    fn test_uniform_term_collapses_to_variable() {
        let term = FormattedValue::term(vec!["a".into(), "a".into()]);
        assert_eq!(term.as_uniform_variable(), Some(("a".into(), 2)));

        let mixed = FormattedValue::term(vec!["a".into(), "b".into()]);
        assert_eq!(mixed.as_uniform_variable(), None);
    }

    #[test]
    fn test_display() {
        let var = FormattedValue::variable("a");
        assert_eq!(var.to_string(), "a");

        let term = FormattedValue::term(vec!["a".into(), "b".into()]);
        assert_eq!(term.to_string(), "a ✻ b");

        let squared = FormattedValue::term(vec!["a".into(), "a".into(), "b".into()]);
        assert_eq!(squared.to_string(), "a^2 ✻ b");
    }

    #[test]
    fn test_aria_label() {
        assert_eq!(FormattedValue::variable("a").aria_label(), "a variable");
        assert_eq!(
            FormattedValue::term(vec!["a".into(), "b".into(), "c".into()]).aria_label(),
            "The interaction of a, b and c"
        );
    }
}
