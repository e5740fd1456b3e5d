//! Forward evaluation: substitute variable values into an expression.

use crate::expression::{ExprKind, Expression};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Source of variable values for evaluation.
pub trait Values {
    fn value(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> Values for HashMap<String, String, S> {
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Values for BTreeMap<String, String> {
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl<V: Values + ?Sized> Values for &V {
    fn value(&self, name: &str) -> Option<&str> {
        (**self).value(name)
    }
}

/// Evaluates `expr` against `values`.
///
/// `None` stands for "no value" and is distinct from the empty string; an
/// unknown identifier evaluates to `None` rather than failing.
pub fn evaluate<V: Values + ?Sized>(expr: &Expression, values: &V) -> Option<String> {
    match expr.kind() {
        ExprKind::Text(text) => Some(text.clone()),
        ExprKind::Identifier(name) => values.value(name).map(str::to_string),
        ExprKind::Concat(parts) => Some(
            parts
                .iter()
                .filter_map(|part| evaluate(part, values))
                .collect(),
        ),
        ExprKind::Elvis { main, fallback } => match evaluate(main, values) {
            Some(value) if !value.is_empty() => Some(value),
            _ => evaluate(fallback, values),
        },
        ExprKind::OptPrefix { prefix, main } => match evaluate(main, values) {
            Some(value) if !value.is_empty() => {
                let mut out = evaluate(prefix, values).unwrap_or_default();
                out.push_str(&value);
                Some(out)
            }
            other => other,
        },
        ExprKind::OptSuffix { main, suffix } => match evaluate(main, values) {
            Some(mut value) if !value.is_empty() => {
                value.push_str(&evaluate(suffix, values).unwrap_or_default());
                Some(value)
            }
            other => other,
        },
        ExprKind::Delegate(inner) => evaluate(inner, values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn eval(template: &str, pairs: &[(&str, &str)]) -> Option<String> {
        evaluate(&parse(template).unwrap(), &vars(pairs))
    }

    #[test]
    fn test_text_and_identifiers() {
        assert_eq!(
            eval("${artist} - ${title}", &[("artist", "Nina"), ("title", "Feeling Good")]),
            Some("Nina - Feeling Good".to_string())
        );
    }

    #[test]
    fn test_missing_identifier_is_none() {
        assert_eq!(eval("${nope}", &[]), None);
    }

    #[test]
    fn test_missing_identifier_is_empty_in_concat() {
        assert_eq!(eval("[${nope}]", &[]), Some("[]".to_string()));
    }

    #[test]
    fn test_elvis() {
        assert_eq!(eval("${v?:'default'}", &[]), Some("default".to_string()));
        assert_eq!(eval("${v?:'default'}", &[("v", "")]), Some("default".to_string()));
        assert_eq!(eval("${v?:'default'}", &[("v", "set")]), Some("set".to_string()));
    }

    #[test]
    fn test_optional_prefix() {
        assert_eq!(eval("${'#'+?n}", &[("n", "7")]), Some("#7".to_string()));
        assert_eq!(eval("${'#'+?n}", &[("n", "")]), Some(String::new()));
        assert_eq!(eval("${'#'+?n}", &[]), None);
        // A missing prefix value counts as empty.
        assert_eq!(eval("${(p)+?n}", &[("n", "7")]), Some("7".to_string()));
    }

    #[test]
    fn test_optional_suffix() {
        assert_eq!(eval("${n?+'. '}", &[("n", "7")]), Some("7. ".to_string()));
        assert_eq!(eval("${n?+'. '}", &[("n", "")]), Some(String::new()));
        assert_eq!(eval("${n?+'. '}", &[]), None);
    }

    #[test]
    fn test_delegate_is_transparent() {
        let expr = Expression::delegate(parse("${a}!").unwrap());
        assert_eq!(evaluate(&expr, &vars(&[("a", "hi")])), Some("hi!".to_string()));
    }

    #[test]
    fn test_btreemap_values() {
        let mut values = BTreeMap::new();
        values.insert("x".to_string(), "1".to_string());
        assert_eq!(evaluate(&parse("${x}").unwrap(), &values), Some("1".to_string()));
    }
}
