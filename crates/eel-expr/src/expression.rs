//! Expression tree produced by the parser.
//!
//! Nodes are immutable and shared through [`Arc`], so an expression parsed
//! once can be evaluated or deinterpolated any number of times, from any
//! thread. Equality (`==`) is structural; [`Expression::same`] compares node
//! identity, which is what binding bookkeeping relies on.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    /// Fixed text fragment.
    Text(String),
    /// Reference to a named variable.
    Identifier(String),
    /// Sequential composition; no parts is the empty expression.
    Concat(Vec<Expression>),
    /// `main` if it is non-empty, otherwise `fallback`.
    Elvis { main: Expression, fallback: Expression },
    /// `prefix` is included only if `main` is non-empty.
    OptPrefix { prefix: Expression, main: Expression },
    /// `suffix` is included only if `main` is non-empty.
    OptSuffix { main: Expression, suffix: Expression },
    /// Transparent wrapper giving a whole expression its own identity.
    Delegate(Expression),
}

#[derive(Clone, PartialEq)]
pub struct Expression(Arc<ExprKind>);

impl Expression {
    pub fn new(kind: ExprKind) -> Self {
        Self(Arc::new(kind))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ExprKind::Text(text.into()))
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Identifier(name.into()))
    }

    pub fn concat(parts: Vec<Expression>) -> Self {
        Self::new(ExprKind::Concat(parts))
    }

    pub fn empty() -> Self {
        Self::concat(Vec::new())
    }

    pub fn elvis(main: Expression, fallback: Expression) -> Self {
        Self::new(ExprKind::Elvis { main, fallback })
    }

    pub fn opt_prefix(prefix: Expression, main: Expression) -> Self {
        Self::new(ExprKind::OptPrefix { prefix, main })
    }

    pub fn opt_suffix(main: Expression, suffix: Expression) -> Self {
        Self::new(ExprKind::OptSuffix { main, suffix })
    }

    pub fn delegate(inner: Expression) -> Self {
        Self::new(ExprKind::Delegate(inner))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0
    }

    /// True if both handles point at the very same node.
    pub fn same(&self, other: &Expression) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Names of every identifier referenced anywhere in the tree.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers(&self, names: &mut BTreeSet<String>) {
        match self.kind() {
            ExprKind::Text(_) => {}
            ExprKind::Identifier(name) => {
                names.insert(name.clone());
            }
            ExprKind::Concat(parts) => {
                for part in parts {
                    part.collect_identifiers(names);
                }
            }
            ExprKind::Elvis { main, fallback } => {
                main.collect_identifiers(names);
                fallback.collect_identifiers(names);
            }
            ExprKind::OptPrefix { prefix, main } => {
                prefix.collect_identifiers(names);
                main.collect_identifiers(names);
            }
            ExprKind::OptSuffix { main, suffix } => {
                main.collect_identifiers(names);
                suffix.collect_identifiers(names);
            }
            ExprKind::Delegate(inner) => inner.collect_identifiers(names),
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.kind(), f)
    }
}

// ============ Canonical rendering ============

/// Renders the expression back into template syntax.
///
/// Parsing the output yields a structurally equal tree for anything the
/// parser can produce. `Delegate` wrappers are not part of the syntax and
/// render as their inner expression.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match unwrap_delegates(self).kind() {
            ExprKind::Concat(parts) => {
                let mut after_text = false;
                for part in parts {
                    after_text = write_template_part(f, part, after_text)?;
                }
                Ok(())
            }
            _ => write_template_part(f, self, false).map(|_| ()),
        }
    }
}

/// Writes one fragment in literal context; returns whether it was written
/// as bare text, so that a following text fragment is not merged into it.
fn write_template_part(
    f: &mut fmt::Formatter<'_>,
    expr: &Expression,
    after_text: bool,
) -> Result<bool, fmt::Error> {
    match expr.kind() {
        ExprKind::Text(text) if !after_text && !text.is_empty() && !text.contains("${") => {
            f.write_str(text)?;
            Ok(true)
        }
        ExprKind::Delegate(inner) => write_template_part(f, inner, after_text),
        _ => {
            f.write_str("${")?;
            write_inner(f, expr)?;
            f.write_str("}")?;
            Ok(false)
        }
    }
}

fn write_inner(f: &mut fmt::Formatter<'_>, expr: &Expression) -> fmt::Result {
    match expr.kind() {
        ExprKind::Concat(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write_operand(f, part)?;
            }
            Ok(())
        }
        _ => write_operand(f, expr),
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expression) -> fmt::Result {
    match expr.kind() {
        ExprKind::Text(text) => write_quoted(f, text),
        ExprKind::Identifier(name) => f.write_str(name),
        ExprKind::Concat(_) => {
            f.write_str("(")?;
            write_inner(f, expr)?;
            f.write_str(")")
        }
        ExprKind::Elvis { main, fallback } => write_infix(f, main, "?:", fallback),
        ExprKind::OptPrefix { prefix, main } => write_infix(f, prefix, "+?", main),
        ExprKind::OptSuffix { main, suffix } => write_infix(f, main, "?+", suffix),
        ExprKind::Delegate(inner) => write_operand(f, inner),
    }
}

fn write_infix(
    f: &mut fmt::Formatter<'_>,
    left: &Expression,
    op: &str,
    right: &Expression,
) -> fmt::Result {
    write_nested(f, left)?;
    f.write_str(op)?;
    write_nested(f, right)
}

fn write_nested(f: &mut fmt::Formatter<'_>, expr: &Expression) -> fmt::Result {
    match unwrap_delegates(expr).kind() {
        ExprKind::Elvis { .. } | ExprKind::OptPrefix { .. } | ExprKind::OptSuffix { .. } => {
            f.write_str("(")?;
            write_operand(f, expr)?;
            f.write_str(")")
        }
        _ => write_operand(f, expr),
    }
}

fn unwrap_delegates(expr: &Expression) -> &Expression {
    match expr.kind() {
        ExprKind::Delegate(inner) => unwrap_delegates(inner),
        _ => expr,
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    write!(f, "{quote}{text}{quote}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality_vs_identity() {
        let a = Expression::identifier("name");
        let b = Expression::identifier("name");
        assert_eq!(a, b);
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
    }

    #[test]
    fn test_identifiers_are_collected_from_every_branch() {
        let expr = Expression::concat(vec![
            Expression::elvis(Expression::identifier("a"), Expression::text("x")),
            Expression::opt_prefix(Expression::identifier("b"), Expression::identifier("c")),
            Expression::delegate(Expression::opt_suffix(
                Expression::identifier("a"),
                Expression::identifier("d"),
            )),
        ]);
        let names: Vec<_> = expr.identifiers().into_iter().collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_display_plain_template() {
        let expr = Expression::concat(vec![
            Expression::text("Hello "),
            Expression::identifier("name"),
            Expression::text("!"),
        ]);
        assert_eq!(expr.to_string(), "Hello ${name}!");
    }

    #[test]
    fn test_display_operators() {
        let expr = Expression::elvis(
            Expression::opt_suffix(Expression::identifier("title"), Expression::text(". ")),
            Expression::text("Untitled"),
        );
        assert_eq!(expr.to_string(), "${(title?+'. ')?:'Untitled'}");
    }

    #[test]
    fn test_display_quotes_text_that_would_merge_or_interpolate() {
        let expr = Expression::concat(vec![
            Expression::text("a"),
            Expression::text("b"),
            Expression::text("${x}"),
        ]);
        assert_eq!(expr.to_string(), "a${'b'}${'${x}'}");
    }

    #[test]
    fn test_display_picks_other_quote() {
        let expr = Expression::elvis(Expression::identifier("n"), Expression::text("it's"));
        assert_eq!(expr.to_string(), "${n?:\"it's\"}");
    }

    #[test]
    fn test_display_ignores_delegates() {
        let expr = Expression::delegate(Expression::concat(vec![
            Expression::identifier("a"),
            Expression::text(" - "),
            Expression::identifier("b"),
        ]));
        assert_eq!(expr.to_string(), "${a} - ${b}");
    }
}
