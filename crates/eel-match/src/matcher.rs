//! The deinterpolation search tree.
//!
//! A [`Match`] is an immutable node that shares its ancestors. Narrowing a
//! match never changes it; it returns a new node pointing back at the old
//! one. Failure is a node too ([`MatchKind::NoMatch`]) and absorbs every
//! further narrowing or concatenation, so one dead branch never aborts the
//! search.

use crate::applied::{Applied, Host};
use crate::binding::{Binding, Bindings, Hints};
use crate::range::{Constraint, RangeFlex, Window};
use crate::score::Score;
use eel_expr::Expression;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug)]
pub enum MatchKind {
    /// The whole target string, unconstrained, with the caller's hints.
    Root {
        host: Arc<Host>,
        hints: Hints,
        range: RangeFlex,
    },
    /// The parent narrowed by one more constraint.
    Partial {
        parent: Match,
        constraint: Constraint,
        range: RangeFlex,
        cause: Option<Expression>,
    },
    /// The parent's range taken as the value of a variable.
    Binding {
        parent: Match,
        name: String,
        cause: Expression,
        range: RangeFlex,
        score: Score,
    },
    /// Two branches placed back to back.
    Concat {
        left: Match,
        right: Match,
        range: RangeFlex,
        score: Score,
    },
    /// The parent with extra hints in scope.
    AddGivenBindings { parent: Match, given: Hints },
    NoMatch { reason: String, causes: Vec<Match> },
}

#[derive(Debug, Clone)]
pub struct Match(Rc<MatchKind>);

impl Match {
    fn new(kind: MatchKind) -> Self {
        Match(Rc::new(kind))
    }

    pub fn root(target: &str, hints: Hints) -> Self {
        let host = Host::new(target);
        let range = RangeFlex::within(host.len());
        Self::new(MatchKind::Root { host, hints, range })
    }

    pub fn no_match(reason: impl Into<String>, causes: Vec<Match>) -> Self {
        Self::new(MatchKind::NoMatch {
            reason: reason.into(),
            causes,
        })
    }

    pub fn kind(&self) -> &MatchKind {
        &self.0
    }

    pub fn is_viable(&self) -> bool {
        !matches!(self.kind(), MatchKind::NoMatch { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self.kind() {
            MatchKind::NoMatch { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn range(&self) -> Option<RangeFlex> {
        match self.kind() {
            MatchKind::Root { range, .. }
            | MatchKind::Partial { range, .. }
            | MatchKind::Binding { range, .. }
            | MatchKind::Concat { range, .. } => Some(*range),
            MatchKind::AddGivenBindings { parent, .. } => parent.range(),
            MatchKind::NoMatch { .. } => None,
        }
    }

    pub fn host(&self) -> Option<&Arc<Host>> {
        let mut node = self;
        loop {
            node = match node.kind() {
                MatchKind::Root { host, .. } => return Some(host),
                MatchKind::Partial { parent, .. }
                | MatchKind::Binding { parent, .. }
                | MatchKind::AddGivenBindings { parent, .. } => parent,
                MatchKind::Concat { left, .. } => left,
                MatchKind::NoMatch { .. } => return None,
            };
        }
    }

    pub fn applied(&self) -> Option<Applied> {
        self.range()?.apply_to(self.host()?).ok()
    }

    /// True if the match covers the whole target string.
    pub fn is_full(&self) -> bool {
        match (self.host(), self.range()) {
            (Some(host), Some(range)) => range == RangeFlex::spanning(host.len()),
            _ => false,
        }
    }

    pub fn score(&self) -> Score {
        match self.kind() {
            MatchKind::Root { .. } => Score::certain(),
            MatchKind::Partial { parent, .. } | MatchKind::AddGivenBindings { parent, .. } => {
                parent.score()
            }
            MatchKind::Binding { score, .. } | MatchKind::Concat { score, .. } => score.clone(),
            MatchKind::NoMatch { reason, .. } => Score::zero(reason.clone()),
        }
    }

    /// The hint in scope for `name`, innermost first.
    pub fn hint(&self, name: &str) -> Option<&Applied> {
        match self.kind() {
            MatchKind::Root { hints, .. } => hints.get(name),
            MatchKind::AddGivenBindings { parent, given } => {
                given.get(name).or_else(|| parent.hint(name))
            }
            MatchKind::Partial { parent, .. } | MatchKind::Binding { parent, .. } => {
                parent.hint(name)
            }
            MatchKind::Concat { left, right, .. } => left.hint(name).or_else(|| right.hint(name)),
            MatchKind::NoMatch { .. } => None,
        }
    }

    /// Every hint in scope.
    pub fn hints(&self) -> Hints {
        match self.kind() {
            MatchKind::Root { hints, .. } => hints.clone(),
            MatchKind::AddGivenBindings { parent, given } => {
                let mut all = parent.hints();
                for (name, range) in given.iter() {
                    all.insert(name.clone(), range.clone());
                }
                all
            }
            MatchKind::Partial { parent, .. } | MatchKind::Binding { parent, .. } => {
                parent.hints()
            }
            MatchKind::Concat { left, right, .. } => {
                let mut all = right.hints();
                let left = left.hints();
                for (name, range) in left.iter() {
                    all.insert(name.clone(), range.clone());
                }
                all
            }
            MatchKind::NoMatch { .. } => Hints::new(),
        }
    }

    pub fn has_bindings(&self) -> bool {
        match self.kind() {
            MatchKind::Binding { .. } => true,
            MatchKind::Concat { left, right, .. } => left.has_bindings() || right.has_bindings(),
            MatchKind::Partial { parent, .. } | MatchKind::AddGivenBindings { parent, .. } => {
                parent.has_bindings()
            }
            MatchKind::Root { .. } | MatchKind::NoMatch { .. } => false,
        }
    }

    /// Every variable bound in this match, in tree order, duplicates kept.
    pub fn bound(&self) -> Vec<Binding> {
        let mut out = Vec::new();
        self.collect_bound(&mut out);
        out
    }

    fn collect_bound(&self, out: &mut Vec<Binding>) {
        match self.kind() {
            MatchKind::Binding { name, range, .. } => {
                if let Some(applied) = self.host().and_then(|host| range.apply_to(host).ok()) {
                    out.push(Binding::new(name.clone(), applied));
                }
            }
            MatchKind::Concat { left, right, .. } => {
                left.collect_bound(out);
                right.collect_bound(out);
            }
            MatchKind::Partial { parent, .. } | MatchKind::AddGivenBindings { parent, .. } => {
                parent.collect_bound(out)
            }
            MatchKind::Root { .. } | MatchKind::NoMatch { .. } => {}
        }
    }

    /// The bound variables as hints for a sibling branch.
    pub fn bound_hints(&self) -> Hints {
        self.bound()
            .into_iter()
            .map(|b| (b.name().to_string(), b.range().clone()))
            .collect()
    }

    pub fn add_given(&self, given: Hints) -> Match {
        if !self.is_viable() || given.is_empty() {
            return self.clone();
        }
        Match::new(MatchKind::AddGivenBindings {
            parent: self.clone(),
            given,
        })
    }

    pub fn constrain(&self, constraint: Constraint) -> Match {
        self.constrain_by(constraint, None)
    }

    /// Narrows the match, recording the expression that asked for it.
    ///
    /// A binding pushes the constraint into its parent and is re-scored. A
    /// concatenation hands its start window to the left side, its end window
    /// to the right side and its maximum length to both; a minimum length
    /// stays on the combined range.
    pub fn constrain_by(&self, constraint: Constraint, cause: Option<&Expression>) -> Match {
        match self.kind() {
            MatchKind::NoMatch { .. } => self.clone(),
            MatchKind::Root { range, .. } | MatchKind::Partial { range, .. } => {
                self.narrow(*range, constraint, cause)
            }
            MatchKind::AddGivenBindings { parent, .. } => match parent.range() {
                Some(range) => self.narrow(range, constraint, cause),
                None => parent.clone(),
            },
            MatchKind::Binding {
                parent,
                name,
                cause: bound,
                ..
            } => Match::bind_over(&parent.constrain_by(constraint, cause), name, bound),
            MatchKind::Concat {
                left, right, range, ..
            } => {
                let Some(bound) = range.constrain(&constraint) else {
                    return Match::no_match(
                        format!("concatenation {range} cannot be narrowed {constraint}"),
                        vec![self.clone()],
                    );
                };
                if bound == *range {
                    return self.clone();
                }
                let sides = Window::new(bound.start().min(), bound.end().max()).and_then(|span| {
                    Some((
                        RangeFlex::with_lengths(bound.start(), span, 0, bound.max_len())?,
                        RangeFlex::with_lengths(span, bound.end(), 0, bound.max_len())?,
                    ))
                });
                let Some((left_bound, right_bound)) = sides else {
                    return Match::no_match(
                        format!("concatenation {range} cannot be split {constraint}"),
                        vec![self.clone()],
                    );
                };
                let left = left.constrain_by(Constraint::ToRange(left_bound), cause);
                let right = right.constrain_by(Constraint::ToRange(right_bound), cause);
                Match::join(&left, &right, Some(bound))
            }
        }
    }

    fn narrow(&self, range: RangeFlex, constraint: Constraint, cause: Option<&Expression>) -> Match {
        match range.constrain(&constraint) {
            Some(narrowed) if narrowed == range => self.clone(),
            Some(narrowed) => Match::new(MatchKind::Partial {
                parent: self.clone(),
                constraint,
                range: narrowed,
                cause: cause.cloned(),
            }),
            None => Match::no_match(
                format!("{range} cannot be narrowed {constraint}"),
                vec![self.clone()],
            ),
        }
    }

    /// Takes the current range as the value of `name`.
    pub fn bind(&self, name: &str, cause: &Expression) -> Match {
        Match::bind_over(self, name, cause)
    }

    fn bind_over(parent: &Match, name: &str, cause: &Expression) -> Match {
        let Some(range) = parent.range() else {
            return parent.clone();
        };
        let factor = match (parent.hint(name), parent.applied()) {
            (Some(hint), Some(current)) => Score::against_hint(&current, hint),
            _ => Score::certain(),
        };
        Match::new(MatchKind::Binding {
            parent: parent.clone(),
            name: name.to_string(),
            cause: cause.clone(),
            range,
            score: parent.score().times(&factor),
        })
    }

    /// Places `left` immediately before `right`.
    pub fn concat(left: &Match, right: &Match) -> Match {
        Match::join(left, right, None)
    }

    fn join(left: &Match, right: &Match, bound: Option<RangeFlex>) -> Match {
        let (Some(left_range), Some(right_range)) = (left.range(), right.range()) else {
            let failed = [left, right]
                .into_iter()
                .filter(|m| !m.is_viable())
                .cloned()
                .collect();
            return Match::no_match("cannot concatenate a failed match", failed);
        };
        let Some(cat) = left_range.concatenate(&right_range) else {
            return Match::no_match(
                format!("{left_range} cannot be followed by {right_range}"),
                vec![left.clone(), right.clone()],
            );
        };
        let left = left.constrain(Constraint::ToRange(cat.left));
        let right = right.constrain(Constraint::ToRange(cat.right));
        let combined = match (left.range(), right.range()) {
            (Some(l), Some(r)) => l.concatenate(&r).and_then(|cat| match bound {
                Some(bound) => cat.combined.constrain(&Constraint::ToRange(bound)),
                None => Some(cat.combined),
            }),
            _ => None,
        };
        let Some(range) = combined else {
            return Match::no_match(
                format!("{left_range} and {right_range} have no common placement"),
                vec![left, right],
            );
        };
        if let Some(name) = conflicting_variable(&left, &right) {
            return Match::no_match(
                format!("conflicting values for '{name}'"),
                vec![left, right],
            );
        }
        let score = left.score().times(&right.score());
        Match::new(MatchKind::Concat {
            left,
            right,
            range,
            score,
        })
    }

    /// Enumerates the concrete placements of this match.
    ///
    /// The result holds fixed matches only. Every boundary a concatenation
    /// could still sit at is tried, leftmost first; other flexible ranges
    /// collapse to their widest placement.
    pub fn resolve(&self) -> Vec<Match> {
        let Some(range) = self.range() else {
            return Vec::new();
        };
        if !range.is_fixed() {
            let fixed = self.constrain(Constraint::ToFixedRange);
            return match fixed.range() {
                Some(r) if r.is_fixed() => fixed.resolve(),
                _ => Vec::new(),
            };
        }
        let MatchKind::Concat { left, right, .. } = self.kind() else {
            return vec![self.clone()];
        };
        let (Some(left_range), Some(right_range)) = (left.range(), right.range()) else {
            return Vec::new();
        };
        let Some(boundary) = left_range.end().intersect(&right_range.start()) else {
            return Vec::new();
        };
        let (start, end) = range.maximal();
        let mut out = Vec::new();
        for at in boundary.offsets().filter(|at| (start..=end).contains(at)) {
            let left = left.constrain(Constraint::ToRange(RangeFlex::fixed(start, at - start)));
            let right = right.constrain(Constraint::ToRange(RangeFlex::fixed(at, end - at)));
            if !left.is_viable() || !right.is_viable() {
                continue;
            }
            let rights = right.resolve();
            for l in left.resolve() {
                for r in &rights {
                    let joined = Match::join(&l, r, Some(range));
                    if joined.is_viable() {
                        out.push(joined);
                    }
                }
            }
        }
        out
    }

    /// Every consistent assignment of values to the variables bound here.
    pub fn bindings(&self) -> Vec<Bindings> {
        match self.kind() {
            MatchKind::Root { .. } => vec![Bindings::new()],
            MatchKind::Partial { parent, .. } | MatchKind::AddGivenBindings { parent, .. } => {
                parent.bindings()
            }
            MatchKind::Binding {
                parent, name, range, ..
            } => {
                let Some(applied) = self.host().and_then(|host| range.apply_to(host).ok()) else {
                    return Vec::new();
                };
                parent
                    .bindings()
                    .into_iter()
                    .filter_map(|b| b.with(Binding::new(name.clone(), applied.clone())))
                    .collect()
            }
            MatchKind::Concat { left, right, .. } => {
                let rights = right.bindings();
                left.bindings()
                    .iter()
                    .flat_map(|l| rights.iter().filter_map(move |r| l.merge(r)))
                    .collect()
            }
            MatchKind::NoMatch { .. } => Vec::new(),
        }
    }

    pub fn representation(&self) -> Option<String> {
        self.applied().map(|applied| applied.to_string())
    }
}

fn conflicting_variable(left: &Match, right: &Match) -> Option<String> {
    let right_bound = right.bound();
    left.bound()
        .into_iter()
        .find(|l| {
            right_bound.iter().any(|r| {
                r.name() == l.name()
                    && matches!(
                        (l.range().text(), r.range().text()),
                        (Some(a), Some(b)) if a != b
                    )
            })
        })
        .map(|b| b.name().to_string())
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind(), self.applied()) {
            (MatchKind::NoMatch { reason, .. }, _) => write!(f, "no match: {reason}"),
            (_, Some(applied)) => write!(f, "{applied} score {}", self.score()),
            (_, None) => write!(f, "<detached match>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expression {
        Expression::identifier(name)
    }

    fn at(m: &Match, start: usize, len: usize) -> Match {
        m.constrain(Constraint::ToRange(RangeFlex::fixed(start, len)))
    }

    #[test]
    fn test_root_is_not_full() {
        let root = Match::root("abc", Hints::new());
        assert!(root.is_viable());
        assert!(!root.is_full());
        assert!(!root.has_bindings());
        assert_eq!(root.score().value(), 1.0);
        assert_eq!(root.bindings(), vec![Bindings::new()]);
    }

    #[test]
    fn test_constrain_wraps_partial() {
        let root = Match::root("abc", Hints::new());
        let m = at(&root, 0, 3);
        assert!(matches!(m.kind(), MatchKind::Partial { .. }));
        assert!(m.is_full());
        assert_eq!(m.representation().as_deref(), Some("[abc]"));
    }

    #[test]
    fn test_no_match_absorbs() {
        let root = Match::root("abc", Hints::new());
        let dead = root.constrain(Constraint::ToMinLength(4));
        assert!(!dead.is_viable());
        assert_eq!(dead.score().value(), 0.0);
        let still_dead = dead.constrain(Constraint::ToMaxLength(1));
        assert!(!still_dead.is_viable());
        assert!(!Match::concat(&root, &dead).is_viable());
    }

    #[test]
    fn test_binding_scored_against_hint() {
        let hints = Hints::from_values([("v", "other")]);
        let root = Match::root("value", hints);
        let whole = at(&root, 0, 5).bind("v", &ident("v"));
        assert_eq!(whole.score().value(), 0.2);

        let hints = Hints::from_values([("v", "value")]);
        let root = Match::root("value", hints);
        let flexible = root.bind("v", &ident("v"));
        assert_eq!(flexible.score().value(), 0.9);
        // Narrowing re-scores against the hint.
        assert_eq!(at(&flexible, 0, 5).score().value(), 1.0);
    }

    #[test]
    fn test_add_given_overrides_root_hints() {
        let root = Match::root("x", Hints::from_values([("v", "root")]));
        let scoped = root.add_given(Hints::from_values([("v", "given")]));
        assert_eq!(scoped.hint("v").and_then(Applied::text).as_deref(), Some("given"));
        assert_eq!(root.hint("v").and_then(Applied::text).as_deref(), Some("root"));
        assert_eq!(scoped.hints().len(), 1);
    }

    #[test]
    fn test_concat_propagates_boundaries() {
        let root = Match::root("foo-bar", Hints::new());
        let a = root.bind("a", &ident("a"));
        let dash = at(&root, 3, 1);
        let b = root.bind("b", &ident("b"));
        let joined = Match::concat(&Match::concat(&a, &dash), &b);
        assert!(joined.is_viable());
        assert!(!joined.is_full());

        let full = joined.constrain(Constraint::ToRange(RangeFlex::spanning(7)));
        assert!(full.is_full());
        let bindings = full.bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].value("a").as_deref(), Some("foo"));
        assert_eq!(bindings[0].value("b").as_deref(), Some("bar"));
    }

    #[test]
    fn test_concat_rejects_gap() {
        let root = Match::root("abcd", Hints::new());
        assert!(!Match::concat(&at(&root, 0, 1), &at(&root, 2, 1)).is_viable());
        assert!(Match::concat(&at(&root, 0, 1), &at(&root, 1, 1)).is_viable());
    }

    #[test]
    fn test_concat_rejects_conflicting_values() {
        let root = Match::root("xy", Hints::new());
        let first = at(&root, 0, 1).bind("a", &ident("a"));
        let second = at(&root, 1, 1).bind("a", &ident("a"));
        let joined = Match::concat(&first, &second);
        assert!(!joined.is_viable());
        assert_eq!(joined.reason(), Some("conflicting values for 'a'"));
    }

    #[test]
    fn test_min_length_stays_on_combined_range() {
        let root = Match::root("ab", Hints::new());
        let a = root.bind("a", &ident("a"));
        let b = root.bind("b", &ident("b"));
        let joined = Match::concat(&a, &b).constrain(Constraint::ToMinLength(2));
        assert_eq!(joined.range().map(|r| r.min_len()), Some(2));
        let full = joined.resolve();
        assert_eq!(full.len(), 3);
    }

    #[test]
    fn test_resolve_enumerates_boundaries() {
        let root = Match::root("ab", Hints::new());
        let joined = Match::concat(&root.bind("a", &ident("a")), &root.bind("b", &ident("b")))
            .constrain(Constraint::ToRange(RangeFlex::spanning(2)));
        let splits: Vec<(String, String)> = joined
            .resolve()
            .iter()
            .flat_map(Match::bindings)
            .map(|b| (b.value("a").unwrap(), b.value("b").unwrap()))
            .collect();
        assert_eq!(
            splits,
            vec![
                (String::new(), "ab".to_string()),
                ("a".to_string(), "b".to_string()),
                ("ab".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_resolve_collapses_flexible_binding() {
        let root = Match::root("abc", Hints::new());
        let resolved = root.bind("v", &ident("v")).resolve();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].is_full());
        assert_eq!(resolved[0].bindings()[0].value("v").as_deref(), Some("abc"));
    }
}
