//! Deinterpolation: recover variable values from an evaluated string.

use crate::binding::{Bindings, Hints};
use crate::matcher::Match;
use crate::range::{Constraint, RangeFlex};
use eel_expr::{ExprKind, Expression};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, trace};

/// Score thresholds tried in turn until one yields a result.
pub const DEFAULT_THRESHOLDS: [f64; 3] = [0.4, 0.2, 0.1];

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub thresholds: Vec<f64>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

#[derive(Clone, Copy)]
enum Side {
    Prefix,
    Suffix,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Matches `expr` anywhere in `target`.
    ///
    /// Returns the viable candidates scoring at least `min_score`, which need
    /// not cover the whole target, or a single `NoMatch` explaining why there
    /// are none.
    pub fn matches(&self, expr: &Expression, target: &str, hints: &Hints, min_score: f64) -> Vec<Match> {
        let root = Match::root(target, hints.clone());
        self.match_expr(expr, &root, min_score)
    }

    /// Every assignment of values under which `expr` evaluates to `target`,
    /// best first.
    ///
    /// The thresholds of the config are tried in order; the first one that
    /// lets any full match through decides the result.
    pub fn find_bindings(&self, expr: &Expression, target: &str, hints: &Hints) -> Vec<Bindings> {
        let whole = RangeFlex::spanning(target.chars().count());
        for &threshold in &self.config.thresholds {
            let accepted: Vec<Match> = self
                .matches(expr, target, hints, threshold)
                .iter()
                .filter(|m| m.is_viable())
                .map(|m| m.constrain(Constraint::ToRange(whole)))
                .filter(Match::is_viable)
                .flat_map(|m| m.resolve())
                .filter(|m| m.score().value() >= threshold)
                .collect();
            if accepted.is_empty() {
                debug!(threshold, input = target, "no match at this score, relaxing");
                continue;
            }
            debug!(threshold, candidates = accepted.len(), "accepted matches");
            return rank(accepted);
        }
        Vec::new()
    }

    fn match_expr(&self, expr: &Expression, parent: &Match, min_score: f64) -> Vec<Match> {
        let candidates = match expr.kind() {
            ExprKind::Text(text) => self.match_text(expr, text, parent),
            ExprKind::Identifier(name) => {
                vec![parent.constrain(Constraint::ToMinLength(0)).bind(name, expr)]
            }
            ExprKind::Concat(parts) => self.match_concat(parts, parent, min_score),
            ExprKind::Elvis { main, fallback } => self.match_elvis(main, fallback, parent, min_score),
            ExprKind::OptPrefix { prefix, main } => {
                self.match_optional(main, prefix, Side::Prefix, parent, min_score)
            }
            ExprKind::OptSuffix { main, suffix } => {
                self.match_optional(main, suffix, Side::Suffix, parent, min_score)
            }
            ExprKind::Delegate(inner) => return self.match_expr(inner, parent, min_score),
        };
        settle(candidates, min_score, expr)
    }

    fn match_text(&self, expr: &Expression, text: &str, parent: &Match) -> Vec<Match> {
        if text.is_empty() {
            return vec![parent.constrain_by(Constraint::ToMaxLength(0), Some(expr))];
        }
        let Some(host) = parent.host() else {
            return vec![parent.clone()];
        };
        let len = text.chars().count();
        let found = host.occurrences(text);
        if found.is_empty() {
            return vec![Match::no_match(
                format!("{text:?} does not occur in {:?}", host.text()),
                Vec::new(),
            )];
        }
        found
            .into_iter()
            .map(|start| {
                parent.constrain_by(Constraint::ToRange(RangeFlex::fixed(start, len)), Some(expr))
            })
            .collect()
    }

    fn match_concat(&self, parts: &[Expression], parent: &Match, min_score: f64) -> Vec<Match> {
        let Some((first, rest)) = parts.split_first() else {
            return vec![parent.constrain(Constraint::ToMaxLength(0))];
        };
        let mut acc = self.match_expr(first, parent, min_score);
        for (i, part) in rest.iter().enumerate() {
            if !acc.iter().any(Match::is_viable) {
                break;
            }
            let next = self.match_expr(part, parent, min_score);
            let combined = pairs(&acc, &next, Match::concat);
            acc = settle(combined, min_score, format_args!("first {} parts", i + 2));
        }
        acc
    }

    fn match_elvis(
        &self,
        main: &Expression,
        fallback: &Expression,
        parent: &Match,
        min_score: f64,
    ) -> Vec<Match> {
        let mains = self.match_expr(main, parent, min_score);
        if !mains.iter().any(Match::is_viable) {
            return mains;
        }
        let mut took = Vec::new();
        let mut empty = Vec::new();
        let mut plain_fallbacks: Option<Vec<Match>> = None;
        for m in mains.iter().filter(|m| m.is_viable()) {
            took.push(m.constrain(Constraint::ToMinLength(1)));
            let nothing = m.constrain(Constraint::ToMaxLength(0));
            if !nothing.is_viable() {
                continue;
            }
            let given = nothing.bound_hints();
            let fallbacks = if given.is_empty() {
                plain_fallbacks
                    .get_or_insert_with(|| self.match_expr(fallback, parent, min_score))
                    .clone()
            } else {
                self.match_expr(fallback, &parent.add_given(given), min_score)
            };
            empty.extend(
                fallbacks
                    .iter()
                    .filter(|f| f.is_viable())
                    .map(|f| Match::concat(&nothing, f)),
            );
        }
        took.extend(empty);
        took
    }

    fn match_optional(
        &self,
        main: &Expression,
        side: &Expression,
        which: Side,
        parent: &Match,
        min_score: f64,
    ) -> Vec<Match> {
        let mains = self.match_expr(main, parent, min_score);
        if !mains.iter().any(Match::is_viable) {
            return mains;
        }
        let sides = self.match_expr(side, parent, min_score);
        let mut present = Vec::new();
        let mut absent = Vec::new();
        for m in mains.iter().filter(|m| m.is_viable()) {
            let some = m.constrain(Constraint::ToMinLength(1));
            if some.is_viable() {
                present.extend(sides.iter().filter(|s| s.is_viable()).map(|s| match which {
                    Side::Prefix => Match::concat(s, &some),
                    Side::Suffix => Match::concat(&some, s),
                }));
            }
            let nothing = m.constrain(Constraint::ToMaxLength(0));
            if nothing.is_viable() {
                absent.push(nothing);
            }
        }
        present.extend(absent);
        present
    }
}

/// Convenience for [`Analyzer::find_bindings`] with the default cascade.
pub fn find_bindings(expr: &Expression, target: &str, hints: &Hints) -> Vec<Bindings> {
    Analyzer::default().find_bindings(expr, target, hints)
}

fn pairs(lefts: &[Match], rights: &[Match], join: impl Fn(&Match, &Match) -> Match) -> Vec<Match> {
    lefts
        .iter()
        .filter(|l| l.is_viable())
        .flat_map(|l| {
            rights
                .iter()
                .filter(|r| r.is_viable())
                .map(|r| join(l, r))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Keeps the viable candidates scoring at least `min_score`, or a single
/// `NoMatch` listing what was dropped.
fn settle(candidates: Vec<Match>, min_score: f64, what: impl fmt::Display) -> Vec<Match> {
    let total = candidates.len();
    let (kept, dropped): (Vec<Match>, Vec<Match>) = candidates
        .into_iter()
        .partition(|m| m.is_viable() && m.score().value() >= min_score);
    trace!(%what, total, kept = kept.len(), "settled candidates");
    if !kept.is_empty() {
        return kept;
    }
    let reason = if dropped.iter().any(Match::is_viable) {
        format!("{what} scores below {min_score}")
    } else {
        format!("{what} does not match")
    };
    vec![Match::no_match(reason, dropped)]
}

fn rank(matches: Vec<Match>) -> Vec<Bindings> {
    let mut out: Vec<Bindings> = Vec::new();
    let mut seen: HashMap<BTreeMap<String, String>, usize> = HashMap::new();
    for m in matches {
        let score = m.score();
        for bindings in m.bindings() {
            let bindings = bindings.with_score(score.clone());
            match seen.entry(bindings.values()) {
                Entry::Occupied(slot) => {
                    let existing = &mut out[*slot.get()];
                    if existing.score().value() < score.value() {
                        *existing = bindings;
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(out.len());
                    out.push(bindings);
                }
            }
        }
    }
    out.sort_by(|a, b| b.score().value().total_cmp(&a.score().value()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchKind;
    use eel_expr::parse;

    fn text(t: &str) -> Expression {
        Expression::text(t)
    }

    fn ident(name: &str) -> Expression {
        Expression::identifier(name)
    }

    fn matches(expr: &Expression, target: &str) -> Vec<Match> {
        Analyzer::default().matches(expr, target, &Hints::new(), 0.0)
    }

    fn values(bindings: &[Bindings]) -> Vec<Vec<(String, String)>> {
        bindings
            .iter()
            .map(|b| b.values().into_iter().collect())
            .collect()
    }

    fn pair(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn test_text_empty_pattern() {
        let found = matches(&text(""), "abc");
        assert_eq!(found.len(), 1);
        assert!(found[0].is_viable());
        assert!(!found[0].is_full());
        assert!(!found[0].has_bindings());
        assert_eq!(found[0].representation().as_deref(), Some("[](abc)"));

        let found = matches(&text(""), "");
        assert!(found[0].is_full());
        assert_eq!(found[0].representation().as_deref(), Some("[]"));
    }

    #[test]
    fn test_text_full_match() {
        let found = matches(&text("my literal value"), "my literal value");
        assert_eq!(found.len(), 1);
        assert!(found[0].is_full());
        assert_eq!(found[0].range(), Some(RangeFlex::spanning(16)));
    }

    #[test]
    fn test_text_no_match() {
        let found = matches(&text("my literal value"), "my other value");
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0].kind(), MatchKind::NoMatch { .. }));
        assert!(find_bindings(&text("my literal value"), "my other value", &Hints::new()).is_empty());
    }

    #[test]
    fn test_text_repeated_pattern() {
        let found = matches(&text("mymy"), "mymymymy");
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|m| !m.is_full()));
        let starts: Vec<usize> = found
            .iter()
            .map(|m| m.range().unwrap().start().min())
            .collect();
        assert_eq!(starts, vec![0, 2, 4]);
    }

    #[test]
    fn test_identifier_with_conflicting_hint() {
        let hints = Hints::from_values([("testVar", "my original value")]);
        let found = Analyzer::default().matches(&ident("testVar"), "my test value", &hints, 0.0);
        assert_eq!(found.len(), 1);
        let full = found[0].constrain(Constraint::ToRange(RangeFlex::spanning(13)));
        assert!(full.is_full());
        assert_eq!(full.bindings()[0].value("testVar").as_deref(), Some("my test value"));
        assert!(full.score().value() < 0.3);

        let found = find_bindings(&ident("testVar"), "my test value", &hints);
        assert_eq!(values(&found), vec![vec![pair("testVar", "my test value")]]);
        assert!(found[0].score().value() < 0.3);
    }

    #[test]
    fn test_opt_prefix_suppressed_when_main_empty() {
        let expr = Expression::opt_prefix(text("a prefix and "), text(""));
        let found = matches(&expr, "something else and ");
        assert_eq!(found.len(), 1);
        assert!(found[0].is_viable());
        assert!(!found[0].is_full());
        assert!(!found[0].has_bindings());
        assert_eq!(found[0].representation().as_deref(), Some("[](something else and )"));
    }

    #[test]
    fn test_elvis_empty_main_and_fallback() {
        let expr = Expression::elvis(ident("v"), text("default"));
        let found = find_bindings(&expr, "default", &Hints::new());
        let found = values(&found);
        assert!(found.len() >= 2);
        assert!(found.contains(&vec![pair("v", "default")]));
        assert!(found.contains(&vec![pair("v", "")]));
        // The branch where main took the value comes first.
        assert_eq!(found[0], vec![pair("v", "default")]);
    }

    #[test]
    fn test_concat_is_adjacent() {
        let expr = Expression::concat(vec![ident("a"), text("-"), ident("b")]);
        let found = find_bindings(&expr, "foo-bar", &Hints::new());
        assert_eq!(values(&found), vec![vec![pair("a", "foo"), pair("b", "bar")]]);
        assert_eq!(found[0].score().value(), 1.0);
        assert_eq!(found[0].get("a").unwrap().representation(), "[foo]-bar");
    }

    #[test]
    fn test_empty_concat() {
        assert_eq!(values(&find_bindings(&Expression::empty(), "", &Hints::new())), vec![vec![]]);
        assert!(find_bindings(&Expression::empty(), "x", &Hints::new()).is_empty());
    }

    #[test]
    fn test_ambiguous_split_lists_every_alternative() {
        let expr = parse("${a}${b}").unwrap();
        let found = find_bindings(&expr, "xy", &Hints::new());
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_hints_pick_the_agreeing_split() {
        let expr = parse("${a} ${b}").unwrap();
        assert_eq!(find_bindings(&expr, "New York City", &Hints::new()).len(), 2);

        let hints = Hints::from_values([("a", "New York")]);
        let found = find_bindings(&expr, "New York City", &hints);
        assert_eq!(values(&found), vec![vec![pair("a", "New York"), pair("b", "City")]]);
        assert_eq!(found[0].score().value(), 1.0);
    }

    #[test]
    fn test_relaxed_threshold_keeps_weaker_splits() {
        let expr = parse("${a} ${b}").unwrap();
        let hints = Hints::from_values([("a", "New York")]);
        let lenient = Analyzer::new(AnalyzerConfig {
            thresholds: vec![0.1],
        });
        let found = lenient.find_bindings(&expr, "New York City", &hints);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].value("a").as_deref(), Some("New York"));
        assert_eq!(found[1].value("a").as_deref(), Some("New"));
        assert!(found[1].score().value() < 0.3);
    }

    #[test]
    fn test_optional_suffix() {
        let expr = parse("${track?+'. '}${title}").unwrap();
        let found = find_bindings(&expr, "7. Feeling Good", &Hints::new());
        let found = values(&found);
        assert!(found.contains(&vec![pair("title", "Feeling Good"), pair("track", "7")]));
        assert!(found.contains(&vec![pair("title", "7. Feeling Good"), pair("track", "")]));
    }

    #[test]
    fn test_optional_prefix_requires_prefix() {
        let expr = parse("${('#')+?n}").unwrap();
        let found = values(&find_bindings(&expr, "#7", &Hints::new()));
        assert_eq!(found, vec![vec![pair("n", "7")]]);
        assert!(find_bindings(&expr, "7", &Hints::new()).is_empty());
        assert_eq!(values(&find_bindings(&expr, "", &Hints::new())), vec![vec![pair("n", "")]]);
    }

    #[test]
    fn test_repeated_variable_must_agree() {
        let expr = parse("${a}/${a}").unwrap();
        let found = values(&find_bindings(&expr, "x/x", &Hints::new()));
        assert_eq!(found, vec![vec![pair("a", "x")]]);
        assert!(find_bindings(&expr, "x/y", &Hints::new()).is_empty());
    }

    #[test]
    fn test_cascade_can_be_narrowed() {
        let hints = Hints::from_values([("v", "something else")]);
        let strict = Analyzer::new(AnalyzerConfig {
            thresholds: vec![0.5],
        });
        assert!(strict.find_bindings(&ident("v"), "value", &hints).is_empty());
        assert_eq!(Analyzer::default().find_bindings(&ident("v"), "value", &hints).len(), 1);
    }

    #[test]
    fn test_ranking_many_splits_is_fast() {
        let expr = parse("${a}${b}${c}${d}").unwrap();
        let started = std::time::Instant::now();
        let found = find_bindings(&expr, "abcdefghijklmnopqrstuvwxyz", &Hints::new());
        let elapsed = started.elapsed();
        // Every way to cut 26 chars into four possibly empty parts, once.
        assert_eq!(found.len(), 3654);
        let distinct: std::collections::HashSet<_> = found.iter().map(Bindings::values).collect();
        assert_eq!(distinct.len(), found.len());
        assert!(elapsed < std::time::Duration::from_secs(3), "ranking took {elapsed:?}");
    }

    #[test]
    fn test_delegate_is_transparent() {
        let expr = Expression::delegate(parse("${a}!").unwrap());
        let found = values(&find_bindings(&expr, "hi!", &Hints::new()));
        assert_eq!(found, vec![vec![pair("a", "hi")]]);
    }
}
