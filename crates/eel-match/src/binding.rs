//! Flattened results of a match: variable name to matched range.

use crate::applied::Applied;
use crate::score::Score;
use std::collections::BTreeMap;
use std::fmt;

/// One variable's value as recovered from the target string.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    name: String,
    range: Applied,
}

impl Binding {
    pub fn new(name: impl Into<String>, range: Applied) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound text; the widest admissible text if the range is flexible.
    pub fn value(&self) -> String {
        self.range.text().unwrap_or_else(|| self.range.maximal())
    }

    pub fn range(&self) -> &Applied {
        &self.range
    }

    /// The target string with the bound portion bracketed.
    pub fn representation(&self) -> String {
        self.range.to_string()
    }
}

/// One alternative assignment of values to variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Bindings {
    entries: BTreeMap<String, Binding>,
    score: Score,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            score: Score::certain(),
        }
    }
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.get(name)
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.entries.get(name).map(Binding::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn with_score(mut self, score: Score) -> Self {
        self.score = score;
        self
    }

    /// Adds `binding`, or `None` if the name is already bound to other text.
    pub fn with(mut self, binding: Binding) -> Option<Self> {
        if let Some(existing) = self.entries.get(binding.name()) {
            if existing.value() != binding.value() {
                return None;
            }
            return Some(self);
        }
        self.entries.insert(binding.name.clone(), binding);
        Some(self)
    }

    pub fn merge(&self, other: &Bindings) -> Option<Bindings> {
        other
            .iter()
            .try_fold(self.clone(), |acc, binding| acc.with(binding.clone()))
    }

    /// Plain name to value map.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(name, binding)| (name.clone(), binding.value()))
            .collect()
    }

    /// These bindings as hints for a later match.
    pub fn to_hints(&self) -> Hints {
        self.entries
            .iter()
            .map(|(name, binding)| (name.clone(), binding.range.clone()))
            .collect()
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|b| format!("{}={:?}", b.name(), b.value()))
            .collect();
        write!(f, "{{{}}} score {}", parts.join(", "), self.score)
    }
}

/// Values known for variables before matching, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hints(BTreeMap<String, Applied>);

impl Hints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hints from plain values, each fixed over its own text.
    pub fn from_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        values
            .into_iter()
            .map(|(name, value)| (name.into(), Applied::of(value.as_ref())))
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, range: Applied) {
        self.0.insert(name.into(), range);
    }

    pub fn get(&self, name: &str) -> Option<&Applied> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Applied)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Applied)> for Hints {
    fn from_iter<T: IntoIterator<Item = (String, Applied)>>(iter: T) -> Self {
        Hints(iter.into_iter().collect())
    }
}
