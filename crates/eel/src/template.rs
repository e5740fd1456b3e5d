//! Variables, their values, and the engine that evaluates and deinterpolates
//! templates over them.

use crate::error::{Error, Result};
use eel_expr::{evaluate, parse, Expression, Values};
use eel_match::{Analyzer, AnalyzerConfig, Bindings, Hints};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// A named value slot a template can refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    label: Option<String>,
    expression: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            expression: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Marks the variable as derived from another template.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display label, falling back to the name.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn has_expression(&self) -> bool {
        self.expression.is_some()
    }
}

/// A value together with the sources it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    value: String,
    sources: Vec<String>,
}

impl Entry {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

impl From<&str> for Entry {
    fn from(value: &str) -> Self {
        Entry::new(value)
    }
}

impl From<String> for Entry {
    fn from(value: String) -> Self {
        Entry::new(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateValues {
    entries: BTreeMap<String, Entry>,
}

impl TemplateValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, variable: &Variable) -> Option<&Entry> {
        self.entries.get(variable.name())
    }

    pub fn set(&mut self, variable: &Variable, entry: impl Into<Entry>) {
        self.entries.insert(variable.name().to_string(), entry.into());
    }

    pub fn get_value(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(Entry::value)
    }

    pub fn set_value(&mut self, name: impl Into<String>, entry: impl Into<Entry>) {
        self.entries.insert(name.into(), entry.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The values as hints for deinterpolation.
    pub fn to_hints(&self) -> Hints {
        Hints::from_values(self.iter().map(|(name, entry)| (name.clone(), entry.value())))
    }
}

impl Values for TemplateValues {
    fn value(&self, name: &str) -> Option<&str> {
        self.get_value(name)
    }
}

/// Known variables by name.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: HashMap<String, Variable>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, variable: Variable) {
        self.variables.insert(variable.name().to_string(), variable);
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// The registered variable, or a plain one if `name` is unknown.
    pub fn resolve(&self, name: &str) -> Variable {
        self.get(name).cloned().unwrap_or_else(|| Variable::new(name))
    }
}

/// Parses templates once and runs them forwards and backwards.
#[derive(Debug, Default)]
pub struct TemplateEngine {
    /// One entry per distinct template text, never evicted. Callers that
    /// see an open-ended set of texts should call
    /// [`TemplateEngine::clear_cache`] now and then.
    cache: Mutex<HashMap<String, Expression>>,
    registry: VariableRegistry,
    analyzer: Analyzer,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: VariableRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_analyzer(mut self, config: AnalyzerConfig) -> Self {
        self.analyzer = Analyzer::new(config);
        self
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    /// The parsed form of `text`. Each distinct text is parsed once and
    /// wrapped in its own delegate node.
    pub fn expression(&self, text: &str) -> Result<Expression> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(expr) = cache.get(text) {
            return Ok(expr.clone());
        }
        let expr = parse(text).map_err(|source| Error::Parse {
            template: text.to_string(),
            source,
        })?;
        let expr = Expression::delegate(expr);
        debug!(template = text, cached = cache.len() + 1, "parsed template");
        cache.insert(text.to_string(), expr.clone());
        Ok(expr)
    }

    /// Drops every cached parse. Later lookups parse again and get new
    /// identities.
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Variables referenced by `text`, resolved through the registry.
    pub fn variables(&self, text: &str) -> Result<Vec<Variable>> {
        let expr = self.expression(text)?;
        Ok(expr
            .identifiers()
            .iter()
            .map(|name| self.registry.resolve(name))
            .collect())
    }

    /// Evaluates `text` against `values`; a template with no value at all
    /// renders as the empty string.
    pub fn evaluate(&self, text: &str, values: &TemplateValues) -> Result<String> {
        let expr = self.expression(text)?;
        let resolved: HashMap<String, String> = expr
            .identifiers()
            .iter()
            .map(|name| self.registry.resolve(name))
            .filter_map(|variable| {
                let entry = values.get(&variable)?;
                Some((variable.name().to_string(), entry.value().to_string()))
            })
            .collect();
        Ok(evaluate(&expr, &resolved).unwrap_or_default())
    }

    /// Alternative variable values under which `text` produces `evaluated`,
    /// best first. `known` values act as hints, not requirements.
    pub fn deinterpolate(
        &self,
        text: &str,
        known: &TemplateValues,
        evaluated: &str,
    ) -> Result<Vec<Bindings>> {
        let expr = self.expression(text)?;
        Ok(self.analyzer.find_bindings(&expr, evaluated, &known.to_hints()))
    }
}
