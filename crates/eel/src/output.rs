use crate::template::Variable;
use eel_expr::Expression;
use eel_match::Bindings;
use serde_json::{json, Value};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

pub struct Output {
    stdout: StandardStream,
}

impl Output {
    pub fn new(color: bool) -> Self {
        let color_choice = if color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            stdout: StandardStream::stdout(color_choice),
        }
    }

    fn set_color(&mut self, color: Color) {
        let _ = self.stdout.set_color(ColorSpec::new().set_fg(Some(color)));
    }

    fn set_bold(&mut self) {
        let _ = self.stdout.set_color(ColorSpec::new().set_bold(true));
    }

    fn set_dim(&mut self) {
        let _ = self.stdout.set_color(ColorSpec::new().set_dimmed(true));
    }

    fn reset(&mut self) {
        let _ = self.stdout.reset();
    }

    pub fn print_evaluated(&mut self, value: &str) -> io::Result<()> {
        writeln!(self.stdout, "{value}")
    }

    /// Prints the alternatives found for one input, best first.
    pub fn print_alternatives(
        &mut self,
        input: &str,
        alternatives: &[Bindings],
        best_only: bool,
        with_header: bool,
    ) -> io::Result<()> {
        if with_header {
            self.set_bold();
            writeln!(self.stdout, "{input}")?;
            self.reset();
        }
        if alternatives.is_empty() {
            self.set_color(Color::Red);
            writeln!(self.stdout, "no match for {input:?}")?;
            self.reset();
            return Ok(());
        }
        let shown = if best_only { 1 } else { alternatives.len() };
        for (i, bindings) in alternatives.iter().take(shown).enumerate() {
            let score = bindings.score();
            let color = if score.value() >= 0.9 {
                Color::Green
            } else if score.value() >= 0.4 {
                Color::Yellow
            } else {
                Color::Red
            };
            self.set_color(color);
            write!(self.stdout, "#{} {:.2}", i + 1, score.value())?;
            self.reset();
            self.set_dim();
            writeln!(self.stdout, " {}", score.reason())?;
            self.reset();

            let width = bindings.iter().map(|b| b.name().len()).max().unwrap_or(0);
            for binding in bindings.iter() {
                write!(
                    self.stdout,
                    "  {:width$} = {:?}",
                    binding.name(),
                    binding.value()
                )?;
                self.set_dim();
                writeln!(self.stdout, "  {}", binding.representation())?;
                self.reset();
            }
        }
        self.stdout.flush()
    }

    pub fn print_json(&mut self, results: &[(String, Vec<Bindings>)]) -> io::Result<()> {
        let value = Value::Array(
            results
                .iter()
                .map(|(input, alternatives)| {
                    json!({
                        "input": input,
                        "alternatives": alternatives.iter().map(bindings_json).collect::<Vec<_>>(),
                    })
                })
                .collect(),
        );
        let text = serde_json::to_string_pretty(&value).map_err(io::Error::other)?;
        writeln!(self.stdout, "{text}")
    }

    pub fn print_expression(&mut self, expr: &Expression, variables: &[Variable]) -> io::Result<()> {
        writeln!(self.stdout, "{expr}")?;
        self.set_dim();
        writeln!(self.stdout, "{expr:?}")?;
        self.reset();
        for variable in variables {
            self.set_color(Color::Cyan);
            write!(self.stdout, "{}", variable.name())?;
            self.reset();
            if variable.label() != variable.name() {
                write!(self.stdout, " ({})", variable.label())?;
            }
            if let Some(source) = variable.expression() {
                write!(self.stdout, " = {source}")?;
            }
            writeln!(self.stdout)?;
        }
        Ok(())
    }
}

/// One alternative as JSON: score, reason and per-variable details.
pub fn bindings_json(bindings: &Bindings) -> Value {
    let values: serde_json::Map<String, Value> = bindings
        .iter()
        .map(|b| {
            (
                b.name().to_string(),
                json!({
                    "value": b.value(),
                    "representation": b.representation(),
                }),
            )
        })
        .collect();
    json!({
        "score": bindings.score().value(),
        "reason": bindings.score().reason(),
        "bindings": values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eel_expr::parse;
    use eel_match::{find_bindings, Hints};

    #[test]
    fn test_bindings_json() {
        let expr = parse("${a}-${b}").unwrap();
        let found = find_bindings(&expr, "x-y", &Hints::new());
        let value = bindings_json(&found[0]);
        assert_eq!(value["score"], json!(1.0));
        assert_eq!(value["bindings"]["a"]["value"], json!("x"));
        assert_eq!(value["bindings"]["b"]["representation"], json!("x-[y]"));
    }
}
