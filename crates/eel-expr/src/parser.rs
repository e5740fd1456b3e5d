//! Grammar-driven parser.
//!
//! Parsing is an explicit stack of [`Frame`]s, one per open group, driven by
//! a trampoline loop instead of recursive descent: nesting depth is bounded
//! by heap, not by the call stack. Each input (a token, or a fragment
//! completed by a nested frame) is offered to the top frame, which answers
//! with an [`Action`] and possibly an unconsumed remainder that is retried
//! against whatever frame is on top afterwards.

use crate::expression::Expression;
use crate::grammar::{Combinator, Context, GroupSpec, Language, Token};
use crate::ParseError;
use tracing::{debug, trace};

#[derive(Debug)]
pub(crate) enum Input<'i> {
    Token(Token<'i>),
    Fragment { expr: Expression, extensible: bool },
}

impl Input<'_> {
    fn describe(&self) -> String {
        match self {
            Input::Token(token) => token.describe(),
            Input::Fragment { expr, .. } => format!("expression {expr:?}"),
        }
    }
}

#[derive(Debug)]
pub(crate) enum Action<'l> {
    /// Input consumed, nothing else changes.
    Proceed,
    /// Input consumed, a nested group starts.
    Push(Frame<'l>),
    /// Input consumed, the top frame moves to a new state at the same level.
    Replace(Frame<'l>),
    /// The group was closed by its delimiter; its product goes to the frame below.
    Finish,
    /// The frame completed without a closing delimiter, producing this expression.
    Yield(Expression),
}

/// A frame failure before the surrounding group context is attached.
#[derive(Debug)]
pub(crate) enum Fault {
    Unexpected(String),
    MissingOperand(String),
    Unclosed(String),
    InvalidIdentifier(String),
}

/// Fragments collected at one nesting level.
#[derive(Debug, Default)]
pub(crate) struct Sequence {
    parts: Vec<Expression>,
    text: String,
    last_extensible: bool,
}

impl Sequence {
    fn push(&mut self, expr: Expression, extensible: bool) {
        self.parts.push(expr);
        self.last_extensible = extensible;
    }

    fn flush_text(&mut self, lang: &Language) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.push((lang.factory().text)(text), false);
        }
    }

    fn pop_operand(&mut self) -> Option<Expression> {
        if self.last_extensible {
            self.last_extensible = false;
            self.parts.pop()
        } else {
            None
        }
    }

    fn build(mut self, lang: &Language) -> Expression {
        self.flush_text(lang);
        match self.parts.len() {
            1 => self.parts.remove(0),
            _ => (lang.factory().concat)(self.parts),
        }
    }
}

type Step<'i, 'l> = Result<(Action<'l>, Option<Input<'i>>), Fault>;

#[derive(Debug)]
pub(crate) enum Frame<'l> {
    /// Outermost level: verbatim text with interpolation groups.
    Template(Sequence),
    /// Quoted text.
    Literal { group: &'l GroupSpec, text: String },
    /// Interpolation or parenthesised group.
    Group { group: &'l GroupSpec, seq: Sequence },
    /// An infix operator was read; waiting for its right operand.
    Operand {
        operator: String,
        combine: Combinator,
        left: Expression,
        resume: Option<Box<Frame<'l>>>,
    },
}

impl<'l> Frame<'l> {
    fn open(group: &'l GroupSpec) -> Self {
        match group.context {
            Context::Literal => Frame::Literal {
                group,
                text: String::new(),
            },
            Context::Expression | Context::SubExpression => Frame::Group {
                group,
                seq: Sequence::default(),
            },
        }
    }

    /// The delimiter that opened this frame's group, for error context.
    fn opener(&self) -> Option<&str> {
        match self {
            Frame::Template(_) => None,
            Frame::Literal { group, .. } | Frame::Group { group, .. } => Some(&group.open),
            Frame::Operand { resume, .. } => resume.as_ref().and_then(|r| r.opener()),
        }
    }

    fn offer<'i>(&mut self, input: Input<'i>, lang: &'l Language) -> Step<'i, 'l> {
        match self {
            Frame::Template(seq) => match input {
                Input::Token(Token::Delimiter(d)) => match lang.opening(d) {
                    Some(group) if group.context == Context::Expression => {
                        seq.flush_text(lang);
                        Ok((Action::Push(Frame::open(group)), None))
                    }
                    _ => {
                        seq.text.push_str(d);
                        Ok((Action::Proceed, None))
                    }
                },
                Input::Token(Token::Text(t)) => {
                    seq.text.push_str(t);
                    Ok((Action::Proceed, None))
                }
                Input::Token(Token::End) => {
                    let seq = std::mem::take(seq);
                    Ok((Action::Yield(seq.build(lang)), None))
                }
                Input::Fragment { expr, .. } => {
                    // Interpolations are not extensible in literal context.
                    seq.push(expr, false);
                    Ok((Action::Proceed, None))
                }
            },
            Frame::Literal { group, text } => match input {
                Input::Token(Token::Delimiter(d)) if d == group.close => Ok((Action::Finish, None)),
                Input::Token(Token::Delimiter(t)) | Input::Token(Token::Text(t)) => {
                    text.push_str(t);
                    Ok((Action::Proceed, None))
                }
                Input::Token(Token::End) => Err(Fault::Unclosed(group.open.clone())),
                other => Err(Fault::Unexpected(other.describe())),
            },
            Frame::Group { group, seq } => match input {
                Input::Token(Token::Text(t)) => {
                    let (word, rest) = split_word(t);
                    if let Some(word) = word {
                        let ident = (lang.factory().identifier)(word)
                            .ok_or_else(|| Fault::InvalidIdentifier(word.to_string()))?;
                        seq.push(ident, true);
                    }
                    Ok((Action::Proceed, rest.map(|r| Input::Token(Token::Text(r)))))
                }
                Input::Token(Token::Delimiter(d)) if d == group.close => Ok((Action::Finish, None)),
                Input::Token(Token::Delimiter(d)) => {
                    if let Some(combine) = lang.combinator(d) {
                        let left = seq
                            .pop_operand()
                            .ok_or_else(|| Fault::MissingOperand(d.to_string()))?;
                        let resume = std::mem::replace(
                            self,
                            Frame::Template(Sequence::default()),
                        );
                        return Ok((
                            Action::Replace(Frame::Operand {
                                operator: d.to_string(),
                                combine,
                                left,
                                resume: Some(Box::new(resume)),
                            }),
                            None,
                        ));
                    }
                    match lang.opening(d) {
                        Some(nested) if nested.context != Context::Expression => {
                            Ok((Action::Push(Frame::open(nested)), None))
                        }
                        _ => Err(Fault::Unexpected(format!("'{d}'"))),
                    }
                }
                Input::Token(Token::End) => Err(Fault::Unclosed(group.open.clone())),
                Input::Fragment { expr, extensible } => {
                    seq.push(expr, extensible);
                    Ok((Action::Proceed, None))
                }
            },
            Frame::Operand {
                operator,
                combine,
                left,
                resume,
            } => {
                let right = match input {
                    Input::Token(Token::Text(t)) => {
                        let (word, rest) = split_word(t);
                        let Some(word) = word else {
                            return Ok((Action::Proceed, None));
                        };
                        let ident = (lang.factory().identifier)(word)
                            .ok_or_else(|| Fault::InvalidIdentifier(word.to_string()))?;
                        (ident, rest.map(|r| Input::Token(Token::Text(r))))
                    }
                    Input::Token(Token::Delimiter(d)) => {
                        return match lang.opening(d) {
                            Some(nested) if nested.context != Context::Expression => {
                                Ok((Action::Push(Frame::open(nested)), None))
                            }
                            _ => Err(Fault::MissingOperand(operator.to_string())),
                        };
                    }
                    Input::Token(Token::End) => {
                        return Err(Fault::MissingOperand(operator.to_string()))
                    }
                    Input::Fragment { expr, .. } => (expr, None),
                };
                let (right, rest) = right;
                let combined = (*combine)(left.clone(), right);
                let mut outer = resume
                    .take()
                    .map(|b| *b)
                    .ok_or_else(|| Fault::Unexpected(format!("operand for '{operator}'")))?;
                if let Frame::Group { seq, .. } = &mut outer {
                    seq.push(combined, true);
                }
                Ok((Action::Replace(outer), rest))
            }
        }
    }

    /// Product of a frame closed by [`Action::Finish`], with its extensibility.
    fn finish(self, lang: &Language) -> Result<(Expression, bool), Fault> {
        match self {
            Frame::Literal { group, text } => Ok(((lang.factory().text)(text), group.extensible)),
            Frame::Group { group, seq } => Ok((seq.build(lang), group.extensible)),
            Frame::Template(_) | Frame::Operand { .. } => {
                Err(Fault::Unexpected("closing delimiter".to_string()))
            }
        }
    }
}

/// Splits off the first whitespace-separated word, returning it and the
/// unconsumed rest.
fn split_word(text: &str) -> (Option<&str>, Option<&str>) {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return (None, None);
    }
    let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let (word, rest) = trimmed.split_at(end);
    (Some(word), (!rest.is_empty()).then_some(rest))
}

/// The parser state: a stack of frames over one language.
pub struct Machine<'l> {
    lang: &'l Language,
    stack: Vec<Frame<'l>>,
    result: Option<Expression>,
}

impl<'l> Machine<'l> {
    pub fn new(lang: &'l Language) -> Self {
        Self {
            lang,
            stack: vec![Frame::Template(Sequence::default())],
            result: None,
        }
    }

    /// Currently open group delimiters, outermost first.
    pub fn context(&self) -> Vec<String> {
        self.stack
            .iter()
            .filter_map(|f| f.opener().map(str::to_string))
            .collect()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    /// Feeds one token through the machine, including every retry and
    /// fragment hand-off it triggers.
    pub fn offer(&mut self, token: Token<'_>) -> Result<(), ParseError> {
        let mut pending = vec![Input::Token(token)];
        while let Some(input) = pending.pop() {
            let described = input.describe();
            let Some(frame) = self.stack.last_mut() else {
                return Err(ParseError::TrailingInput { token: described });
            };
            let (action, rest) = match frame.offer(input, self.lang) {
                Ok(step) => step,
                Err(fault) => return Err(self.fail(fault)),
            };
            trace!(input = %described, ?action, depth = self.stack.len(), "parser step");
            if let Some(rest) = rest {
                pending.push(rest);
            }
            match action {
                Action::Proceed => {}
                Action::Push(frame) => self.stack.push(frame),
                Action::Replace(frame) => {
                    if let Some(top) = self.stack.last_mut() {
                        *top = frame;
                    }
                }
                Action::Finish => {
                    let Some(frame) = self.stack.pop() else {
                        return Err(ParseError::Incomplete);
                    };
                    let (expr, extensible) = match frame.finish(self.lang) {
                        Ok(product) => product,
                        Err(fault) => return Err(self.fail(fault)),
                    };
                    self.deliver(expr, extensible, &mut pending);
                }
                Action::Yield(expr) => {
                    self.stack.pop();
                    self.deliver(expr, true, &mut pending);
                }
            }
        }
        Ok(())
    }

    fn deliver<'i>(&mut self, expr: Expression, extensible: bool, pending: &mut Vec<Input<'i>>) {
        if self.stack.is_empty() {
            self.result = Some(expr);
        } else {
            pending.push(Input::Fragment { expr, extensible });
        }
    }

    fn fail(&self, fault: Fault) -> ParseError {
        let context = self.context();
        match fault {
            Fault::Unexpected(token) => ParseError::UnexpectedToken { token, context },
            Fault::MissingOperand(operator) => ParseError::MissingOperand { operator, context },
            Fault::Unclosed(open) => ParseError::UnclosedGroup { open, context },
            Fault::InvalidIdentifier(name) => ParseError::InvalidIdentifier { name, context },
        }
    }

    pub fn finish(self) -> Result<Expression, ParseError> {
        self.result.ok_or(ParseError::Incomplete)
    }
}

/// Parses `input` with the given language.
pub fn parse_with(lang: &Language, input: &str) -> Result<Expression, ParseError> {
    let tokens = crate::grammar::tokenize(lang, input)?;
    let mut machine = Machine::new(lang);
    for token in tokens {
        machine.offer(token)?;
    }
    let expr = machine.finish()?;
    debug!(language = lang.name(), input, "parsed template");
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Factory;

    fn lang() -> Language {
        Language::new(
            "test",
            Factory {
                text: Expression::text,
                identifier: |name| {
                    name.chars()
                        .all(char::is_alphanumeric)
                        .then(|| Expression::identifier(name))
                },
                concat: Expression::concat,
            },
        )
        .group("${", "}", Context::Expression, false)
        .group("(", ")", Context::SubExpression, true)
        .group("'", "'", Context::Literal, true)
        .infix("?:", Expression::elvis)
    }

    #[test]
    fn test_split_word() {
        assert_eq!(split_word("  ab cd"), (Some("ab"), Some(" cd")));
        assert_eq!(split_word("ab"), (Some("ab"), None));
        assert_eq!(split_word("   "), (None, None));
    }

    #[test]
    fn test_machine_partial_input_states() {
        let lang = lang();
        let mut machine = Machine::new(&lang);
        machine.offer(Token::Text("x ")).unwrap();
        machine.offer(Token::Delimiter("${")).unwrap();
        machine.offer(Token::Delimiter("(")).unwrap();
        assert_eq!(machine.depth(), 3);
        assert_eq!(machine.context(), vec!["${", "("]);
        machine.offer(Token::Text("a")).unwrap();
        machine.offer(Token::Delimiter("?:")).unwrap();
        // The operand state replaces the group frame at the same depth.
        assert_eq!(machine.depth(), 3);
        assert_eq!(machine.context(), vec!["${", "("]);
        machine.offer(Token::Delimiter("'")).unwrap();
        assert_eq!(machine.depth(), 4);
        machine.offer(Token::Text("b")).unwrap();
        machine.offer(Token::Delimiter("'")).unwrap();
        machine.offer(Token::Delimiter(")")).unwrap();
        machine.offer(Token::Delimiter("}")).unwrap();
        assert_eq!(machine.depth(), 1);
        assert!(!machine.is_complete());
        machine.offer(Token::End).unwrap();
        assert!(machine.is_complete());
        assert_eq!(
            machine.finish().unwrap(),
            Expression::concat(vec![
                Expression::text("x "),
                Expression::elvis(Expression::identifier("a"), Expression::text("b")),
            ])
        );
    }

    #[test]
    fn test_words_are_separate_identifiers() {
        let expr = parse_with(&lang(), "${a  b}").unwrap();
        assert_eq!(
            expr,
            Expression::concat(vec![Expression::identifier("a"), Expression::identifier("b")])
        );
    }

    #[test]
    fn test_operand_word_leaves_rest_for_group() {
        let expr = parse_with(&lang(), "${a?:b c}").unwrap();
        assert_eq!(
            expr,
            Expression::concat(vec![
                Expression::elvis(Expression::identifier("a"), Expression::identifier("b")),
                Expression::identifier("c"),
            ])
        );
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let depth = 10_000;
        let input = format!("${{{}a{}}}", "(".repeat(depth), ")".repeat(depth));
        let expr = parse_with(&lang(), &input).unwrap();
        assert_eq!(expr, Expression::identifier("a"));
    }

    #[test]
    fn test_unclosed_group_reports_context() {
        let err = parse_with(&lang(), "${(a").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnclosedGroup {
                open: "(".to_string(),
                context: vec!["${".to_string(), "(".to_string()],
            }
        );
    }

    #[test]
    fn test_trailing_operator_is_missing_operand() {
        let err = parse_with(&lang(), "${a?:}").unwrap_err();
        assert!(matches!(err, ParseError::MissingOperand { ref operator, .. } if operator == "?:"));
    }

    #[test]
    fn test_leading_operator_is_missing_operand() {
        let err = parse_with(&lang(), "${?:a}").unwrap_err();
        assert!(matches!(err, ParseError::MissingOperand { .. }));
    }

    #[test]
    fn test_invalid_identifier() {
        let err = parse_with(&lang(), "${a-b}").unwrap_err();
        assert!(matches!(err, ParseError::InvalidIdentifier { ref name, .. } if name == "a-b"));
    }
}
