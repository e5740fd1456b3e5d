//! Language descriptions and the tokenizer driven by them.
//!
//! A [`Language`] tells the generic parser which delimiters open and close
//! groups, what kind of context each group establishes, which delimiters are
//! infix combinators, and how to build expression nodes from raw text.

use crate::expression::Expression;
use crate::ParseError;
use winnow::combinator::{alt, not, preceded, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, literal};

/// How the content of a group is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Top-level interpolation: identifiers, quoted text, groups and infix operators.
    Expression,
    /// Verbatim text; only the closing delimiter is special.
    Literal,
    /// Parenthesised grouping inside an expression.
    SubExpression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub open: String,
    pub close: String,
    pub context: Context,
    /// Whether an infix operator may follow the closed group.
    pub extensible: bool,
}

pub type Combinator = fn(Expression, Expression) -> Expression;

/// Node constructors used by the parser.
#[derive(Debug, Clone, Copy)]
pub struct Factory {
    pub text: fn(String) -> Expression,
    /// Returns `None` when the name is not a valid identifier.
    pub identifier: fn(&str) -> Option<Expression>,
    pub concat: fn(Vec<Expression>) -> Expression,
}

#[derive(Debug, Clone)]
pub struct Language {
    name: &'static str,
    groups: Vec<GroupSpec>,
    infixes: Vec<(String, Combinator)>,
    delimiters: Vec<String>,
    factory: Factory,
}

impl Language {
    pub fn new(name: &'static str, factory: Factory) -> Self {
        Self {
            name,
            groups: Vec::new(),
            infixes: Vec::new(),
            delimiters: Vec::new(),
            factory,
        }
    }

    pub fn group(
        mut self,
        open: impl Into<String>,
        close: impl Into<String>,
        context: Context,
        extensible: bool,
    ) -> Self {
        let spec = GroupSpec {
            open: open.into(),
            close: close.into(),
            context,
            extensible,
        };
        self.add_delimiter(spec.open.clone());
        self.add_delimiter(spec.close.clone());
        self.groups.push(spec);
        self
    }

    pub fn infix(mut self, delimiter: impl Into<String>, combinator: Combinator) -> Self {
        let delimiter = delimiter.into();
        self.add_delimiter(delimiter.clone());
        self.infixes.push((delimiter, combinator));
        self
    }

    fn add_delimiter(&mut self, delimiter: String) {
        if !self.delimiters.contains(&delimiter) {
            self.delimiters.push(delimiter);
            // Longest first, so "${" wins over a shorter delimiter sharing its prefix.
            self.delimiters.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn delimiters(&self) -> impl Iterator<Item = &str> {
        self.delimiters.iter().map(String::as_str)
    }

    /// The group opened by `delimiter`, if any.
    pub fn opening(&self, delimiter: &str) -> Option<&GroupSpec> {
        self.groups.iter().find(|g| g.open == delimiter)
    }

    pub fn combinator(&self, delimiter: &str) -> Option<Combinator> {
        self.infixes
            .iter()
            .find(|(d, _)| d == delimiter)
            .map(|(_, c)| *c)
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }
}

// ============ Tokenizer ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'i> {
    Delimiter(&'i str),
    Text(&'i str),
    /// Synthetic end-of-input marker.
    End,
}

impl Token<'_> {
    pub fn describe(&self) -> String {
        match self {
            Token::Delimiter(d) => format!("'{d}'"),
            Token::Text(t) => format!("text {t:?}"),
            Token::End => "end of input".to_string(),
        }
    }
}

fn delimiter<'i, 'l>(lang: &'l Language) -> impl FnMut(&mut &'i str) -> ModalResult<&'i str> + 'l {
    move |input: &mut &'i str| {
        for delim in lang.delimiters() {
            if input.starts_with(delim) {
                return literal(delim).parse_next(input);
            }
        }
        Err(ErrMode::Backtrack(ContextError::new()))
    }
}

fn text_run<'i, 'l>(lang: &'l Language) -> impl FnMut(&mut &'i str) -> ModalResult<&'i str> + 'l {
    move |input: &mut &'i str| {
        repeat(1.., preceded(not(delimiter(lang)), any))
            .map(|()| ())
            .take()
            .parse_next(input)
    }
}

/// Splits `input` into delimiter and text tokens, terminated by [`Token::End`].
///
/// Delimiters are recognised everywhere; it is up to the parser state to
/// treat one as plain text where the context calls for it.
pub fn tokenize<'i>(lang: &Language, input: &'i str) -> Result<Vec<Token<'i>>, ParseError> {
    let mut rest = input;
    let mut tokens: Vec<Token<'i>> = repeat(
        0..,
        alt((
            delimiter(lang).map(Token::Delimiter),
            text_run(lang).map(Token::Text),
        )),
    )
    .parse_next(&mut rest)
    .map_err(|_| ParseError::Tokenize {
        offset: input.len() - rest.len(),
    })?;
    if !rest.is_empty() {
        return Err(ParseError::Tokenize {
            offset: input.len() - rest.len(),
        });
    }
    tokens.push(Token::End);
    Ok(tokens)
}
