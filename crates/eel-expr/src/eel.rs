//! The EEL template grammar.
//!
//! - text outside `${…}` is verbatim
//! - `${name}` references a variable; whitespace separates adjacent identifiers
//! - `'…'` / `"…"` quote literal text, delimiters included
//! - `( … )` groups a sub-expression
//! - `A?:B` elvis, `A?+B` optional suffix, `A+?B` optional prefix, where
//!   `A` is an identifier or a closed group and `B` is an identifier or group
//! - adjacent fragments concatenate

use crate::expression::Expression;
use crate::grammar::{Context, Factory, Language};
use crate::parser::parse_with;
use crate::ParseError;
use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap());

static EEL: LazyLock<Language> = LazyLock::new(|| {
    Language::new(
        "eel",
        Factory {
            text: Expression::text,
            identifier,
            concat: Expression::concat,
        },
    )
    .group("${", "}", Context::Expression, false)
    .group("(", ")", Context::SubExpression, true)
    .group("'", "'", Context::Literal, true)
    .group("\"", "\"", Context::Literal, true)
    .infix("?:", Expression::elvis)
    .infix("?+", Expression::opt_suffix)
    .infix("+?", Expression::opt_prefix)
});

fn identifier(name: &str) -> Option<Expression> {
    IDENTIFIER
        .is_match(name)
        .then(|| Expression::identifier(name))
}

pub fn language() -> &'static Language {
    &EEL
}

/// Parses an EEL template into an expression tree.
pub fn parse(input: &str) -> Result<Expression, ParseError> {
    parse_with(language(), input)
}
