//! Template expression language for eel.
//!
//! Templates mix verbatim text with `${…}` interpolations:
//!
//! - `${name}` substitutes a variable
//! - `'…'` and `"…"` quote literal text inside an interpolation
//! - `A?:B` falls back to `B` when `A` is empty
//! - `A?+B` appends `B` only when `A` is non-empty
//! - `A+?B` prepends `A` only when `B` is non-empty
//!
//! # Example
//!
//! ```
//! use eel_expr::{evaluate, parse};
//! use std::collections::HashMap;
//!
//! let expr = parse("${(track)?+('. ')}${title?:'Untitled'}").unwrap();
//!
//! let mut values = HashMap::new();
//! values.insert("track".to_string(), "7".to_string());
//! assert_eq!(evaluate(&expr, &values).as_deref(), Some("7. Untitled"));
//! ```

mod eel;
mod evaluate;
mod expression;
pub mod grammar;
mod parser;

use thiserror::Error;

pub use eel::{language, parse};
pub use evaluate::{evaluate, Values};
pub use expression::{ExprKind, Expression};
pub use parser::{parse_with, Machine};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected {token}{}", in_groups(.context))]
    UnexpectedToken { token: String, context: Vec<String> },
    #[error("operator '{operator}' is missing an operand{}", in_groups(.context))]
    MissingOperand {
        operator: String,
        context: Vec<String>,
    },
    #[error("group '{open}' is never closed{}", in_groups(.context))]
    UnclosedGroup { open: String, context: Vec<String> },
    #[error("invalid identifier '{name}'{}", in_groups(.context))]
    InvalidIdentifier { name: String, context: Vec<String> },
    #[error("cannot tokenize input at byte {offset}")]
    Tokenize { offset: usize },
    #[error("unexpected {token} after the end of the template")]
    TrailingInput { token: String },
    #[error("template did not produce an expression")]
    Incomplete,
}

fn in_groups(context: &[String]) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!(" (inside {})", context.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_open_groups() {
        let err = parse("${(a").unwrap_err();
        assert_eq!(err.to_string(), "group '(' is never closed (inside ${ ()");

        let err = parse("${a?:}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "operator '?:' is missing an operand (inside ${)"
        );
    }
}
