//! Deinterpolation for eel templates.
//!
//! Given a template expression and a string it produced, [`find_bindings`]
//! reconstructs the variable values that could have produced it. Positions
//! that are not yet pinned down are carried as [`RangeFlex`] windows until
//! literal text, neighbouring fragments or the total length fix them.
//!
//! # Example
//!
//! ```
//! use eel_expr::parse;
//! use eel_match::{find_bindings, Hints};
//!
//! let expr = parse("${artist} - ${title}").unwrap();
//! let found = find_bindings(&expr, "Nina Simone - Feeling Good", &Hints::new());
//!
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].value("artist").as_deref(), Some("Nina Simone"));
//! assert_eq!(found[0].value("title").as_deref(), Some("Feeling Good"));
//! ```

mod analyzer;
mod applied;
mod binding;
mod matcher;
mod range;
mod score;

use thiserror::Error;

pub use analyzer::{find_bindings, Analyzer, AnalyzerConfig, DEFAULT_THRESHOLDS};
pub use applied::{Applied, Host, Segments};
pub use binding::{Binding, Bindings, Hints};
pub use matcher::{Match, MatchKind};
pub use range::{Concatenation, Constraint, RangeFlex, Window};
pub use score::Score;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    #[error("range {range} exceeds host of length {len}")]
    OutOfBounds { range: String, len: usize },
}
