pub mod cli;
pub mod error;
pub mod logging;
pub mod output;
pub mod template;
pub mod values;

pub use eel_expr::{Expression, ParseError};
pub use eel_match::{AnalyzerConfig, Bindings, Hints};
pub use error::{Error, Result};
pub use template::{Entry, TemplateEngine, TemplateValues, Variable, VariableRegistry};
