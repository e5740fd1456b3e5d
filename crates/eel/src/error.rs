use eel_expr::ParseError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to parse template '{template}'")]
    Parse {
        template: String,
        #[source]
        source: ParseError,
    },

    #[error("Failed to read values file '{path}'")]
    ReadValues {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid values file '{path}': {message}")]
    ValuesFormat { path: PathBuf, message: String },

    #[error("Invalid assignment '{0}', expected NAME=VALUE")]
    Assignment(String),
}

pub type Result<T> = std::result::Result<T, Error>;
