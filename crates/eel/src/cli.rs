use crate::error::Result;
use crate::template::TemplateValues;
use crate::values::{load_values, parse_assignment};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "eel", about = "Evaluate templates and recover the values behind their output", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log more detail to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate a template against variable values
    Eval {
        template: String,

        #[command(flatten)]
        values: ValueArgs,
    },

    /// Recover variable values from strings a template produced
    Deinterpolate {
        template: String,

        /// Strings to analyse; read from stdin, one per line, if none given
        inputs: Vec<String>,

        #[command(flatten)]
        values: ValueArgs,

        /// Score threshold to try, in order (repeatable) [default: 0.4 0.2 0.1]
        #[arg(long = "threshold", value_name = "SCORE")]
        thresholds: Vec<f64>,

        /// Show only the best alternative for each input
        #[arg(short, long)]
        best: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how a template parses
    Parse { template: String },
}

#[derive(Args, Default)]
pub struct ValueArgs {
    /// Set a variable (repeatable); when deinterpolating, a value known beforehand
    #[arg(short = 's', long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Read variables from a JSON object file
    #[arg(long, value_name = "FILE")]
    pub values: Option<PathBuf>,
}

impl ValueArgs {
    /// File values first, then `--set` assignments on top.
    pub fn load(&self) -> Result<TemplateValues> {
        let mut values = match &self.values {
            Some(path) => load_values(path)?,
            None => TemplateValues::new(),
        };
        for assignment in &self.set {
            let (name, value) = parse_assignment(assignment)?;
            values.set_value(name, value);
        }
        Ok(values)
    }
}
