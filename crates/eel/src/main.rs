use anyhow::Context;
use clap::Parser;
use eel::cli::{Cli, Command};
use eel::output::Output;
use eel::{logging, AnalyzerConfig, Bindings, TemplateEngine};
use rayon::prelude::*;
use std::io::{self, BufRead};

fn main() -> anyhow::Result<()> {
    // Reset SIGPIPE handler to default (terminate) so piping to head/tail works correctly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let use_color = !cli.no_color && atty::is(atty::Stream::Stdout);
    let mut output = Output::new(use_color);

    match cli.command {
        Command::Eval { template, values } => {
            let engine = TemplateEngine::new();
            let values = values.load()?;
            let evaluated = engine.evaluate(&template, &values)?;
            output.print_evaluated(&evaluated)?;
        }
        Command::Deinterpolate {
            template,
            inputs,
            values,
            thresholds,
            best,
            json,
        } => {
            let config = if thresholds.is_empty() {
                AnalyzerConfig::default()
            } else {
                AnalyzerConfig { thresholds }
            };
            let engine = TemplateEngine::new().with_analyzer(config);
            let known = values.load()?;
            // Fail on a bad template before reading stdin.
            engine.expression(&template)?;

            let inputs = if inputs.is_empty() {
                io::stdin()
                    .lock()
                    .lines()
                    .collect::<io::Result<Vec<_>>>()
                    .context("Failed to read inputs from stdin")?
            } else {
                inputs
            };

            let results: Vec<(String, Vec<Bindings>)> = inputs
                .par_iter()
                .map(|input| {
                    engine
                        .deinterpolate(&template, &known, input)
                        .map(|found| (input.clone(), found))
                })
                .collect::<eel::Result<_>>()?;

            if json {
                output.print_json(&results)?;
            } else {
                let with_header = results.len() > 1;
                for (input, found) in &results {
                    output.print_alternatives(input, found, best, with_header)?;
                }
            }

            if results.iter().any(|(_, found)| found.is_empty()) {
                std::process::exit(1);
            }
        }
        Command::Parse { template } => {
            let engine = TemplateEngine::new();
            let expr = engine.expression(&template)?;
            let variables = engine.variables(&template)?;
            output.print_expression(&expr, &variables)?;
        }
    }
    Ok(())
}
