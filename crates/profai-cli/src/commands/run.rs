//! Run command - evaluate a script in the sandbox

use crate::reporter;
use crate::settings::Settings;
use anyhow::{anyhow, Context, Result};
use colored::*;
use profai_grader::convert::from_script;
use profai_script::{LogLine, Runtime, Value as ScriptValue};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::thread;

/// Console output plus the completion value, or the uncaught error
type Outcome = (Vec<LogLine>, Result<Option<String>, String>);

/// Evaluate a script and print what it logged
///
/// The completion value is printed last unless it is `undefined`.
pub fn run(file: &Path, settings: &Settings) -> Result<ExitCode> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read source file: {}", file.display()))?;

    let (console, result) = evaluate(source, settings)?;
    for line in &console {
        println!("{}", reporter::format_log_line(line));
    }

    match result {
        Ok(Some(value)) => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => Ok(ExitCode::SUCCESS),
        Err(error) => {
            eprintln!("{} {}", "Uncaught".red().bold(), error);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Script values are thread-local, so only text leaves the worker
fn evaluate(source: String, settings: &Settings) -> Result<Outcome> {
    let limits = settings.grader.limits().clone();
    let handle = thread::Builder::new()
        .name("profai-run".to_string())
        .stack_size(settings.grader.stack_size())
        .spawn(move || {
            let mut runtime = Runtime::new(limits);
            let result = runtime
                .eval(&source)
                .map(|value| match value {
                    ScriptValue::Undefined => None,
                    value => Some(from_script(&value).to_string()),
                })
                .map_err(|e| e.to_string());
            (runtime.console_lines(), result)
        })
        .context("Failed to spawn interpreter thread")?;

    handle
        .join()
        .map_err(|_| anyhow!("Interpreter thread panicked"))
}
