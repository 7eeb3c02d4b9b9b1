//! Grade command - grade a JSON request

use crate::reporter;
use crate::settings::Settings;
use anyhow::{Context, Result};
use profai_grader::{GradeRequest, GradeResponse};
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

/// Grade the request in `path` (`-` reads stdin)
pub fn run(path: &str, json: bool, settings: &Settings) -> Result<ExitCode> {
    let text = read_request(path)?;
    let request: GradeRequest =
        serde_json::from_str(&text).with_context(|| format!("Invalid grade request: {}", path))?;

    let response = settings.grader.grade(&request);
    print_response(&response, json)?;

    Ok(exit_code(&response))
}

fn read_request(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read request from stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read request file: {}", path))
    }
}

pub fn print_response(response: &GradeResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }
    match response {
        GradeResponse::Success {
            results,
            passed_count,
            total_count,
        } => {
            for (index, result) in results.iter().enumerate() {
                println!("{}", reporter::format_result(index, result));
            }
            println!();
            println!("{}/{} tests passed", passed_count, total_count);
        }
        GradeResponse::CompileFailure { error } => {
            eprintln!("{}", reporter::format_compile_error(error));
        }
    }
    Ok(())
}

/// Failing cases still count as graded
pub fn exit_code(response: &GradeResponse) -> ExitCode {
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
