//! Lessons command - browse and verify the built-in catalog

use crate::commands::grade::{exit_code, print_response};
use crate::reporter;
use crate::settings::Settings;
use anyhow::{Context, Result};
use colored::*;
use profai_grader::{Catalog, GradeResponse, Lesson, RunSummary};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn list(json: bool) -> Result<ExitCode> {
    let catalog = Catalog::builtin()?;
    if json {
        let paths: Vec<_> = catalog
            .lessons()
            .map(|(course, lesson)| {
                serde_json::json!({
                    "path": format!("{}/{}", course.slug, lesson.slug),
                    "title": lesson.title,
                    "topic": course.topic,
                    "functionName": lesson.assignment.function_name,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(ExitCode::SUCCESS);
    }

    for course in &catalog.courses {
        println!("{} [{}]", course.title.bold(), course.topic);
        for lesson in &course.lessons {
            println!("  {}/{}  {}", course.slug, lesson.slug, lesson.title);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn show(path: &str, json: bool) -> Result<ExitCode> {
    let catalog = Catalog::builtin()?;
    let lesson = catalog.find(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(lesson)?);
        return Ok(ExitCode::SUCCESS);
    }

    let assignment = &lesson.assignment;
    println!("{}", lesson.title.bold());
    println!("{}", lesson.description);
    if let Some(sample) = &lesson.sample_code {
        println!();
        println!("{}", "Sample:".dimmed());
        println!("{}", sample);
    }
    println!();
    println!("{} {}", "Assignment:".bold(), assignment.title);
    println!("{}", assignment.description);
    println!();
    println!("{} {}", "Entry point:".dimmed(), assignment.function_name);
    println!("{}", "Starter code:".dimmed());
    println!("{}", assignment.starter_code);
    println!();
    println!("{}", "Tests:".dimmed());
    for test in &assignment.tests {
        println!(
            "  {}({}) => {}",
            assignment.function_name,
            test.args
                .iter()
                .map(|arg| arg.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            test.expected
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Grade a source file against one lesson's assignment
pub fn grade(path: &str, source: &Path, json: bool, settings: &Settings) -> Result<ExitCode> {
    let catalog = Catalog::builtin()?;
    let lesson = catalog.find(path)?;
    let code = fs::read_to_string(source)
        .with_context(|| format!("Failed to read source file: {}", source.display()))?;

    let assignment = &lesson.assignment;
    let outcome = settings
        .grader
        .run(&assignment.submission(code), &assignment.tests);

    match outcome {
        Ok(report) if !json => {
            reporter::print_report(&report);
            Ok(ExitCode::SUCCESS)
        }
        Ok(report) => {
            let response = GradeResponse::from(report);
            print_response(&response, true)?;
            Ok(exit_code(&response))
        }
        Err(error) => {
            let response = GradeResponse::CompileFailure {
                error: error.to_string(),
            };
            print_response(&response, json)?;
            Ok(exit_code(&response))
        }
    }
}

/// Result of grading one lesson's reference solution
struct Verification {
    path: String,
    outcome: Result<RunSummary, String>,
}

impl Verification {
    fn passed(&self) -> bool {
        matches!(&self.outcome, Ok(summary) if summary.passed == summary.total)
    }
}

/// Grade `<dir>/<functionName>.js` for every lesson
///
/// Exits with status 1 unless every solution passes every case.
pub fn verify(dir: &Path, settings: &Settings) -> Result<ExitCode> {
    let catalog = Catalog::builtin()?;
    let lessons: Vec<_> = catalog.lessons().collect();

    let verifications: Vec<Verification> = lessons
        .par_iter()
        .map(|(course, lesson)| Verification {
            path: format!("{}/{}", course.slug, lesson.slug),
            outcome: verify_lesson(dir, lesson, settings),
        })
        .collect();

    for verification in &verifications {
        let status = if verification.passed() {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        let detail = match &verification.outcome {
            Ok(summary) => summary.to_string(),
            Err(error) => error.clone(),
        };
        println!("{} {} ({})", status, verification.path, detail);
    }

    let passed = verifications.iter().filter(|v| v.passed()).count();
    println!();
    println!("{}/{} lessons verified", passed, verifications.len());

    if passed == verifications.len() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn verify_lesson(dir: &Path, lesson: &Lesson, settings: &Settings) -> Result<RunSummary, String> {
    let assignment = &lesson.assignment;
    let file: PathBuf = dir.join(format!("{}.js", assignment.function_name));
    let source = fs::read_to_string(&file)
        .map_err(|e| format!("cannot read {}: {}", file.display(), e))?;

    settings
        .grader
        .run(&assignment.submission(source), &assignment.tests)
        .map(|report| report.summary())
        .map_err(|e| e.to_string())
}
