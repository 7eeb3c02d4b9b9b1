//! Human-readable grading output

use colored::*;
use profai_grader::{RunReport, RunResult};
use profai_script::{LogLevel, LogLine};

/// One line per case: `PASS #1 got 5`, or the expected value on failure
pub fn format_result(index: usize, result: &RunResult) -> String {
    if result.pass {
        format!("{} #{} got {}", "PASS".green().bold(), index + 1, result.got)
    } else {
        format!(
            "{} #{} got {}, expected {}",
            "FAIL".red().bold(),
            index + 1,
            result.got,
            result.expected
        )
    }
}

pub fn format_summary(report: &RunReport) -> String {
    let summary = report.summary().to_string();
    if report.all_passed() {
        summary.green().bold().to_string()
    } else {
        summary.yellow().bold().to_string()
    }
}

pub fn format_log_line(line: &LogLine) -> String {
    match line.level {
        LogLevel::Warn => line.text.yellow().to_string(),
        LogLevel::Error => line.text.red().to_string(),
        LogLevel::Debug => line.text.dimmed().to_string(),
        LogLevel::Log | LogLevel::Info => line.text.clone(),
    }
}

pub fn format_compile_error(error: &str) -> String {
    format!("{} {}", "compile error:".red().bold(), error)
}

/// Print every case, captured console output and the summary
pub fn print_report(report: &RunReport) {
    for (index, result) in report.results.iter().enumerate() {
        println!("{}", format_result(index, result));
    }
    if !report.console.is_empty() {
        println!();
        println!("{}", "console:".dimmed());
        for line in &report.console {
            println!("  {}", format_log_line(line));
        }
    }
    println!();
    println!("{}", format_summary(report));
}

#[cfg(test)]
mod tests {
    use super::*;
    use profai_grader::Value;
    use rstest::rstest;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_format_pass() {
        plain();
        let result = RunResult {
            pass: true,
            got: Value::from(5),
            expected: Value::from(5),
        };
        assert_eq!(format_result(0, &result), "PASS #1 got 5");
    }

    #[test]
    fn test_format_fail_shows_expected() {
        plain();
        let result = RunResult {
            pass: false,
            got: Value::from("Error: x"),
            expected: Value::sequence([Value::from(1), Value::from(2)]),
        };
        assert_eq!(
            format_result(2, &result),
            r#"FAIL #3 got "Error: x", expected [1,2]"#
        );
    }

    #[rstest]
    #[case(Value::Number(f64::NAN), Value::Null, "FAIL #1 got NaN, expected null")]
    #[case(Value::Undefined, Value::Null, "FAIL #1 got undefined, expected null")]
    #[case(Value::Number(f64::INFINITY), Value::from(1), "FAIL #1 got Infinity, expected 1")]
    fn test_format_fail_distinguishes_non_json_values(
        #[case] got: Value,
        #[case] expected: Value,
        #[case] line: &str,
    ) {
        plain();
        let result = RunResult {
            pass: false,
            got,
            expected,
        };
        assert_eq!(format_result(0, &result), line);
    }

    #[test]
    fn test_format_summary() {
        plain();
        let report = RunReport::new(Vec::new(), Vec::new());
        assert_eq!(format_summary(&report), "0/0 tests passed");
    }
}
