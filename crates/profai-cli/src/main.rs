use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod reporter;
mod settings;

/// ProfAI grading sandbox.
///
/// Grades learner submissions against literal test cases, runs scripts in
/// the sandboxed interpreter and checks the built-in lesson catalog.
///
/// EXAMPLES:
///     profai grade --request req.json         Grade a request file
///     cat req.json | profai grade -r - --json Grade from stdin, print JSON
///     profai run sample.js                    Run a script, show its console
///     profai lessons list                     List built-in lessons
///     profai lessons verify solutions/        Grade reference solutions
///
/// ENVIRONMENT VARIABLES:
///     PROFAI_LOG            tracing filter for diagnostics on stderr (default: warn)
///     PROFAI_MAX_STEPS      Step budget per compile and per case (0 = unlimited)
///     PROFAI_TIMEOUT_MS     Wall-clock budget in milliseconds (0 = unlimited)
///     PROFAI_NO_COLOR       Set to disable colored output
#[derive(Parser)]
#[command(name = "profai")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file to use instead of searching for profai.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Step budget per compile step and per test case (0 = unlimited)
    #[arg(long, global = true)]
    max_steps: Option<u64>,

    /// Wall-clock budget in milliseconds (0 = unlimited)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Show debug diagnostics on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a submission against its test cases
    ///
    /// Reads a JSON request `{ source, functionName, tests }` and prints the
    /// verdicts. Exits with status 1 when the submission fails to compile;
    /// failing test cases still exit 0.
    ///
    /// EXAMPLES:
    ///     profai grade --request req.json
    ///     profai grade --request - --json < req.json
    #[command(visible_alias = "g")]
    Grade {
        /// Request file, or `-` for stdin
        #[arg(long, short = 'r')]
        request: String,
        /// Print the response as JSON
        #[arg(long, env = "PROFAI_JSON")]
        json: bool,
    },

    /// Run a script and print its console output
    #[command(visible_alias = "r")]
    Run {
        /// Path to the script
        file: PathBuf,
    },

    /// Browse and check the built-in lesson catalog
    Lessons {
        #[command(subcommand)]
        command: LessonsCommand,
    },
}

#[derive(Subcommand)]
enum LessonsCommand {
    /// List every lesson as `<course>/<slug>`
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show a lesson and its assignment
    Show {
        /// Lesson path, `<course>/<slug>`
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Grade a source file against a lesson's assignment
    Grade {
        /// Lesson path, `<course>/<slug>`
        path: String,
        /// Submission source file
        #[arg(long, short = 's')]
        source: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Grade `<dir>/<functionName>.js` for every lesson in parallel
    Verify {
        /// Directory holding one solution per assignment
        dir: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let overrides = settings::Overrides {
        config: cli.config,
        max_steps: cli.max_steps,
        timeout_ms: cli.timeout_ms,
        no_color: cli.no_color,
    };
    let settings = settings::Settings::load(&overrides)?;
    if !settings.color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Grade { request, json } => {
            commands::grade::run(&request, json || settings.json, &settings)
        }
        Commands::Run { file } => commands::run::run(&file, &settings),
        Commands::Lessons { command } => match command {
            LessonsCommand::List { json } => commands::lessons::list(json),
            LessonsCommand::Show { path, json } => commands::lessons::show(&path, json),
            LessonsCommand::Grade { path, source, json } => {
                commands::lessons::grade(&path, &source, json || settings.json, &settings)
            }
            LessonsCommand::Verify { dir } => commands::lessons::verify(&dir, &settings),
        },
    }
}

/// Install the stderr subscriber
///
/// `-v` forces `debug`; otherwise `PROFAI_LOG` is used when it parses,
/// falling back to `warn`.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        std::env::var("PROFAI_LOG")
            .ok()
            .and_then(|spec| EnvFilter::try_new(spec).ok())
            .unwrap_or_else(|| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
