mod config;
mod runner;
mod tap;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use odb_core::{
    read_database_file, write_database, write_database_to, LineEnding, ReadOptions, ReadReport,
};

use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Line terminator for serialized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LineEndingArg {
    Lf,
    Cr,
}

impl From<LineEndingArg> for LineEnding {
    fn from(arg: LineEndingArg) -> Self {
        match arg {
            LineEndingArg::Lf => LineEnding::Lf,
            LineEndingArg::Cr => LineEnding::Cr,
        }
    }
}

/// ODB legacy database reader and writer.
#[derive(Parser)]
#[command(name = "odb", version, about = "ODB legacy database reader and writer")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML file with [read] and [write] defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Budget flags; each one overrides the config file.
#[derive(Args, Default)]
struct BudgetArgs {
    /// Errors tolerated before the read aborts
    #[arg(long)]
    max_errors: Option<usize>,
    /// Warnings tolerated before the read aborts
    #[arg(long)]
    max_warnings: Option<usize>,
    /// Keep scanning past the budget (lexical diagnostics only)
    #[arg(long)]
    continue_on_error: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a database, reporting diagnostics and writing optional artifacts
    Parse {
        /// Path to the ODB file
        file: PathBuf,
        /// Write the token listing here
        #[arg(long)]
        listing: Option<PathBuf>,
        /// Write diagnostics here, one per line
        #[arg(long)]
        errors: Option<PathBuf>,
        /// Write the re-serialized database here
        #[arg(long)]
        dump: Option<PathBuf>,
        /// Line terminator for --dump
        #[arg(long, value_enum)]
        line_ending: Option<LineEndingArg>,
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Read a database and print it in canonical form
    Dump {
        /// Path to the ODB file
        file: PathBuf,
        /// Line terminator for the output
        #[arg(long, value_enum)]
        line_ending: Option<LineEndingArg>,
    },

    /// Check that reading then writing a file reproduces it exactly
    Roundtrip {
        /// Path to the ODB file
        file: PathBuf,
        /// Expected output (default: the input itself)
        #[arg(long)]
        expected: Option<PathBuf>,
        /// Line terminator to compare with
        #[arg(long, value_enum)]
        line_ending: Option<LineEndingArg>,
        /// On mismatch, write the actual output to <file>.actual
        #[arg(long)]
        save_mismatch: bool,
    },

    /// Run the conformance test suite
    Test {
        /// Path to the conformance suite directory
        #[arg(default_value = "conformance")]
        suite_dir: PathBuf,
    },
}

/// Paths given to `parse` for its side outputs.
struct Artifacts<'a> {
    listing: Option<&'a Path>,
    errors: Option<&'a Path>,
    dump: Option<&'a Path>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Parse {
            file,
            listing,
            errors,
            dump,
            line_ending,
            budget,
        } => {
            let mut options = read_options(&config, &budget);
            options.listing = listing.is_some();
            let line_ending = line_ending.map_or(config.write.line_ending, LineEnding::from);
            let artifacts = Artifacts {
                listing: listing.as_deref(),
                errors: errors.as_deref(),
                dump: dump.as_deref(),
            };
            cmd_parse(&file, &options, &artifacts, line_ending, cli.output, cli.quiet);
        }
        Commands::Dump { file, line_ending } => {
            let options = read_options(&config, &BudgetArgs::default());
            let line_ending = line_ending.map_or(config.write.line_ending, LineEnding::from);
            cmd_dump(&file, &options, line_ending, cli.output, cli.quiet);
        }
        Commands::Roundtrip {
            file,
            expected,
            line_ending,
            save_mismatch,
        } => {
            let options = read_options(&config, &BudgetArgs::default());
            let line_ending = line_ending.map_or(config.write.line_ending, LineEnding::from);
            let expected = expected.unwrap_or_else(|| file.clone());
            cmd_roundtrip(
                &file,
                &expected,
                &options,
                line_ending,
                save_mismatch,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Test { suite_dir } => {
            cmd_test(&suite_dir);
        }
    }
}

/// `RUST_LOG` filtering, `warn` when unset, always to stderr so stdout
/// stays clean for dumps and TAP.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_options(config: &Config, budget: &BudgetArgs) -> ReadOptions {
    let mut options = config.read.clone();
    if let Some(n) = budget.max_errors {
        options.max_errors = n;
    }
    if let Some(n) = budget.max_warnings {
        options.max_warnings = n;
    }
    if budget.continue_on_error {
        options.continue_on_error = true;
    }
    options
}

fn read_or_exit(file: &Path, options: &ReadOptions, output: OutputFormat, quiet: bool) -> ReadReport {
    match read_database_file(file, options) {
        Ok(report) => report,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn create_or_exit(path: &Path, output: OutputFormat, quiet: bool) -> BufWriter<File> {
    match File::create(path) {
        Ok(f) => BufWriter::new(f),
        Err(e) => {
            let msg = format!("error: cannot create '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_parse(
    file: &Path,
    options: &ReadOptions,
    artifacts: &Artifacts<'_>,
    line_ending: LineEnding,
    output: OutputFormat,
    quiet: bool,
) {
    // Artifacts are created before reading starts.
    let mut listing = artifacts.listing.map(|p| (p, create_or_exit(p, output, quiet)));
    let mut errors = artifacts.errors.map(|p| (p, create_or_exit(p, output, quiet)));
    let mut dump = artifacts.dump.map(|p| (p, create_or_exit(p, output, quiet)));

    let result = read_database_file(file, options);

    let mut write_failed = false;
    if let (Err(e), Some((path, out))) = (&result, errors.as_mut()) {
        let written = writeln!(out, "error: {}", e);
        write_failed |= artifact_failed(*path, written, output, quiet);
    }
    if let Ok(report) = &result {
        if let Some((path, out)) = listing.as_mut() {
            let written = report
                .listing
                .iter()
                .try_for_each(|line| writeln!(out, "{}", line));
            write_failed |= artifact_failed(*path, written, output, quiet);
        }
        if let Some((path, out)) = errors.as_mut() {
            let written = report
                .diagnostics
                .iter()
                .try_for_each(|d| writeln!(out, "{}", d));
            write_failed |= artifact_failed(*path, written, output, quiet);
        }
        if let Some((path, out)) = dump.as_mut() {
            let written = write_database_to(&report.database, line_ending, &mut *out);
            write_failed |= artifact_failed(*path, written, output, quiet);
        }
    }
    for (path, mut out) in [listing, errors, dump].into_iter().flatten() {
        write_failed |= artifact_failed(path, out.flush(), output, quiet);
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&report.to_json_value())
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            print_diagnostics(&report, quiet);
            if !quiet {
                println!("{}", summary(&report));
            }
        }
    }

    if write_failed || !report.is_clean() {
        process::exit(1);
    }
}

fn artifact_failed(path: &Path, result: io::Result<()>, output: OutputFormat, quiet: bool) -> bool {
    match result {
        Ok(()) => false,
        Err(e) => {
            let msg = format!("error: cannot write '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            true
        }
    }
}

fn cmd_dump(
    file: &Path,
    options: &ReadOptions,
    line_ending: LineEnding,
    output: OutputFormat,
    quiet: bool,
) {
    let report = read_or_exit(file, options, output, quiet);
    print_diagnostics(&report, quiet);

    let mut stdout = io::stdout().lock();
    if let Err(e) = write_database_to(&report.database, line_ending, &mut stdout) {
        report_error(&format!("error: cannot write output: {}", e), output, quiet);
        process::exit(1);
    }

    if !report.is_clean() {
        if !quiet {
            eprintln!("{}", summary(&report));
        }
        process::exit(1);
    }
}

fn cmd_roundtrip(
    file: &Path,
    expected_path: &Path,
    options: &ReadOptions,
    line_ending: LineEnding,
    save_mismatch: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let report = read_or_exit(file, options, output, quiet);
    let expected = match std::fs::read_to_string(expected_path) {
        Ok(s) => line_ending.convert(&s),
        Err(e) => {
            let msg = format!("error reading file '{}': {}", expected_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let actual = write_database(&report.database, line_ending);
    let matches = actual == expected;

    let mut saved = None;
    if !matches && save_mismatch {
        let mut name = file.as_os_str().to_owned();
        name.push(".actual");
        let path = PathBuf::from(name);
        if let Err(e) = std::fs::write(&path, &actual) {
            let msg = format!("error: cannot write '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
        saved = Some(path);
    }

    match output {
        OutputFormat::Json => {
            let mut json = report.to_json_value();
            json["match"] = serde_json::Value::Bool(matches);
            if let Some(path) = &saved {
                json["actual"] = serde_json::Value::String(path.display().to_string());
            }
            let pretty = serde_json::to_string_pretty(&json)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            print_diagnostics(&report, quiet);
            if !quiet {
                if matches {
                    println!("round trip ok: {}", file.display());
                } else {
                    eprintln!(
                        "round trip mismatch: {} differs from {}",
                        file.display(),
                        expected_path.display()
                    );
                    if let Some(path) = &saved {
                        eprintln!("actual output written to {}", path.display());
                    }
                }
                if !report.is_clean() {
                    eprintln!("{}", summary(&report));
                }
            }
        }
    }

    if !matches || !report.is_clean() {
        process::exit(1);
    }
}

/// TAP goes to stdout regardless of `--quiet`.
fn cmd_test(suite_dir: &Path) {
    if !suite_dir.exists() {
        eprintln!(
            "error: conformance suite directory not found: {}",
            suite_dir.display()
        );
        process::exit(1);
    }

    let result = runner::run_suite(suite_dir);
    if result.failed > 0 {
        process::exit(1);
    }
}

fn summary(report: &ReadReport) -> String {
    let mut s = format!(
        "errors: {}, warnings: {}",
        report.error_count, report.warning_count
    );
    if report.aborted {
        s.push_str(" (aborted)");
    }
    s
}

fn print_diagnostics(report: &ReadReport, quiet: bool) {
    if quiet {
        return;
    }
    for d in &report.diagnostics {
        eprintln!("{}", d);
    }
}

fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
