//! CDR CPS Core - call rate and queue delay analysis
//!
//! The main entry point for cps-core, handling:
//! - CDR format detection
//! - Per-second call counting into the canonical series file
//! - Queue delay simulation and daily maxima reports

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};

use cps_common::{
    format_error_human, Error, Layout, OutputFormat, Result, StructuredError,
};
use cps_config::{load_settings, ConfigSource, Settings, CONFIG_SCHEMA_VERSION};
use cps_core::cdr::{parse_bound, DetectOptions};
use cps_core::exit_codes::ExitCode;
use cps_core::log_event;
use cps_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use cps_core::pipeline::{
    analyze_capacity, count_calls, detect_profile, load_series, summarize_series, CapacityReport,
    CountOptions,
};
use cps_core::report::{
    render_analysis, render_capacity, render_count, render_profile, write_delay_series,
    AnalysisReport, CountSections, REPORT_SCHEMA_VERSION,
};
use cps_core::series::{write_canonical, Bounds, TimeWindow};

/// CDR CPS - calls-per-second and queue delay analysis for outbound call records
#[derive(Parser)]
#[command(name = "cps-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to a settings file (cps.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "md")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Count outbound calls per second and write the canonical series file
    Count(CountArgs),

    /// Simulate queue delay at one or more capacities
    Analyze(AnalyzeArgs),

    /// Print the detected CDR format
    Detect(DetectArgs),

    /// Print version information
    Version,
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct LayoutArgs {
    /// How to locate the start time column
    #[arg(short = 't', long = "type", value_enum)]
    layout: Option<Layout>,

    /// Start time column: a header name, or a 1-based position
    #[arg(short = 'c', long)]
    column: Option<String>,
}

#[derive(Args, Debug)]
struct BoundArgs {
    /// Inclusive start (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
    #[arg(short = 's', long, value_parser = parse_bound)]
    start: Option<NaiveDateTime>,

    /// Exclusive end (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
    #[arg(short = 'e', long, value_parser = parse_bound)]
    end: Option<NaiveDateTime>,
}

#[derive(Args, Debug)]
struct CountArgs {
    /// CDR export to read
    cdr_file: PathBuf,

    /// Canonical per-second series to write
    cps_file: PathBuf,

    #[command(flatten)]
    bounds: BoundArgs,

    #[command(flatten)]
    layout: LayoutArgs,

    /// Print the spread of calls per second
    #[arg(long)]
    spread: bool,

    /// Print the recorded queue time estimates
    #[arg(long)]
    queue: bool,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Canonical per-second series to read
    cps_file: PathBuf,

    #[command(flatten)]
    bounds: BoundArgs,

    /// Queue capacity in calls per second (repeatable)
    #[arg(long = "capacity", value_name = "CPS", allow_negative_numbers = true)]
    capacities: Vec<f64>,

    /// Write the per-second delay series as CSV
    #[arg(long, value_name = "PATH")]
    delay_out: Option<PathBuf>,

    /// Prompt for further capacities on stdin
    #[arg(long)]
    interactive: bool,
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// CDR export to inspect
    cdr_file: PathBuf,

    #[command(flatten)]
    layout: LayoutArgs,
}

fn main() {
    let cli = Cli::parse();

    let level = LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet);
    let format = matches!(cli.global.format, OutputFormat::Json).then_some(LogFormat::Jsonl);
    init_logging(&LogConfig::from_env(level, format));

    let ctx = LogContext::new(generate_run_id());

    let exit_code = match cli.command {
        None | Some(Commands::Version) => {
            print_version(&cli.global);
            ExitCode::Clean
        }
        Some(Commands::Count(args)) => {
            finish(&cli.global, &ctx, "count", run_count(&cli.global, &ctx, &args))
        }
        Some(Commands::Analyze(args)) => {
            finish(&cli.global, &ctx, "analyze", run_analyze(&cli.global, &ctx, &args))
        }
        Some(Commands::Detect(args)) => {
            finish(&cli.global, &ctx, "detect", run_detect(&cli.global, &ctx, &args))
        }
    };

    std::process::exit(exit_code.as_i32());
}

/// Outcome of a command before it becomes an exit code.
enum Failure {
    /// Argument combination clap cannot express.
    Args(String),
    Run(Error),
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Failure::Run(err)
    }
}

type CommandResult = std::result::Result<(), Failure>;

fn finish(global: &GlobalOpts, ctx: &LogContext, command: &str, result: CommandResult) -> ExitCode {
    match result {
        Ok(()) => {
            log_event!(ctx, DEBUG, event_names::RUN_FINISHED, Stage::Report,
                format!("{} finished", command));
            ExitCode::Clean
        }
        Err(Failure::Args(message)) => output_args_error(global, ctx, &message),
        Err(Failure::Run(err)) => output_error(global, ctx, command, &err),
    }
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_count(global: &GlobalOpts, ctx: &LogContext, args: &CountArgs) -> CommandResult {
    let settings = load_logged(global, ctx)?;
    let detect = detect_options(&args.layout, &settings).map_err(Failure::Args)?;
    let bounds = bounds_from(&args.bounds)?;
    log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "counting calls",
        input = %args.cdr_file.display());

    let outcome = count_calls(open(&args.cdr_file)?, &CountOptions { detect, bounds }, ctx)?;

    let mut out = BufWriter::new(create(&args.cps_file)?);
    let written = write_canonical(&mut out, &outcome.aggregation.counts)?;
    out.flush().map_err(Error::from)?;
    if written == 0 {
        log_event!(ctx, WARN, event_names::CANONICAL_WRITTEN, Stage::Aggregate,
            "no calls counted; wrote an empty series file",
            output = %args.cps_file.display());
    } else {
        log_event!(ctx, INFO, event_names::CANONICAL_WRITTEN, Stage::Aggregate,
            format!("wrote {} seconds", written),
            output = %args.cps_file.display(),
            seconds = written);
    }

    let sections = CountSections {
        spread: args.spread,
        queue_times: args.queue,
    };
    let output = args.cps_file.display().to_string();
    println!(
        "{}",
        render_count(&outcome, written, &output, sections, global.format, &ctx.run_id)?
    );
    Ok(())
}

fn run_analyze(global: &GlobalOpts, ctx: &LogContext, args: &AnalyzeArgs) -> CommandResult {
    let settings = load_logged(global, ctx)?;
    let bounds = bounds_from(&args.bounds)?;
    let capacities = if args.capacities.is_empty() {
        settings.capacities.clone()
    } else {
        args.capacities.clone()
    };
    let interactive = args.interactive || capacities.is_empty();
    log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "analyzing series",
        input = %args.cps_file.display(),
        capacities = ?capacities,
        interactive = interactive);

    let loaded = load_series(BufReader::new(open(&args.cps_file)?), bounds, ctx)?;
    let series = &loaded.series;

    let mut reports = capacities
        .iter()
        .map(|&c| analyze_capacity(series, c, ctx))
        .collect::<Result<Vec<CapacityReport>>>()?;

    let analysis = AnalysisReport {
        window: series.window(),
        summary: summarize_series(series),
        capacities: reports.clone(),
    };
    println!("{}", render_analysis(&analysis, global.format, &ctx.run_id)?);

    if interactive {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        while let Some(capacity) = prompt_capacity(&mut input)? {
            let report = analyze_capacity(series, capacity, ctx)?;
            println!("{}", render_capacity(&report, global.format, &ctx.run_id)?);
            reports.push(report);
        }
    }

    if let Some(path) = &args.delay_out {
        let rows = write_delay_series(BufWriter::new(create(path)?), series, &reports)?;
        log_event!(ctx, INFO, event_names::REPORT_WRITTEN, Stage::Report,
            format!("wrote {} delay rows", rows),
            output = %path.display(),
            capacities = reports.len() as u64);
    }
    Ok(())
}

fn run_detect(global: &GlobalOpts, ctx: &LogContext, args: &DetectArgs) -> CommandResult {
    let settings = load_logged(global, ctx)?;
    let detect = detect_options(&args.layout, &settings).map_err(Failure::Args)?;
    let profile = detect_profile(open(&args.cdr_file)?, &detect, ctx)?;
    println!("{}", render_profile(&profile, global.format, &ctx.run_id)?);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn load_logged(global: &GlobalOpts, ctx: &LogContext) -> Result<Settings> {
    match load_settings(global.config.as_deref()) {
        Ok(loaded) => {
            if loaded.source == ConfigSource::BuiltinDefault {
                log_event!(ctx, DEBUG, event_names::CONFIG_DEFAULT_USED, Stage::Init,
                    "no settings file found; using defaults");
            } else {
                log_event!(ctx, INFO, event_names::CONFIG_LOADED, Stage::Init,
                    format!("settings loaded from {}", loaded.source),
                    path = ?loaded.path);
            }
            Ok(loaded.settings)
        }
        Err(err) => {
            log_event!(ctx, ERROR, event_names::CONFIG_ERROR, Stage::Init, err.to_string());
            Err(err.into())
        }
    }
}

/// Merge layout flags with settings and check combinations clap cannot.
fn detect_options(args: &LayoutArgs, settings: &Settings) -> std::result::Result<DetectOptions, String> {
    let layout = args.layout.unwrap_or(settings.layout);
    let column = args.column.clone().or_else(|| settings.start_column.clone());

    match (layout, column.as_deref()) {
        (Layout::Header, None) => {
            return Err("-t header requires -c with the start time column name".to_string());
        }
        (Layout::Positional, None) => {
            return Err("-t positional requires -c with the start time column number".to_string());
        }
        (Layout::Positional, Some(c)) if !matches!(c.trim().parse::<usize>(), Ok(n) if n > 0) => {
            return Err(format!(
                "-t positional requires a column number of 1 or more, got '{}'",
                c
            ));
        }
        _ => {}
    }

    Ok(DetectOptions {
        layout,
        column,
        extra_start_aliases: settings.extra_start_aliases.clone(),
    })
}

/// Caller bounds, rejecting inverted or fractional periods up front.
///
/// Length is only limited once a series is materialized.
fn bounds_from(args: &BoundArgs) -> Result<Bounds> {
    if let (Some(start), Some(end)) = (args.start, args.end) {
        match TimeWindow::new(start, end) {
            Ok(_) | Err(Error::WindowTooLong { .. }) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(Bounds::new(args.start, args.end))
}

fn open(path: &Path) -> Result<File> {
    Ok(File::open(path)?)
}

fn create(path: &Path) -> Result<File> {
    Ok(File::create(path)?)
}

/// Ask for a capacity until a positive number or `Q` is entered.
///
/// Returns `None` on `Q` or end of input.
fn prompt_capacity<R: BufRead>(input: &mut R) -> Result<Option<f64>> {
    loop {
        eprint!("Enter CPS value, or Q to quit: ");
        std::io::stderr().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        if answer.is_empty() {
            continue;
        }
        if answer.chars().next().is_some_and(|c| c.eq_ignore_ascii_case(&'q')) {
            return Ok(None);
        }
        match answer.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => return Ok(Some(v)),
            _ => eprintln!("'{}' is not a positive number", answer),
        }
    }
}

fn output_error(global: &GlobalOpts, ctx: &LogContext, command: &str, err: &Error) -> ExitCode {
    let exit_code = ExitCode::from(err);
    if exit_code.is_internal_error() {
        log_event!(ctx, ERROR, event_names::INTERNAL_ERROR, Stage::Report, err.to_string(),
            code = err.code());
    }

    match global.format {
        OutputFormat::Json => {
            let structured = StructuredError::from(err)
                .with_context("command", command)
                .with_context("exit_code", exit_code.as_i32())
                .with_context("exit_code_name", exit_code.code_name());
            let response = serde_json::json!({
                "schema_version": REPORT_SCHEMA_VERSION,
                "run_id": ctx.run_id,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "status": "error",
                "error": structured,
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&response).unwrap_or_else(|_| structured.to_json())
            );
        }
        OutputFormat::Summary => {
            eprintln!("[{}] {} failed: {}", ctx.run_id, command, err);
        }
        OutputFormat::Md => {
            eprintln!("{}", format_error_human(err, std::io::stderr().is_terminal()));
        }
    }

    exit_code
}

fn output_args_error(global: &GlobalOpts, ctx: &LogContext, message: &str) -> ExitCode {
    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "schema_version": REPORT_SCHEMA_VERSION,
                "run_id": ctx.run_id,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "status": "error",
                "error": {
                    "code": ExitCode::ArgsError.as_i32(),
                    "category": "args",
                    "message": message,
                }
            });
            eprintln!("{}", response);
        }
        OutputFormat::Summary => {
            eprintln!("[{}] argument error: {}", ctx.run_id, message);
        }
        OutputFormat::Md => {
            eprintln!("error: {}", message);
        }
    }
    ExitCode::ArgsError
}

fn print_version(global: &GlobalOpts) {
    let version_info = serde_json::json!({
        "report_schema_version": REPORT_SCHEMA_VERSION,
        "config_schema_version": CONFIG_SCHEMA_VERSION,
        "cps_core_version": env!("CARGO_PKG_VERSION"),
    });

    match global.format {
        OutputFormat::Json => {
            println!("{}", version_info);
        }
        _ => {
            println!("cps-core {}", env!("CARGO_PKG_VERSION"));
            println!("report schema version: {}", REPORT_SCHEMA_VERSION);
        }
    }
}
