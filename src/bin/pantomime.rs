//! Pantomime CLI - Command-line interface for the Pantomime tick processor
//!
//! Commands:
//! - replay: Process recorded tick records into reports (batch mode)
//! - run: Process streaming tick records from stdin (streaming mode)
//! - validate: Validate tick record schema
//! - doctor: Diagnose configuration and state files
//! - schema: Print input/output schema information
//! - config: Print the effective configuration

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;

use pantomime::encoder::{FrameReport, REPORT_VERSION};
use pantomime::phase::SessionState;
use pantomime::pipeline::TickProcessor;
use pantomime::schema::{TickAdapter, TickRecord, SCHEMA_VERSION};
use pantomime::{PipelineConfig, TrackingError, PANTOMIME_VERSION, PRODUCER_NAME};

/// Pantomime - skeleton frames in, rep counts and navigation events out
#[derive(Parser)]
#[command(name = "pantomime")]
#[command(version = PANTOMIME_VERSION)]
#[command(about = "Turn skeleton tick records into exercise and navigation reports", long_about = None)]
struct Cli {
    /// Pipeline configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process recorded tick records into reports (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Load session state from file
        #[arg(long)]
        load_state: Option<PathBuf>,

        /// Save session state to file after processing
        #[arg(long)]
        save_state: Option<PathBuf>,
    },

    /// Process streaming tick records from stdin (streaming mode)
    Run {
        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Load session state from file
        #[arg(long)]
        load_state: Option<PathBuf>,

        /// Save session state to file on exit
        #[arg(long)]
        save_state: Option<PathBuf>,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Validate tick record schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and state files
    Doctor {
        /// Check a saved session state file
        #[arg(long)]
        state: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },

    /// Print the effective configuration (defaults unless --config is given)
    Config,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one tick per line)
    Ndjson,
    /// JSON array of ticks
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one report per line)
    Ndjson,
    /// JSON array of reports
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (pantomime.tick.v1)
    Input,
    /// Output schema (pantomime.report.v1)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), PantomimeCliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            load_state,
            save_state,
        } => cmd_replay(
            &input,
            &output,
            input_format,
            output_format,
            config_path,
            load_state.as_deref(),
            save_state.as_deref(),
        ),

        Commands::Run {
            output_format,
            load_state,
            save_state,
            flush,
        } => cmd_run(
            output_format,
            config_path,
            load_state.as_deref(),
            save_state.as_deref(),
            flush,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { state, json } => cmd_doctor(config_path, state.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),

        Commands::Config => cmd_config(config_path),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config_path: Option<&Path>,
    load_state: Option<&Path>,
    save_state: Option<&Path>,
) -> Result<(), PantomimeCliError> {
    let input_data = read_input(input)?;
    let records = parse_records(&input_data, &input_format)?;

    if records.is_empty() {
        return Err(PantomimeCliError::NoTicks);
    }

    let mut processor = build_processor(config_path, load_state)?;

    let mut reports: Vec<FrameReport> = Vec::with_capacity(records.len());
    for record in &records {
        reports.push(processor.process_record(record)?);
    }
    tracing::info!(ticks = reports.len(), phase = processor.phase().as_str(), "replay finished");

    if let Some(state_path) = save_state {
        fs::write(state_path, processor.save_state()?)?;
    }

    let output_data = format_output(&reports, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_run(
    output_format: OutputFormat,
    config_path: Option<&Path>,
    load_state: Option<&Path>,
    save_state: Option<&Path>,
    flush: bool,
) -> Result<(), PantomimeCliError> {
    let mut processor = build_processor(config_path, load_state)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut processed = 0usize;
    let mut skipped = 0usize;

    for (line_num, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        // Bad lines are skipped so one corrupt tick does not stop the stream
        let frame = match TickAdapter::parse_record(trimmed)
            .and_then(|record| processor.process_record(&record))
        {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(line = line_num + 1, error = %e, "skipping tick");
                skipped += 1;
                continue;
            }
        };

        write!(stdout, "{}", format_output(std::slice::from_ref(&frame), &output_format)?)?;
        if flush {
            stdout.flush()?;
        }
        processed += 1;
    }

    stdout.flush()?;
    tracing::info!(processed, skipped, "stream closed");

    if let Some(state_path) = save_state {
        fs::write(state_path, processor.save_state()?)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), PantomimeCliError> {
    let input_data = read_input(input)?;
    let records = parse_records(&input_data, &input_format)?;

    let results = TickAdapter::validate_records(&records);

    let report = ValidationReport {
        total_ticks: records.len(),
        valid_ticks: records.len() - results.len(),
        invalid_ticks: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                tick_id: r.tick_id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total ticks:   {}", report.total_ticks);
        println!("Valid ticks:   {}", report.valid_ticks);
        println!("Invalid ticks: {}", report.invalid_ticks);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Tick {} (index {}): {}",
                    err.tick_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_ticks > 0 {
        Err(PantomimeCliError::ValidationFailed(report.invalid_ticks))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    config_path: Option<&Path>,
    state_path: Option<&Path>,
    json: bool,
) -> Result<(), PantomimeCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck::ok("pantomime_version", format!("Pantomime version {}", PANTOMIME_VERSION)),
        DoctorCheck::ok("schema_version", format!("Input schema: {}", SCHEMA_VERSION)),
    ];

    if let Some(path) = config_path {
        checks.push(check_file(path, "config", |content| {
            PipelineConfig::from_json(content)
                .map(|c| {
                    format!(
                        "Config valid (reps {}/{}, pointer {:?})",
                        c.rep.contracted_threshold, c.rep.extended_threshold, c.pointer_hand
                    )
                })
                .map_err(|e| e.to_string())
        }));
    }

    if let Some(path) = state_path {
        checks.push(check_file(path, "state", |content| {
            serde_json::from_str::<SessionState>(content)
                .map(|s| format!("State file valid (phase {}, {} reps)", s.phase.as_str(), s.rep_count()))
                .map_err(|e| format!("Invalid state JSON: {}", e))
        }));
    }

    // Check stdin is available (for streaming mode)
    checks.push(if atty::is(atty::Stream::Stdin) {
        DoctorCheck::ok("stdin", "stdin is a TTY (interactive mode)".to_string())
    } else {
        DoctorCheck::ok("stdin", "stdin is a pipe (streaming mode ready)".to_string())
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PANTOMIME_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pantomime Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PantomimeCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_file<F>(path: &Path, name: &str, inspect: F) -> DoctorCheck
where
    F: FnOnce(&str) -> Result<String, String>,
{
    if !path.exists() {
        return DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist", path.display()),
        };
    }

    let (status, message) = match fs::read_to_string(path) {
        Ok(content) => match inspect(&content) {
            Ok(message) => (CheckStatus::Ok, message),
            Err(message) => (CheckStatus::Error, message),
        },
        Err(e) => (CheckStatus::Error, format!("Cannot read {}: {}", path.display(), e)),
    };

    DoctorCheck {
        name: name.to_string(),
        status,
        message,
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), PantomimeCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One record per sensor tick:");
                println!();
                println!("- schema_version: \"{}\"", SCHEMA_VERSION);
                println!("- timestamp: RFC 3339 UTC sensor time");
                println!("- tick_id: optional, echoed in the report");
                println!("- skeletons: candidate skeletons, each with");
                println!("  - tracking_state: not_tracked | position_only | tracked");
                println!("  - position: {{ x, y, z }} body centre");
                println!("  - joints: [{{ joint, position, quality }}]");
                println!("- display: {{ width, height }} of the display surface");
                println!("- regions: [{{ id, bounds }}] where bounds is");
                println!("  - {{ shape: rect, x, y, width, height }}");
                println!("  - {{ shape: ellipse, cx, cy, rx, ry }}");
                println!();
                println!("The tracked skeleton nearest the sensor is processed; none means skeleton lost.");
                println!("Regions: ScanBarcode, BicepCurlBox, LateralRaiseBox, LaunchDashboard, FinishWorkout");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", REPORT_VERSION);
                println!();
                println!("Each report contains:");
                println!();
                println!("- report_version: Schema version ({})", REPORT_VERSION);
                println!("- producer: {{ name, version, instance_id }}");
                println!("- tick_id, observed_at_utc, computed_at_utc");
                println!("- phase: log_in | start_screen | exercise | summary");
                println!("- exercise: bicep_curl | lateral_raise | null");
                println!("- rep_count, set_count");
                println!("- skeleton_tracked");
                println!("- angles: {{ right_elbow, right_shoulder, left_elbow, left_shoulder }} (null = unknown)");
                println!("- cursor: {{ x, y }} | null");
                println!("- visible_regions: region ids shown in this phase");
                println!("- cues: [{{ angle, degrees }}]");
                println!("- events: phase_changed | rep_completed | effect");
            }
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<&Path>) -> Result<(), PantomimeCliError> {
    let config = load_config(config_path)?;
    println!("{}", config.to_json()?);
    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, PantomimeCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_records(input: &str, format: &InputFormat) -> Result<Vec<TickRecord>, PantomimeCliError> {
    let records = match format {
        InputFormat::Ndjson => TickAdapter::parse_ndjson(input)?,
        InputFormat::Json => TickAdapter::parse_array(input)?,
    };
    Ok(records)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, PantomimeCliError> {
    match path {
        Some(path) => Ok(PipelineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn build_processor(
    config_path: Option<&Path>,
    load_state: Option<&Path>,
) -> Result<TickProcessor, PantomimeCliError> {
    let mut processor = TickProcessor::with_config(load_config(config_path)?)?;

    if let Some(state_path) = load_state {
        processor.load_state(&fs::read_to_string(state_path)?)?;
        tracing::debug!(phase = processor.phase().as_str(), "session state loaded");
    }

    Ok(processor)
}

fn format_output(reports: &[FrameReport], format: &OutputFormat) -> Result<String, PantomimeCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for report in reports {
                lines.push(serde_json::to_string(report)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(reports)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(reports)? + "\n"),
    }
}

fn get_input_json_schema() -> String {
    let point = serde_json::json!({
        "type": "object",
        "required": ["x", "y", "z"],
        "properties": {
            "x": { "type": "number" },
            "y": { "type": "number" },
            "z": { "type": "number" }
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "Pantomime per-tick skeleton and UI input",
        "type": "object",
        "required": ["schema_version", "timestamp", "display"],
        "properties": {
            "schema_version": { "type": "string", "const": SCHEMA_VERSION },
            "timestamp": { "type": "string", "format": "date-time" },
            "tick_id": { "type": "string" },
            "skeletons": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["tracking_state", "position"],
                    "properties": {
                        "tracking_state": {
                            "type": "string",
                            "enum": ["not_tracked", "position_only", "tracked"]
                        },
                        "position": point,
                        "joints": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["joint", "position", "quality"],
                                "properties": {
                                    "joint": { "type": "string" },
                                    "position": point,
                                    "quality": {
                                        "type": "string",
                                        "enum": ["not_tracked", "inferred", "tracked"]
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "display": {
                "type": "object",
                "required": ["width", "height"],
                "properties": {
                    "width": { "type": "number", "exclusiveMinimum": 0 },
                    "height": { "type": "number", "exclusiveMinimum": 0 }
                }
            },
            "regions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["id", "bounds"],
                    "properties": {
                        "id": {
                            "type": "string",
                            "enum": ["ScanBarcode", "BicepCurlBox", "LateralRaiseBox", "LaunchDashboard", "FinishWorkout"]
                        },
                        "bounds": {
                            "type": "object",
                            "required": ["shape"],
                            "properties": {
                                "shape": { "type": "string", "enum": ["rect", "ellipse"] }
                            }
                        }
                    }
                }
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let angle = serde_json::json!({ "type": ["integer", "null"], "minimum": 0, "maximum": 180 });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": REPORT_VERSION,
        "description": "Pantomime per-tick report",
        "type": "object",
        "required": ["report_version", "producer", "observed_at_utc", "computed_at_utc", "phase", "rep_count", "set_count"],
        "properties": {
            "report_version": { "type": "string", "const": REPORT_VERSION },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "tick_id": { "type": "string" },
            "observed_at_utc": { "type": "string" },
            "computed_at_utc": { "type": "string" },
            "phase": { "type": "string", "enum": ["log_in", "start_screen", "exercise", "summary"] },
            "exercise": { "type": ["string", "null"], "enum": ["bicep_curl", "lateral_raise", null] },
            "rep_count": { "type": "integer", "minimum": 0 },
            "set_count": { "type": "integer", "minimum": 0 },
            "skeleton_tracked": { "type": "boolean" },
            "angles": {
                "type": ["object", "null"],
                "properties": {
                    "right_elbow": angle,
                    "right_shoulder": angle,
                    "left_elbow": angle,
                    "left_shoulder": angle
                }
            },
            "cursor": { "type": ["object", "null"] },
            "visible_regions": { "type": "array", "items": { "type": "string" } },
            "cues": { "type": "array", "items": { "type": "object" } },
            "events": { "type": "array", "items": { "type": "object" } }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum PantomimeCliError {
    Io(io::Error),
    Tracking(TrackingError),
    Json(serde_json::Error),
    NoTicks,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for PantomimeCliError {
    fn from(e: io::Error) -> Self {
        PantomimeCliError::Io(e)
    }
}

impl From<TrackingError> for PantomimeCliError {
    fn from(e: TrackingError) -> Self {
        PantomimeCliError::Tracking(e)
    }
}

impl From<serde_json::Error> for PantomimeCliError {
    fn from(e: serde_json::Error) -> Self {
        PantomimeCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PantomimeCliError> for CliError {
    fn from(e: PantomimeCliError) -> Self {
        match e {
            PantomimeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PantomimeCliError::Tracking(e @ TrackingError::InvalidConfig(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'pantomime config' to see a valid configuration".to_string()),
            },
            PantomimeCliError::Tracking(e @ TrackingError::InvalidTick(_)) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'pantomime validate' for details".to_string()),
            },
            PantomimeCliError::Tracking(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches {} schema", SCHEMA_VERSION)),
            },
            PantomimeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PantomimeCliError::NoTicks => CliError {
                code: "NO_TICKS".to_string(),
                message: "No tick records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PantomimeCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} ticks failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            PantomimeCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_ticks: usize,
    valid_ticks: usize,
    invalid_ticks: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    tick_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

impl DoctorCheck {
    fn ok(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message,
        }
    }
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
