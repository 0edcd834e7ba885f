// crates/policy-cli/src/main.rs
// ============================================================================
// Module: Policy CLI Entry Point
// Description: Command dispatcher for offline policy conversion and validation.
// Purpose: Convert, validate, and review policy documents from local files.
// Dependencies: clap, policy-api, policy-config, policy-conversion, serde_yaml, thiserror.
// ============================================================================

//! ## Overview
//! `policyctl` runs the conversion library against files on disk:
//! - `convert` converts one policy document to a served version;
//! - `validate` reports structural findings and exits non-zero when any exist;
//! - `review` answers a `ConversionReview` document exactly as a webhook would;
//! - `fields` prints the static field mapping table;
//! - `config validate` checks a configuration file.
//!
//! Inputs are untrusted: every read is bounded and documents are decoded
//! into the typed schemas before any conversion runs.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use policy_api::ApiVersion;
use policy_api::FieldErrorList;
use policy_api::VersionedPolicy;
use policy_api::validate_policy;
use policy_config::PolicyConversionConfig;
use policy_conversion::ConversionAuditSink;
use policy_conversion::ConversionReview;
use policy_conversion::Converter;
use policy_conversion::ReviewHandler;
use policy_conversion::ValidationAuditEvent;
use policy_conversion::ValidationAuditEventParams;
use policy_conversion::mapper::FieldMapping;
use policy_conversion::mapper::field_mappings;
use policy_conversion::sink_from_config;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a single policy document read from disk.
const MAX_POLICY_BYTES: usize = 4 * 1024 * 1024;
/// Maximum size of a conversion review read from disk.
const MAX_REVIEW_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "policyctl", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (falls back to `POLICY_CONVERSION_CONFIG`, then
    /// `policy-conversion.toml`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a policy document to another served version.
    Convert(ConvertCommand),
    /// Report structural findings for a policy document.
    Validate(ValidateCommand),
    /// Answer a `ConversionReview` document.
    Review(ReviewCommand),
    /// Print the field mapping table.
    Fields(FieldsCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a policy conversion configuration file.
    Validate,
}

/// Arguments for policy conversion.
#[derive(Args, Debug)]
struct ConvertCommand {
    /// Path to the policy document.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Target version (`v1`, `v2`, or a full `group/version`).
    #[arg(long, value_name = "VERSION")]
    to: String,
    /// Input format (defaults to the file extension).
    #[arg(long, value_enum)]
    input_format: Option<DocumentFormat>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = DocumentFormat::Json)]
    output_format: DocumentFormat,
    /// Optional output path (defaults to stdout).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

/// Arguments for policy validation.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// Path to the policy document.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Input format (defaults to the file extension).
    #[arg(long, value_enum)]
    input_format: Option<DocumentFormat>,
}

/// Arguments for review handling.
#[derive(Args, Debug)]
struct ReviewCommand {
    /// Path to the `ConversionReview` JSON document.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
}

/// Arguments for the field table.
#[derive(Args, Debug)]
struct FieldsCommand {
    /// Output format.
    #[arg(long, value_enum, default_value_t = TableFormat::Text)]
    format: TableFormat,
    /// Only list fields that require manual conversion.
    #[arg(long)]
    manual_only: bool,
}

/// Policy document encodings.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DocumentFormat {
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

/// Field table encodings.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TableFormat {
    /// Aligned text columns.
    Text,
    /// JSON array.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(command) => command_convert(cli.config.as_deref(), &command),
        Commands::Validate(command) => command_validate(cli.config.as_deref(), &command),
        Commands::Review(command) => command_review(cli.config.as_deref(), &command),
        Commands::Fields(command) => command_fields(&command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate => command_config_validate(cli.config.as_deref()),
        },
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `convert` command.
fn command_convert(config: Option<&Path>, command: &ConvertCommand) -> CliResult<ExitCode> {
    let config = load_config(config)?;
    let converter = Converter::from_config(&config.conversion)
        .map_err(|err| CliError::new(format!("invalid config: {err}")))?;
    let target = parse_target_version(&command.to)?;
    let document = read_document(&command.input, command.input_format)?;
    let converted = convert_document(&converter, document, target)?;
    let rendered = render_document(&converted, command.output_format)?;
    if let Some(output) = &command.output {
        fs::write(output, rendered.as_bytes()).map_err(|err| {
            CliError::new(format!("failed to write {}: {err}", output.display()))
        })?;
        write_stdout_line(&format!("wrote {}", output.display()))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    } else {
        write_stdout_line(rendered.trim_end())
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `validate` command.
fn command_validate(config: Option<&Path>, command: &ValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(config)?;
    let audit = sink_from_config(&config.audit)
        .map_err(|err| CliError::new(format!("failed to open audit sink: {err}")))?;
    let document = read_document(&command.input, command.input_format)?;
    let policy = VersionedPolicy::from_value(document)
        .map_err(|err| CliError::new(format!("failed to decode policy: {err}")))?;
    let findings = validate_document(&policy, &config, audit.as_ref());
    for finding in &findings {
        write_stdout_line(&finding.to_string())
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    if findings.is_empty() {
        write_stdout_line(&format!("policy {} is valid", policy.metadata().name))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Executes the `review` command.
fn command_review(config: Option<&Path>, command: &ReviewCommand) -> CliResult<ExitCode> {
    let config = load_config(config)?;
    let audit = sink_from_config(&config.audit)
        .map_err(|err| CliError::new(format!("failed to open audit sink: {err}")))?;
    let handler = ReviewHandler::from_config(&config, audit)
        .map_err(|err| CliError::new(format!("invalid config: {err}")))?;
    let bytes = read_input_bytes(&command.input, MAX_REVIEW_BYTES)?;
    let review: ConversionReview = serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("failed to decode review: {err}")))?;
    let response = handler.handle(&review).map_err(|err| CliError::new(err.to_string()))?;
    let rendered = serde_json::to_string_pretty(&response)
        .map_err(|err| CliError::new(format!("failed to encode review: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    let success = response.response.is_some_and(|response| response.result.is_success());
    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Executes the `fields` command.
fn command_fields(command: &FieldsCommand) -> CliResult<ExitCode> {
    let rows: Vec<&FieldMapping> = field_mappings()
        .iter()
        .filter(|row| !command.manual_only || row.note.is_some())
        .collect();
    let rendered = match command.format {
        TableFormat::Text => render_field_table(&rows),
        TableFormat::Json => serde_json::to_string_pretty(&rows)
            .map_err(|err| CliError::new(format!("failed to encode field table: {err}")))?,
    };
    write_stdout_line(rendered.trim_end())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the config validation command.
fn command_config_validate(config: Option<&Path>) -> CliResult<ExitCode> {
    let _config = PolicyConversionConfig::load(config)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line("config is valid")
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Command Helpers
// ============================================================================

/// Loads the config from the flag, the environment, or the default file.
///
/// Built-in defaults apply only when none of those sources exists.
fn load_config(path: Option<&Path>) -> CliResult<PolicyConversionConfig> {
    PolicyConversionConfig::load_or_default(path)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Parses a target version given as `v1`, `v2`, or a full `group/version`.
fn parse_target_version(raw: &str) -> CliResult<ApiVersion> {
    let trimmed = raw.trim();
    ApiVersion::parse(trimmed)
        .or_else(|| ApiVersion::parse_short(trimmed))
        .ok_or_else(|| CliError::new(format!("unsupported target version: {trimmed}")))
}

/// Converts a decoded document to `target` and renders it back to JSON.
fn convert_document(
    converter: &Converter,
    document: Value,
    target: ApiVersion,
) -> CliResult<Value> {
    let policy = VersionedPolicy::from_value(document)
        .map_err(|err| CliError::new(format!("failed to decode policy: {err}")))?;
    let conversion = converter
        .convert(&policy, target)
        .map_err(|err| CliError::new(format!("conversion failed: {err}")))?;
    conversion
        .policy
        .to_value()
        .map_err(|err| CliError::new(format!("failed to render policy: {err}")))
}

/// Validates a policy and records the outcome on the audit sink.
fn validate_document(
    policy: &VersionedPolicy,
    config: &PolicyConversionConfig,
    audit: &dyn ConversionAuditSink,
) -> FieldErrorList {
    let scope = config.validation.resource_scope();
    let findings = validate_policy(policy, &scope);
    let metadata = policy.metadata();
    audit.record_validation(&ValidationAuditEvent::new(ValidationAuditEventParams {
        api_version: policy.api_version().as_str().to_string(),
        name: metadata.name.clone(),
        namespace: metadata.namespace.clone(),
        findings: findings.iter().map(ToString::to_string).collect(),
    }));
    findings
}

/// Renders the field table as aligned text columns.
fn render_field_table(rows: &[&FieldMapping]) -> String {
    let hub_width = rows.iter().filter_map(|row| row.hub).map(str::len).max().unwrap_or(0).max(3);
    let spoke_width =
        rows.iter().filter_map(|row| row.spoke).map(str::len).max().unwrap_or(0).max(5);
    let mut output = format!("{:hub_width$}  {:spoke_width$}  {:10}  NOTE\n", "HUB", "SPOKE", "CLASS");
    for row in rows {
        let line = format!(
            "{:hub_width$}  {:spoke_width$}  {:10}  {}",
            row.hub.unwrap_or("-"),
            row.spoke.unwrap_or("-"),
            row.class.as_str(),
            row.note.unwrap_or("")
        );
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}

// ============================================================================
// SECTION: Document IO
// ============================================================================

/// Reads an input file, refusing anything larger than `max_bytes`.
///
/// The size is checked before reading and again on the bytes read, so a file
/// that grows in between is still refused.
fn read_input_bytes(path: &Path, max_bytes: usize) -> CliResult<Vec<u8>> {
    let too_large = |size: u64| {
        CliError::new(format!(
            "{} is {size} bytes, exceeding the {max_bytes} byte limit",
            path.display()
        ))
    };
    let read_failed =
        |err: std::io::Error| CliError::new(format!("failed to read {}: {err}", path.display()));
    let file = File::open(path).map_err(read_failed)?;
    let declared = file.metadata().map_err(read_failed)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if declared > limit {
        return Err(too_large(declared));
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(read_failed)?;
    if bytes.len() > max_bytes {
        return Err(too_large(u64::try_from(bytes.len()).unwrap_or(u64::MAX)));
    }
    Ok(bytes)
}

/// Resolves a document format from the flag or the file extension.
fn resolve_format(path: &Path, format: Option<DocumentFormat>) -> DocumentFormat {
    if let Some(format) = format {
        return format;
    }
    match path.extension().and_then(|extension| extension.to_str()) {
        Some(extension)
            if extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml") =>
        {
            DocumentFormat::Yaml
        }
        _ => DocumentFormat::Json,
    }
}

/// Decodes document text in the given format.
fn decode_document(text: &str, format: DocumentFormat) -> CliResult<Value> {
    match format {
        DocumentFormat::Json => serde_json::from_str(text)
            .map_err(|err| CliError::new(format!("invalid JSON document: {err}"))),
        DocumentFormat::Yaml => serde_yaml::from_str(text)
            .map_err(|err| CliError::new(format!("invalid YAML document: {err}"))),
    }
}

/// Reads and decodes a policy document.
fn read_document(path: &Path, format: Option<DocumentFormat>) -> CliResult<Value> {
    let bytes = read_input_bytes(path, MAX_POLICY_BYTES)?;
    let text = String::from_utf8(bytes)
        .map_err(|err| CliError::new(format!("{} is not utf-8: {err}", path.display())))?;
    decode_document(&text, resolve_format(path, format))
}

/// Renders a document in the given format.
fn render_document<T: Serialize>(value: &T, format: DocumentFormat) -> CliResult<String> {
    match format {
        DocumentFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|err| CliError::new(format!("failed to encode JSON: {err}"))),
        DocumentFormat::Yaml => serde_yaml::to_string(value)
            .map_err(|err| CliError::new(format!("failed to encode YAML: {err}"))),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
