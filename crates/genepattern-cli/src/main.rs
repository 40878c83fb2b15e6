// crates/genepattern-cli/src/main.rs
// ============================================================================
// Module: GenePattern CLI Entry Point
// Description: Command dispatcher over the client, formats, and modules crates.
// Purpose: Query a configured server, inspect tables, and issue module LSIDs.
// Dependencies: clap, genepattern-client, genepattern-config, genepattern-formats,
//               genepattern-modules, thiserror, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! `genepattern` is a thin command-line front-end. Remote subcommands build a
//! [`Connection`] from the TOML configuration; `inspect` works offline on a
//! path, URL, or inline table; `lsid` drives the local identifier authority.
//! Results go to stdout, diagnostics go to stderr through `tracing`, and
//! failures exit non-zero.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use genepattern_client::ClientError;
use genepattern_client::Connection;
use genepattern_client::Job;
use genepattern_client::JobPhase;
use genepattern_client::ParamDescriptor;
use genepattern_config::ConfigError;
use genepattern_config::GenePatternConfig;
use genepattern_formats::FormatError;
use genepattern_formats::Gct;
use genepattern_formats::Odf;
use genepattern_formats::TableSource;
use genepattern_modules::IdentifierAuthority;
use genepattern_modules::ModuleError;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of jobs listed by `recent`.
const DEFAULT_RECENT_COUNT: usize = 10;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "genepattern", version, disable_help_subcommand = true)]
struct Cli {
    /// Configuration file (overrides `GENEPATTERN_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the server's system message.
    Message,
    /// List every task the server offers.
    Tasks,
    /// Show a task's parameters.
    Task(TaskCommand),
    /// Show the status and outputs of a job.
    Job(JobCommand),
    /// List the current user's most recent jobs.
    Recent(RecentCommand),
    /// Block until every listed job finishes.
    Wait(WaitCommand),
    /// Upload a local file as job input.
    Upload(UploadCommand),
    /// Download one output file of a job.
    Download(DownloadCommand),
    /// Report the shape of a GCT or ODF table.
    Inspect(InspectCommand),
    /// Show or register the next module LSID.
    Lsid(LsidCommand),
}

/// Arguments for `task`.
#[derive(Args, Debug)]
struct TaskCommand {
    /// Task name or LSID.
    id: String,
    /// Fetch and list the values of choice parameters.
    #[arg(long)]
    choices: bool,
}

/// Arguments for `job`.
#[derive(Args, Debug)]
struct JobCommand {
    /// Job id.
    id: u64,
}

/// Arguments for `recent`.
#[derive(Args, Debug)]
struct RecentCommand {
    /// Number of jobs to list.
    #[arg(short = 'n', long = "count", default_value_t = DEFAULT_RECENT_COUNT)]
    count: usize,
}

/// Arguments for `wait`.
#[derive(Args, Debug)]
struct WaitCommand {
    /// Job ids to wait for.
    #[arg(required = true)]
    ids: Vec<u64>,
}

/// Arguments for `upload`.
#[derive(Args, Debug)]
struct UploadCommand {
    /// Name the file is stored under on the server.
    name: String,
    /// Local file to upload.
    path: PathBuf,
}

/// Arguments for `download`.
#[derive(Args, Debug)]
struct DownloadCommand {
    /// Job id.
    job: u64,
    /// Output file name.
    file: String,
    /// Destination file or directory.
    dest: PathBuf,
}

/// Arguments for `inspect`.
#[derive(Args, Debug)]
struct InspectCommand {
    /// Path, URL, or inline table text.
    source: String,
    /// Table format; inferred from the extension when omitted.
    #[arg(long, value_enum)]
    format: Option<TableFormat>,
}

/// Arguments for `lsid`.
#[derive(Args, Debug)]
struct LsidCommand {
    /// Register the next LSID for this module name.
    #[arg(long, value_name = "NAME")]
    register: Option<String>,
}

/// Table formats understood by `inspect`.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum TableFormat {
    /// GCT expression matrix.
    Gct,
    /// ODF annotated table.
    Odf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying the message shown to the user.
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

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::new(format!("configuration error: {err}"))
    }
}

impl From<FormatError> for CliError {
    fn from(err: FormatError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<ModuleError> for CliError {
    fn from(err: ModuleError) -> Self {
        Self::new(err.to_string())
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

/// Parses arguments and dispatches the selected command.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_tracing();
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Message => command_message(config),
        Commands::Tasks => command_tasks(config),
        Commands::Task(command) => command_task(config, &command),
        Commands::Job(command) => command_job(config, &command),
        Commands::Recent(command) => command_recent(config, &command),
        Commands::Wait(command) => command_wait(config, &command),
        Commands::Upload(command) => command_upload(config, &command),
        Commands::Download(command) => command_download(config, &command),
        Commands::Inspect(command) => command_inspect(&command),
        Commands::Lsid(command) => command_lsid(config, &command),
    }
}

/// Installs the stderr subscriber filtered by `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Loads the configuration and opens a connection.
fn connect(config_path: Option<&Path>) -> CliResult<Connection> {
    let config = GenePatternConfig::load(config_path)?;
    Ok(Connection::from_config(&config)?)
}

// ============================================================================
// SECTION: Server Commands
// ============================================================================

/// Executes `message`.
fn command_message(config: Option<&Path>) -> CliResult<ExitCode> {
    let connection = connect(config)?;
    emit_line(connection.system_message()?.trim_end())?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `tasks`.
fn command_tasks(config: Option<&Path>) -> CliResult<ExitCode> {
    let connection = connect(config)?;
    for task in connection.get_task_list()? {
        emit_line(&format!("{}\t{}", task.lsid().unwrap_or_default(), task.name().unwrap_or_default()))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `task`.
fn command_task(config: Option<&Path>, command: &TaskCommand) -> CliResult<ExitCode> {
    let connection = connect(config)?;
    let mut task = connection.get_task(&command.id);
    task.param_load()?;
    emit_line(&format!("{} ({})", task.name().unwrap_or_else(|| task.id()), task.lsid().unwrap_or_default()))?;
    if let Some(version) = task.version() {
        emit_line(&format!("version: {version}"))?;
    }
    let names: Vec<String> = task.parameters().iter().map(|param| param.name().to_string()).collect();
    for name in names {
        let Some(param) = task.parameter_mut(&name) else {
            continue;
        };
        emit_line(&param_line(param))?;
        if command.choices && param.is_choice_param() {
            for choice in param.choices()? {
                emit_line(&format!("  {}\t{}", choice.value, choice.label))?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `job`.
fn command_job(config: Option<&Path>, command: &JobCommand) -> CliResult<ExitCode> {
    let connection = connect(config)?;
    let mut job = connection.get_job(command.id);
    job.get_info()?;
    emit_line(&format!("job {}: {}", job.id(), phase_label(job.phase())))?;
    if let Some(task) = job.task_name()? {
        emit_line(&format!("task: {task}"))?;
    }
    if let Some(submitted) = job.date_submitted()? {
        emit_line(&format!("submitted: {submitted}"))?;
    }
    if let Some(message) = job.status_message()? {
        emit_line(&format!("status: {message}"))?;
    }
    for file in job.get_output_files()? {
        emit_line(&format!("output: {}\t{}", file.get_name(), file.url()))?;
    }
    for child in job.children()? {
        emit_line(&format!("child: {}", child.id()))?;
    }
    emit_line(&format!("page: {}", job.status_url()))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `recent`.
fn command_recent(config: Option<&Path>, command: &RecentCommand) -> CliResult<ExitCode> {
    let connection = connect(config)?;
    for mut job in connection.get_recent_jobs(command.count)? {
        let task = job.task_name()?.unwrap_or_default();
        emit_line(&format!("{}\t{}\t{task}", job.id(), phase_label(job.phase())))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `wait`; exits non-zero when any job finished with an error.
fn command_wait(config: Option<&Path>, command: &WaitCommand) -> CliResult<ExitCode> {
    let connection = connect(config)?;
    let mut jobs: Vec<Job> = command.ids.iter().map(|id| connection.get_job(*id)).collect();
    connection.wait_until_complete(&mut jobs)?;
    let mut failed = false;
    for job in &jobs {
        let phase = job.phase();
        failed |= phase == JobPhase::FinishedError;
        emit_line(&format!("{}\t{}", job.id(), phase_label(phase)))?;
    }
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Executes `upload`.
fn command_upload(config: Option<&Path>, command: &UploadCommand) -> CliResult<ExitCode> {
    let connection = connect(config)?;
    let file = connection
        .upload_file(&command.name, &command.path)
        .ok_or_else(|| CliError::new(format!("upload of {} failed", command.path.display())))?;
    emit_line(file.url())?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `download`.
fn command_download(config: Option<&Path>, command: &DownloadCommand) -> CliResult<ExitCode> {
    let connection = connect(config)?;
    let mut job = connection.get_job(command.job);
    let file = job
        .get_file(&command.file)?
        .ok_or_else(|| CliError::new(format!("job {} has no output file {}", command.job, command.file)))?;
    let bytes = file.read_bytes()?;
    let dest = download_target(&command.dest, &file.get_name());
    write_file_atomic(&dest, &bytes)?;
    emit_line(&format!("{} bytes written to {}", bytes.len(), dest.display()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Offline Commands
// ============================================================================

/// Executes `inspect`.
fn command_inspect(command: &InspectCommand) -> CliResult<ExitCode> {
    emit_line(&inspect_source(&command.source, command.format)?)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `lsid`.
fn command_lsid(config: Option<&Path>, command: &LsidCommand) -> CliResult<ExitCode> {
    let mut authority = open_authority(config)?;
    let lsid = authority.lsid();
    if let Some(name) = &command.register {
        authority.register(&lsid, name)?;
    }
    emit_line(&lsid)?;
    Ok(ExitCode::SUCCESS)
}

/// Opens the authority named by the configuration, or the per-user default
/// when no configuration file was given and none loads.
fn open_authority(config_path: Option<&Path>) -> CliResult<IdentifierAuthority> {
    match GenePatternConfig::load(config_path) {
        Ok(config) => Ok(IdentifierAuthority::from_config(&config.modules)?),
        Err(err) if config_path.is_none() => {
            debug!(error = %err, "no usable configuration; using default authority");
            Ok(IdentifierAuthority::open_default()?)
        }
        Err(err) => Err(err.into()),
    }
}

/// Parses `source` with the selected or inferred codec and describes it.
fn inspect_source(source: &str, format: Option<TableFormat>) -> CliResult<String> {
    let format = match format {
        Some(format) => format,
        None => infer_format(source)?,
    };
    let table = TableSource::resolve(source)?;
    Ok(match format {
        TableFormat::Gct => describe_gct(&Gct::read(table)?),
        TableFormat::Odf => describe_odf(&Odf::read(table)?),
    })
}

/// Picks a codec from the source's extension, ignoring any query or fragment.
fn infer_format(source: &str) -> CliResult<TableFormat> {
    let trimmed = source.split(['?', '#']).next().unwrap_or_default();
    let extension = Path::new(trimmed).extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    if extension.eq_ignore_ascii_case("gct") {
        Ok(TableFormat::Gct)
    } else if extension.eq_ignore_ascii_case("odf") {
        Ok(TableFormat::Odf)
    } else {
        Err(CliError::new("cannot infer table format; pass --format gct or --format odf".to_string()))
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Lower-case label for a job phase.
const fn phase_label(phase: JobPhase) -> &'static str {
    match phase {
        JobPhase::Unloaded => "unloaded",
        JobPhase::Pending => "pending",
        JobPhase::Running => "running",
        JobPhase::FinishedOk => "finished",
        JobPhase::FinishedError => "error",
    }
}

/// One tab-separated line describing a task parameter.
fn param_line(param: &ParamDescriptor) -> String {
    let required = if param.is_optional() { "optional" } else { "required" };
    let arity = if param.allow_multiple() { "multiple" } else { "single" };
    let mut line = format!("{}\t{}\t{required}\t{arity}\t{}", param.name(), param.kind(), param.description());
    if let Some(default) = param.default_value() {
        line.push_str(&format!(" [default: {default}]"));
    }
    line
}

/// Shape summary of a GCT matrix.
fn describe_gct(gct: &Gct) -> String {
    let [name_label, description_label] = gct.key_labels();
    format!(
        "GCT {}: {} rows x {} samples (keys: {name_label}, {description_label})",
        gct.version(),
        gct.row_count(),
        gct.col_count()
    )
}

/// Shape summary of an ODF table.
fn describe_odf(odf: &Odf) -> String {
    let mut summary = format!("{}: {} rows x {} columns", odf.version(), odf.row_count(), odf.col_count());
    if let Some(model) = odf.model() {
        summary.push_str(&format!(" (model: {model})"));
    }
    if !odf.column_names().is_empty() {
        summary.push_str(&format!("\ncolumns: {}", odf.column_names().join(", ")));
    }
    summary
}

// ============================================================================
// SECTION: File Output
// ============================================================================

/// Resolves a download destination; directories receive the remote file name.
fn download_target(dest: &Path, remote_name: &str) -> PathBuf {
    if dest.is_dir() { dest.join(remote_name) } else { dest.to_path_buf() }
}

/// Writes `bytes` to `path` through a synced temporary file and a rename.
fn write_file_atomic(path: &Path, bytes: &[u8]) -> CliResult<()> {
    let io_error = |err: std::io::Error| CliError::new(format!("cannot write {}: {err}", path.display()));
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let temp_path = path.with_extension("part");
    let mut file =
        fs::OpenOptions::new().create(true).write(true).truncate(true).open(&temp_path).map_err(io_error)?;
    file.write_all(bytes).map_err(io_error)?;
    file.sync_all().map_err(io_error)?;
    fs::rename(&temp_path, path).map_err(io_error)?;
    Ok(())
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout, mapping failures to [`CliError`].
fn emit_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

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

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
