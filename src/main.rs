// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use epubtrans::app_config::{Config, LogLevel};
use epubtrans::client::CancelToken;
use epubtrans::document::memory::MemoryDocument;
use epubtrans::language_utils::get_language_name;
use epubtrans::orchestrator::{Orchestrator, RunOutcome};
use epubtrans::session::mock::MockSession;

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a document or a directory of documents (default command)
    #[command(alias = "translate")]
    Translate(TranslateArgs),

    /// Generate shell completions for epubtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input text file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Source language (name or code, e.g. 'en', 'english')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language (name or code, e.g. 'fr', 'french')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Run the pipeline against the built-in echo backend instead of a
    /// live translation session
    #[arg(long)]
    dry_run: bool,
}

/// epubtrans - resumable document translation pipeline
///
/// Translates the text content of documents through an external translation
/// service, checkpointing every translated line so interrupted runs resume
/// where they left off.
#[derive(Parser, Debug)]
#[command(name = "epubtrans")]
#[command(version = "1.0.0")]
#[command(about = "Resumable document translation pipeline")]
#[command(long_about = "epubtrans translates the text content of documents through an external
translation service, persisting every translated line in a local SQLite
checkpoint so interrupted runs resume where they left off.

EXAMPLES:
    epubtrans --dry-run book.txt                # Rehearse the pipeline on one file
    epubtrans --dry-run -t es book.txt          # Override the target language
    epubtrans --dry-run -f book.txt             # Overwrite an existing output
    epubtrans --dry-run --log-level debug docs/ # Process a directory, verbose
    epubtrans completions bash > epubtrans.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a
    different file with --config-path. If the file doesn't exist, a default
    one is created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input text file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Source language (name or code, e.g. 'en', 'english')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language (name or code, e.g. 'fr', 'french')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Run the pipeline against the built-in echo backend instead of a
    /// live translation session
    #[arg(long)]
    dry_run: bool,
}

struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let color = Self::color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {}\x1B[0m", color, now, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default;
    // the level is updated after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "epubtrans", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            // Default behavior - use top-level args
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

            run_translate(TranslateArgs {
                input_path,
                force_overwrite: cli.force_overwrite,
                source_language: cli.source_language,
                target_language: cli.target_language,
                config_path: cli.config_path,
                log_level: cli.log_level,
                dry_run: cli.dry_run,
            })
            .await
        }
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = Path::new(&options.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!(
            "Config file not found at '{}', creating default config.",
            options.config_path
        );
        let config = Config::default();
        config.save(config_path)?;
        config
    };

    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    info!(
        "Translating from {} to {}",
        get_language_name(&config.source_language)?,
        get_language_name(&config.target_language)?
    );

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    if !options.dry_run {
        return Err(anyhow!(
            "No live translation backend is bundled in this build; \
             use --dry-run to exercise the pipeline with the echo backend"
        ));
    }

    // Ctrl-C requests a graceful stop; progress stays checkpointed
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Stop requested, halting after the current chunk");
                cancel.cancel();
            }
        });
    }

    if options.input_path.is_file() {
        translate_file(&options.input_path, &config, options.force_overwrite, &cancel).await
    } else if options.input_path.is_dir() {
        translate_folder(&options.input_path, &config, options.force_overwrite, &cancel).await
    } else {
        Err(anyhow!("Input path does not exist: {:?}", options.input_path))
    }
}

async fn translate_file(
    input_file: &Path,
    config: &Config,
    force_overwrite: bool,
    cancel: &CancelToken,
) -> Result<()> {
    let output_file = output_path_for(input_file);
    if output_file.exists() && !force_overwrite {
        warn!(
            "Output file already exists: {:?}. Use -f to force overwrite.",
            output_file
        );
        return Ok(());
    }

    info!("Translating: {:?}", input_file);

    let text = std::fs::read_to_string(input_file)
        .with_context(|| format!("Failed to read input file: {:?}", input_file))?;
    let name = input_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let mut document = MemoryDocument::from_text(&name, &name, &text);
    let orchestrator = Orchestrator::from_config(config, MockSession::echo())?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}%")
            .expect("progress bar template")
            .progress_chars("##-"),
    );

    let outcome = orchestrator
        .translate_document(
            &mut document,
            &output_file,
            |percent| bar.set_position(percent as u64),
            cancel,
        )
        .await?;
    bar.finish_and_clear();

    match outcome {
        RunOutcome::Completed => {
            info!("Success: {:?}", output_file);
            Ok(())
        }
        RunOutcome::StoppedByUser => {
            warn!("Run stopped; progress is checkpointed and will resume");
            Ok(())
        }
        RunOutcome::Failed(reason) => Err(anyhow!("Translation run failed: {}", reason)),
    }
}

async fn translate_folder(
    input_dir: &Path,
    config: &Config,
    force_overwrite: bool,
    cancel: &CancelToken,
) -> Result<()> {
    info!("Processing directory: {:?}", input_dir);

    let mut processed_count = 0;
    for entry in walkdir::WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_dir() || !is_text_file(path) {
            continue;
        }
        if cancel.is_cancelled() {
            warn!("Stop requested, leaving remaining files unprocessed");
            break;
        }

        if let Err(e) = translate_file(path, config, force_overwrite, cancel).await {
            log::error!("Error processing {:?}: {}", path, e);
        } else {
            processed_count += 1;
        }
    }

    info!("Finished processing {} files", processed_count);
    Ok(())
}

fn is_text_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("txt") | Some("md")
    )
}

fn output_path_for(input_file: &Path) -> PathBuf {
    let stem = input_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input_file.with_file_name(format!("{}.translated.json", stem))
}
