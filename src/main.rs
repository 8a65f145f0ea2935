// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record};

use subtrans::app_config::{AppConfig, LogLevel, TranslateMode};
use subtrans::app_controller::Controller;

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

/// CLI wrapper for TranslateMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslateMode {
    TranslateOnly,
    Bilingual,
}

impl From<CliTranslateMode> for TranslateMode {
    fn from(cli_mode: CliTranslateMode) -> Self {
        match cli_mode {
            CliTranslateMode::TranslateOnly => TranslateMode::TranslateOnly,
            CliTranslateMode::Bilingual => TranslateMode::Bilingual,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate subtitle files using AI providers (default command)
    #[command(alias = "translate")]
    Translate(TranslateArgs),

    /// Generate shell completions for subtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input subtitle file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output directory (defaults to next to each input file)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Resume an interrupted job from the stored session
    #[arg(short, long)]
    resume: bool,

    /// Source language code (e.g. 'en', 'auto')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g. 'fr', 'zh')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Output mode
    #[arg(short, long, value_enum)]
    mode: Option<CliTranslateMode>,

    /// Model name to use for translation
    #[arg(long)]
    model: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "subtrans.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
#[command(name = "subtrans", version, about = "Batch subtitle translation with AI providers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Minimal stderr logger that stays out of the progress bar's way.
struct CliLogger;

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let prefix = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let _ = writeln!(std::io::stderr(), "[{}] {}", prefix, record.args());
    }

    fn flush(&self) {}
}

static LOGGER: CliLogger = CliLogger;

fn init_logger(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => {
            let mut config = AppConfig::from_file_or_default(&args.config_path)?;

            if let Some(source) = args.source_language {
                config.source_language = source;
            }
            if let Some(target) = args.target_language {
                config.target_language = target;
            }
            if let Some(mode) = args.mode {
                config.mode = mode.into();
            }
            if let Some(model) = args.model {
                config.provider.model = model;
            }
            if let Some(level) = args.log_level {
                config.log_level = level.into();
            }

            init_logger(config.log_level.to_level_filter());

            let controller = Controller::with_config(config)?;
            controller
                .run(args.input_path, args.output_dir, args.force_overwrite, args.resume)
                .await
        }
    }
}
