//! Command-line configuration.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::error::AppError;
use crate::translation::client::{LoggingMode, DEFAULT_TIMEOUT_SECS};
use crate::translation::{DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG};

/// Suffix appended to a source column name to name its translation.
pub const DEFAULT_SUFFIX: &str = "_translated";

/// Intermediate UTF-8 file, relative to the working directory.
pub const DEFAULT_TEMP_FILE: &str = "temp_utf8.csv";

/// Re-encode a CSV file to UTF-8 and translate selected columns.
#[derive(Debug, Parser)]
#[command(name = "csv-translate", version, about)]
pub struct Cli {
    /// Input CSV file, any encoding.
    #[arg(short, long, default_value = "HUAWEI-WLAN-DEVICE-MIB.csv")]
    pub input: PathBuf,

    /// Output CSV file, written as UTF-8 with BOM.
    #[arg(short, long, default_value = "HUAWEI-WLAN-DEVICE-MIB-CN.csv")]
    pub output: PathBuf,

    /// Columns to translate, comma separated or repeated.
    #[arg(
        short,
        long = "columns",
        value_delimiter = ',',
        default_value = "OBJECT_DESCRIPTION"
    )]
    pub columns: Vec<String>,

    /// Source language code.
    #[arg(short, long, default_value = DEFAULT_SOURCE_LANG)]
    pub source_lang: String,

    /// Target language code.
    #[arg(short, long, default_value = DEFAULT_TARGET_LANG)]
    pub target_lang: String,

    /// Input encoding label (e.g. gbk, shift_jis); skips detection.
    #[arg(long)]
    pub source_encoding: Option<String>,

    /// Where to write the intermediate UTF-8 copy.
    #[arg(long, default_value = DEFAULT_TEMP_FILE)]
    pub temp_file: PathBuf,

    /// Suffix for translated column names.
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,

    /// Delete the intermediate file after a successful run.
    #[arg(long)]
    pub remove_temp: bool,

    /// Cloud Translation API key; without one the public web endpoint is used.
    #[arg(long, env = "GOOGLE_TRANSLATE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Override the translation service base URL.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub columns: Vec<String>,
    pub options: RunOptions,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub timeout: Duration,
    /// Request URLs carry their redacted query at debug level and below.
    pub logging_mode: LoggingMode,
}

/// Pipeline knobs that don't name files or the service.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source_lang: String,
    pub target_lang: String,
    pub source_encoding: Option<String>,
    pub temp_file: PathBuf,
    pub suffix: String,
    pub keep_temp: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            source_lang: DEFAULT_SOURCE_LANG.to_string(),
            target_lang: DEFAULT_TARGET_LANG.to_string(),
            source_encoding: None,
            temp_file: PathBuf::from(DEFAULT_TEMP_FILE),
            suffix: DEFAULT_SUFFIX.to_string(),
            keep_temp: true,
        }
    }
}

/// Compares two paths as typed, ignoring `.` components such as a leading `./`.
pub(crate) fn same_path(a: &Path, b: &Path) -> bool {
    let significant = |p: &Path| -> Vec<PathBuf> {
        p.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .map(|c| PathBuf::from(c.as_os_str()))
            .collect()
    };
    significant(a) == significant(b)
}

fn logging_mode_for(level: &str) -> LoggingMode {
    match level.trim().to_ascii_lowercase().as_str() {
        "debug" | "trace" => LoggingMode::PathAndQueryRedacted,
        _ => LoggingMode::PathOnly,
    }
}

impl TryFrom<Cli> for RunConfig {
    type Error = AppError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let columns: Vec<String> = cli
            .columns
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if columns.is_empty() {
            return Err(AppError::Config("at least one column is required".into()));
        }
        if cli.suffix.is_empty() {
            return Err(AppError::Config(
                "suffix must not be empty, it would overwrite the source column".into(),
            ));
        }
        if cli.source_lang.trim().is_empty() || cli.target_lang.trim().is_empty() {
            return Err(AppError::Config("language codes must not be empty".into()));
        }
        if cli.timeout_secs == 0 {
            return Err(AppError::Config("timeout must be at least 1 second".into()));
        }
        if same_path(&cli.input, &cli.output) {
            return Err(AppError::Config(
                "output path must differ from the input path".into(),
            ));
        }
        if same_path(&cli.temp_file, &cli.input) || same_path(&cli.temp_file, &cli.output) {
            return Err(AppError::Config(
                "temp file must differ from the input and output paths".into(),
            ));
        }
        let logging_mode = logging_mode_for(&cli.log_level);

        Ok(Self {
            input: cli.input,
            output: cli.output,
            columns,
            options: RunOptions {
                source_lang: cli.source_lang.trim().to_string(),
                target_lang: cli.target_lang.trim().to_string(),
                source_encoding: cli.source_encoding,
                temp_file: cli.temp_file,
                suffix: cli.suffix,
                keep_temp: !cli.remove_temp,
            },
            api_key: cli.api_key,
            endpoint: cli.endpoint,
            timeout: Duration::from_secs(cli.timeout_secs),
            logging_mode,
        })
    }
}
