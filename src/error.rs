use serde::Serialize;
use thiserror::Error;

/// Patterns (lowercase) that indicate sensitive data not safe for display.
/// Used by `contains_sensitive()` for case-insensitive matching.
pub(crate) const SENSITIVE_PATTERNS: &[&str] = &["key=", "api_key", "x-goog-api-key", "bearer "];

/// Returns true if the message contains any sensitive pattern (case-insensitive).
fn contains_sensitive(msg: &str) -> bool {
    let lower = msg.to_ascii_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Sanitizes a message for display.
/// If sensitive content is detected, returns the fallback instead.
fn sanitize_message(msg: &str, fallback: &str) -> String {
    if contains_sensitive(msg) {
        fallback.into()
    } else {
        msg.to_string()
    }
}

/// User-friendly error presentation printed by the command line.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPresentation {
    pub title: String,
    pub message: String,
    pub action: Option<String>,
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Configuration ─────────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown encoding label: {0}")]
    UnknownEncoding(String),

    // ── Encoding ──────────────────────────────────────────────────────────────
    #[error("File is not valid {encoding}: {path}")]
    Decode { path: String, encoding: String },

    #[error("Encoding conversion failed: {0}")]
    Conversion(String),

    // ── File / CSV ────────────────────────────────────────────────────────────
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid CSV: {0}")]
    CsvInvalid(String),

    #[error("CSV write error: {0}")]
    CsvWrite(String),

    // ── Translation ───────────────────────────────────────────────────────────
    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Translation service returned {got} results for {expected} texts")]
    TranslationMismatch { expected: usize, got: usize },

    // ── Network ───────────────────────────────────────────────────────────────
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Converts the error into a user-friendly presentation.
    /// Never leaks API keys.
    pub fn to_presentation(&self) -> ErrorPresentation {
        match self {
            // ── Configuration ─────────────────────────────────────────────────
            AppError::Config(msg) => ErrorPresentation {
                title: "Invalid Arguments".into(),
                message: sanitize_message(msg, "The command line arguments are invalid."),
                action: Some("Check the arguments with --help".into()),
            },

            AppError::UnknownEncoding(label) => ErrorPresentation {
                title: "Unknown Encoding".into(),
                message: format!("'{}' is not a recognised encoding label.", label),
                action: Some("Use a label such as utf-8, gbk, shift_jis or windows-1252".into()),
            },

            // ── Encoding ──────────────────────────────────────────────────────
            AppError::Decode { path, encoding } => ErrorPresentation {
                title: "Invalid File Encoding".into(),
                message: format!("{} could not be decoded as {}.", path, encoding),
                action: Some("Pass the correct encoding with --source-encoding".into()),
            },

            AppError::Conversion(msg) => ErrorPresentation {
                title: "Conversion Failed".into(),
                message: format!("The file could not be converted to UTF-8: {}", msg),
                action: Some("Check that the input file is readable".into()),
            },

            // ── File / CSV ────────────────────────────────────────────────────
            AppError::FileNotFound(path) => ErrorPresentation {
                title: "File Not Found".into(),
                message: format!("{} does not exist.", path),
                action: Some("Check the path and try again".into()),
            },

            AppError::CsvInvalid(msg) => ErrorPresentation {
                title: "Invalid CSV".into(),
                message: format!("The CSV file has a formatting problem: {}", msg),
                action: Some("Fix the CSV file and try again".into()),
            },

            AppError::CsvWrite(msg) => ErrorPresentation {
                title: "Write Failed".into(),
                message: format!("The output file could not be written: {}", msg),
                action: Some("Check the output directory permissions".into()),
            },

            // ── Translation ───────────────────────────────────────────────────
            AppError::Translation(msg) => ErrorPresentation {
                title: "Translation Error".into(),
                message: sanitize_message(msg, "The translation service returned an error."),
                action: None,
            },

            AppError::TranslationMismatch { expected, got } => ErrorPresentation {
                title: "Translation Error".into(),
                message: format!(
                    "The translation service answered {} texts with {} results.",
                    expected, got
                ),
                action: None,
            },

            // ── Network ───────────────────────────────────────────────────────
            AppError::ConnectionFailed(_) => ErrorPresentation {
                title: "Connection Failed".into(),
                message: "Could not reach the translation service. Please check your internet connection.".into(),
                action: Some("Check network and retry".into()),
            },

            // ── Generic ───────────────────────────────────────────────────────
            AppError::Internal(_) => ErrorPresentation {
                title: "Unexpected Error".into(),
                message: "Something went wrong. Please try again.".into(),
                action: Some("Try again".into()),
            },
        }
    }
}
