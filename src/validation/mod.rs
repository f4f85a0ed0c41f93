//! Validation of the intermediate UTF-8 CSV before it is loaded.

pub mod csv_validator;

pub use csv_validator::{
    validate, CsvValidationError, CsvValidationResult, CsvValidationStats, CsvValidationWarning,
    LineEndings, VALIDATION_SAMPLE_SIZE,
};
