use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Error type covering the different failure cases that can occur while
/// enumerating, reading, or reporting on budget documents.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Wrapper for IO failures such as reading directory entries or metadata.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up while reading `.xlsx` workbooks.
    #[error("Excel read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    /// Errors bubbled up while reading legacy `.xls` workbooks.
    #[error("legacy Excel read error: {0}")]
    XlsRead(#[from] calamine::XlsError),

    /// Raised when a workbook does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a file carries an extension the scanner cannot open.
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(PathBuf),

    /// Raised when the user provides a path that does not exist.
    #[error("input folder not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the input path exists but is not a directory.
    #[error("input path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
