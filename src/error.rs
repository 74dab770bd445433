use std::path::PathBuf;
use thiserror::Error;

use crate::annotation::FlattenReport;
use crate::sequence::RenumberReport;

/// The main error type for annoprep operations.
#[derive(Debug, Error)]
pub enum AnnoprepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot interpret file name '{file}' in {dir}: {message}")]
    FilenameParse {
        dir: PathBuf,
        file: String,
        message: String,
    },

    #[error("Failed to parse annotation {path}: {message}")]
    AnnotationParse { path: PathBuf, message: String },

    #[error("Malformed annotation {path}: {message}")]
    AnnotationStructure { path: PathBuf, message: String },

    #[error("Flattening {dir} failed: {failed_files} annotation file(s) could not be used")]
    FlattenFailed {
        dir: PathBuf,
        failed_files: usize,
        report: FlattenReport,
    },

    #[error("Refusing to rename '{from}' to '{to}' in {dir}: target already exists")]
    RenameCollision {
        dir: PathBuf,
        from: String,
        to: String,
    },

    #[error("Invalid rename plan for {dir}: {message}")]
    InvalidRenamePlan { dir: PathBuf, message: String },

    #[error("Renumbering {dir} failed: {}", .report.failure_summary())]
    RenumberFailed {
        dir: PathBuf,
        report: Box<RenumberReport>,
    },

    #[error("File names in {dir} are not consecutive integers from {start}")]
    NotContiguous { dir: PathBuf, start: u64 },

    #[error("Directory {path} is locked by another annoprep process")]
    DirectoryLocked { path: PathBuf },

    #[error("Input directory not found or not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Invalid split parameters: {message}")]
    InvalidSplitParams { message: String },

    #[error("Failed to write CSV to {path}: {source}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Refusing to overwrite existing artifact {path} (pass --overwrite to replace it)")]
    ArtifactExists { path: PathBuf },

    #[error("Failed to parse Label Studio JSON from {path}: {source}")]
    LabelStudioJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Failed to serialize report: {0}")]
    ReportJson(#[source] serde_json::Error),

    #[error("Unsupported output format: {0}")]
    UnsupportedOutput(String),
}
