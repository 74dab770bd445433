//! Flattening report types.
//!
//! Problems are collected per file across the whole run so that a failed
//! run shows every bad file at once, not just the first.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::MalformedFilePolicy;
use crate::error::AnnoprepError;

/// Summary of one flattening run.
#[derive(Clone, Debug, Serialize)]
pub struct FlattenReport {
    pub directory: PathBuf,
    pub policy: MalformedFilePolicy,
    /// Annotation files examined.
    pub files_seen: usize,
    /// Annotation files whose rows made it into the table.
    pub files_used: usize,
    pub rows: usize,
    pub issues: Vec<FlattenIssue>,
}

impl FlattenReport {
    pub fn new(directory: impl Into<PathBuf>, policy: MalformedFilePolicy) -> Self {
        Self {
            directory: directory.into(),
            policy,
            files_seen: 0,
            files_used: 0,
            rows: 0,
            issues: Vec::new(),
        }
    }

    pub fn add(&mut self, issue: FlattenIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Files that contributed no rows because of an error, deduplicated.
    pub fn failed_files(&self) -> Vec<&str> {
        let failed: BTreeSet<&str> = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| i.file.as_str())
            .collect();
        failed.into_iter().collect()
    }
}

impl fmt::Display for FlattenReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Flattened {} row(s) from {} of {} annotation file(s) in {}",
            self.rows,
            self.files_used,
            self.files_seen,
            self.directory.display()
        )?;

        if self.issues.is_empty() {
            return Ok(());
        }

        writeln!(
            f,
            "{} error(s) and {} warning(s) (malformed files: {}):",
            self.error_count(),
            self.warning_count(),
            self.policy
        )?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A problem found with one file.
#[derive(Clone, Debug, Serialize)]
pub struct FlattenIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub file: String,
    pub message: String,
}

impl FlattenIssue {
    pub fn error(code: IssueCode, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn warning(code: IssueCode, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            file: file.into(),
            message: message.into(),
        }
    }

    /// Classify an error returned while reading `file`.
    pub fn from_error(file: impl Into<String>, err: &AnnoprepError) -> Self {
        let (code, message) = match err {
            AnnoprepError::AnnotationParse { message, .. } => (IssueCode::ParseError, message.clone()),
            AnnoprepError::AnnotationStructure { message, .. } => {
                (IssueCode::StructureError, message.clone())
            }
            other => (IssueCode::ReadError, other.to_string()),
        };
        Self::error(code, file, message)
    }
}

impl fmt::Display for FlattenIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{} [{:?}] {}: {}", prefix, self.code, self.file, self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Stable identifiers for flattening issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// A value could not be interpreted (bad XML, non-numeric field).
    ParseError,
    /// A required element is missing or repeated.
    StructureError,
    /// The file could not be read at all.
    ReadError,
    /// A label outside the known label codes.
    UnmappedLabel,
    /// A file without the `.xml` extension in the annotation directory.
    NotAnnotationFile,
}
