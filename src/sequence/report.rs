//! Renumbering reports.
//!
//! Once renames have landed on disk a renumbering run no longer returns
//! `Err` for a broken post-condition; the outcome is captured here so the
//! caller sees exactly which invariant broke.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{file_name_for, Rename, RenamePlan, RenumberOptions};

/// Result of a renumbering run.
#[derive(Clone, Debug, Serialize)]
pub struct RenumberReport {
    pub directory: PathBuf,
    pub start: u64,
    pub extension: String,
    pub file_count_before: usize,
    pub file_count_after: usize,
    /// Whether the directory was contiguous when the report was taken.
    pub contiguous: bool,
    pub renames: Vec<Rename>,
    pub outcome: RenumberOutcome,
}

/// Numbering of a directory relative to a start index.
#[derive(Clone, Debug, Serialize)]
pub struct ContiguityReport {
    pub directory: PathBuf,
    pub start: u64,
    pub extension: String,
    pub file_count: usize,
    pub contiguous: bool,
    /// Numbers in `start..start+file_count` with no file.
    pub missing: Vec<u64>,
    /// Numbers present but outside `start..start+file_count`.
    pub out_of_range: Vec<u64>,
    /// Numbers carried by more than one file (e.g. `1.jpg` and `01.jpg`).
    pub duplicates: Vec<u64>,
}

impl fmt::Display for ContiguityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} file(s) in {} are consecutive integers from {}: {}",
            self.file_count,
            self.directory.display(),
            self.start,
            if self.contiguous { "yes" } else { "no" }
        )?;

        for (label, numbers) in [
            ("missing", &self.missing),
            ("out of range", &self.out_of_range),
            ("duplicated", &self.duplicates),
        ] {
            if !numbers.is_empty() {
                let listed: Vec<String> = numbers.iter().map(ToString::to_string).collect();
                writeln!(f, "  {}: {}", label, listed.join(", "))?;
            }
        }

        Ok(())
    }
}

/// Final verdict of a renumbering run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenumberOutcome {
    /// Dry run: the plan was computed but not applied.
    Planned,
    /// File count unchanged and the directory is contiguous.
    Success,
    /// At least one post-condition does not hold.
    Failed { issues: Vec<ConsistencyIssue> },
}

/// A post-condition that did not hold after renaming.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyIssue {
    FileCountChanged { before: usize, after: usize },
    NotContiguous { start: u64 },
}

impl RenumberReport {
    pub(crate) fn planned(
        dir: &Path,
        opts: &RenumberOptions,
        file_count: usize,
        contiguous: bool,
        plan: RenamePlan,
    ) -> Self {
        Self {
            directory: dir.to_path_buf(),
            start: opts.start,
            extension: opts.extension.clone(),
            file_count_before: file_count,
            file_count_after: file_count,
            contiguous,
            renames: plan.into_renames(),
            outcome: RenumberOutcome::Planned,
        }
    }

    pub(crate) fn verified(
        dir: &Path,
        opts: &RenumberOptions,
        file_count_before: usize,
        file_count_after: usize,
        contiguous: bool,
        plan: RenamePlan,
    ) -> Self {
        let mut issues = Vec::new();
        if file_count_before != file_count_after {
            issues.push(ConsistencyIssue::FileCountChanged {
                before: file_count_before,
                after: file_count_after,
            });
        }
        if !contiguous {
            issues.push(ConsistencyIssue::NotContiguous { start: opts.start });
        }

        let outcome = if issues.is_empty() {
            RenumberOutcome::Success
        } else {
            RenumberOutcome::Failed { issues }
        };

        Self {
            directory: dir.to_path_buf(),
            start: opts.start,
            extension: opts.extension.clone(),
            file_count_before,
            file_count_after,
            contiguous,
            renames: plan.into_renames(),
            outcome,
        }
    }

    /// True when the renames were applied and every post-condition holds.
    pub fn is_success(&self) -> bool {
        self.outcome == RenumberOutcome::Success
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RenumberOutcome::Failed { .. })
    }

    /// The broken invariants joined into one line.
    pub fn failure_summary(&self) -> String {
        match &self.outcome {
            RenumberOutcome::Failed { issues } => issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
            _ => "no failures".to_string(),
        }
    }
}

impl fmt::Display for RenumberOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenumberOutcome::Planned => write!(f, "PLANNED"),
            RenumberOutcome::Success => write!(f, "SUCCESS"),
            RenumberOutcome::Failed { .. } => write!(f, "FAILED"),
        }
    }
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyIssue::FileCountChanged { before, after } => write!(
                f,
                "file count changed from {} to {} ({} lost)",
                before,
                after,
                before.saturating_sub(*after)
            ),
            ConsistencyIssue::NotContiguous { start } => {
                write!(f, "file names are not consecutive integers from {}", start)
            }
        }
    }
}

impl fmt::Display for RenumberReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.outcome == RenumberOutcome::Planned {
            "Would rename"
        } else {
            "Renamed"
        };

        writeln!(
            f,
            "{} {} of {} file(s) in {}",
            verb,
            self.renames.len(),
            self.file_count_before,
            self.directory.display()
        )?;

        for rename in &self.renames {
            writeln!(f, "  {} -> {}", rename.from, rename.to)?;
        }

        if self.outcome != RenumberOutcome::Planned {
            writeln!(
                f,
                "File count: {} before, {} after",
                self.file_count_before, self.file_count_after
            )?;
        }

        writeln!(
            f,
            "Consecutive from {} ({}...): {}",
            self.start,
            file_name_for(self.start, &self.extension),
            if self.contiguous { "yes" } else { "no" }
        )?;

        if let RenumberOutcome::Failed { issues } = &self.outcome {
            for issue in issues {
                writeln!(f, "  - {}", issue)?;
            }
        }

        writeln!(f, "Result: {}", self.outcome)
    }
}
