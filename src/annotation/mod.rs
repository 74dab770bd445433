//! Flattening Pascal VOC annotations into a row-per-box table.
//!
//! Each annotation file describes one image (`<filename>`, `<size>`) and
//! zero or more `<object>` boxes. Flattening emits one [`AnnotationRecord`]
//! per box with the image fields repeated on every row, so a file with no
//! objects contributes nothing and a file with `M` objects contributes `M`
//! rows.
//!
//! Two normalizations run on every row:
//!
//! - provenance prefixes (`batch3-17.jpg` -> `17.jpg`) are stripped from the
//!   string fields, see [`strip_provenance_prefix`];
//! - the label is mapped through the closed [`LABEL_CODES`] table.

mod parse;
mod report;

pub use parse::{
    count_objects_str, from_annotation_xml_slice, parse_annotation_file, parse_annotation_str,
    parse_int_value, ObjectCount, ParsedAnnotation, ParsedObject,
};
pub use report::{FlattenIssue, FlattenReport, IssueCode, Severity};

use std::fmt;
use std::path::Path;

use log::{debug, info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::AnnoprepError;
use crate::listing::list_files;

const ANNOTATION_EXTENSION: &str = "xml";

/// Integer codes for the known label names.
pub const LABEL_CODES: &[(&str, u8)] = &[("Negative", 1), ("Positive", 2)];

/// Column order of the flat table.
pub const COLUMNS: [&str; 9] = [
    "label", "filename", "width", "height", "depth", "xmin", "ymin", "xmax", "ymax",
];

/// A label after remapping.
///
/// Serializes as the bare code or the bare source string, so unmapped
/// labels stay visible in the table instead of being coerced.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Label {
    Code(u8),
    Unmapped(String),
}

impl Label {
    /// Map a (prefix-stripped) label name through [`LABEL_CODES`].
    pub fn from_name(name: &str) -> Self {
        LABEL_CODES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|&(_, code)| Label::Code(code))
            .unwrap_or_else(|| Label::Unmapped(name.to_string()))
    }

    pub fn code(&self) -> Option<u8> {
        match self {
            Label::Code(code) => Some(*code),
            Label::Unmapped(_) => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Code(code) => write!(f, "{}", code),
            Label::Unmapped(name) => write!(f, "{}", name),
        }
    }
}

/// One bounding box with its image fields. Field order is the column order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AnnotationRecord {
    pub label: Label,
    pub filename: String,
    pub width: i64,
    pub height: i64,
    pub depth: i64,
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

/// What to do with files that cannot be flattened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MalformedFilePolicy {
    /// Fail the whole run, emitting no table, if any file is malformed.
    #[default]
    Abort,
    /// Exclude malformed files and keep the rest.
    Skip,
}

impl fmt::Display for MalformedFilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedFilePolicy::Abort => write!(f, "abort"),
            MalformedFilePolicy::Skip => write!(f, "skip"),
        }
    }
}

/// What to do with labels outside [`LABEL_CODES`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedLabelPolicy {
    /// Keep the label text in the table and warn.
    #[default]
    Passthrough,
    /// Treat the file carrying the label as malformed.
    Reject,
}

/// Flattening options.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlattenOptions {
    pub malformed: MalformedFilePolicy,
    pub unmapped_labels: UnmappedLabelPolicy,
}

/// Rows plus the report describing how they were obtained.
#[derive(Clone, Debug)]
pub struct FlattenOutput {
    pub records: Vec<AnnotationRecord>,
    pub report: FlattenReport,
}

/// Strip everything up to and including the last `-`.
///
/// Annotation tools tag exported names with a provenance prefix such as
/// `a1b2c3-17.jpg`; the bare name is what follows the final dash.
pub fn strip_provenance_prefix(value: &str) -> &str {
    value
        .rsplit_once('-')
        .map(|(_, rest)| rest)
        .unwrap_or(value)
}

/// Turn one parsed file into table rows.
pub fn annotation_to_records(parsed: &ParsedAnnotation) -> Vec<AnnotationRecord> {
    let filename = strip_provenance_prefix(&parsed.filename).to_string();

    parsed
        .objects
        .iter()
        .map(|object| AnnotationRecord {
            label: Label::from_name(strip_provenance_prefix(&object.name)),
            filename: filename.clone(),
            width: parsed.width,
            height: parsed.height,
            depth: parsed.depth,
            xmin: object.xmin,
            ymin: object.ymin,
            xmax: object.xmax,
            ymax: object.ymax,
        })
        .collect()
}

/// Flatten every annotation file in `dir` into one table.
///
/// Files are visited in name order. Under [`MalformedFilePolicy::Abort`] any
/// error fails the run with [`AnnoprepError::FlattenFailed`], carrying the
/// full report; under [`MalformedFilePolicy::Skip`] the affected files are
/// left out and listed in the returned report.
pub fn flatten(dir: &Path, opts: &FlattenOptions) -> Result<FlattenOutput, AnnoprepError> {
    let names = list_files(dir)?;
    warn_about_nested_annotations(dir);

    let mut report = FlattenReport::new(dir, opts.malformed);
    let mut records = Vec::new();

    for name in names {
        if !has_annotation_extension(&name) {
            report.add(FlattenIssue::warning(
                IssueCode::NotAnnotationFile,
                &name,
                "not an .xml file; skipped",
            ));
            continue;
        }

        report.files_seen += 1;
        let parsed = match parse_annotation_file(&dir.join(&name)) {
            Ok(parsed) => parsed,
            Err(err) => {
                report.add(FlattenIssue::from_error(&name, &err));
                continue;
            }
        };

        let rows = annotation_to_records(&parsed);
        if !check_labels(&name, &rows, opts.unmapped_labels, &mut report) {
            continue;
        }

        debug!("{}: {} row(s)", name, rows.len());
        report.files_used += 1;
        report.rows += rows.len();
        records.extend(rows);
    }

    let failed_files = report.failed_files().len();
    if failed_files > 0 {
        match opts.malformed {
            MalformedFilePolicy::Abort => {
                return Err(AnnoprepError::FlattenFailed {
                    dir: dir.to_path_buf(),
                    failed_files,
                    report,
                });
            }
            MalformedFilePolicy::Skip => {
                warn!(
                    "excluded {} malformed annotation file(s) from {}",
                    failed_files,
                    dir.display()
                );
            }
        }
    }

    info!(
        "flattened {} row(s) from {} file(s) in {}",
        report.rows,
        report.files_used,
        dir.display()
    );

    Ok(FlattenOutput { records, report })
}

/// Record unmapped labels; returns false when the file must be excluded.
fn check_labels(
    file: &str,
    rows: &[AnnotationRecord],
    policy: UnmappedLabelPolicy,
    report: &mut FlattenReport,
) -> bool {
    let mut accepted = true;

    for row in rows {
        if let Label::Unmapped(name) = &row.label {
            let message = format!("label '{}' has no integer code", name);
            match policy {
                UnmappedLabelPolicy::Passthrough => {
                    warn!("{}: {}", file, message);
                    report.add(FlattenIssue::warning(IssueCode::UnmappedLabel, file, message));
                }
                UnmappedLabelPolicy::Reject => {
                    report.add(FlattenIssue::error(IssueCode::UnmappedLabel, file, message));
                    accepted = false;
                }
            }
        }
    }

    accepted
}

/// Warn about `.xml` files below the top level, which are never read.
///
/// Advisory only: traversal errors are logged and skipped.
fn warn_about_nested_annotations(dir: &Path) -> usize {
    let mut nested = 0usize;
    let mut sample = None;

    for entry in WalkDir::new(dir).follow_links(true).min_depth(2) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping nested entry under {}: {}", dir.display(), err);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() && has_annotation_extension(&name) {
            nested += 1;
            sample.get_or_insert_with(|| entry.path().display().to_string());
        }
    }

    if let Some(sample) = sample {
        warn!(
            "annotation directory is read flat; skipping {} nested .xml file(s), e.g. {}",
            nested, sample
        );
    }

    nested
}

pub(crate) fn has_annotation_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(ANNOTATION_EXTENSION))
        .unwrap_or(false)
}
