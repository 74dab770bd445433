use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::annotation::{count_objects_str, has_annotation_extension};
use crate::error::AnnoprepError;
use crate::listing::list_files;

/// Images annotated with more than one object.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OverlabelReport {
    pub directory: PathBuf,
    pub files_checked: usize,
    /// `<filename>` of each over-labelled image (the annotation file name
    /// when that element is missing), in file order.
    pub overlabeled: Vec<String>,
}

/// Scan every `.xml` file in `dir` and list images with more than one
/// `<object>`.
///
/// Only `<object>` elements are counted, so files with incomplete boxes are
/// still audited. XML that is not well-formed fails the scan.
pub fn find_overlabeled(dir: &Path) -> Result<OverlabelReport, AnnoprepError> {
    let mut report = OverlabelReport {
        directory: dir.to_path_buf(),
        ..Default::default()
    };

    for name in list_files(dir)? {
        if !has_annotation_extension(&name) {
            continue;
        }

        let path = dir.join(&name);
        let xml = fs::read_to_string(&path).map_err(AnnoprepError::Io)?;
        let count = count_objects_str(&xml, &path)?;
        report.files_checked += 1;
        if count.objects > 1 {
            debug!("{}: {} objects", name, count.objects);
            report.overlabeled.push(count.filename.unwrap_or(name));
        }
    }

    Ok(report)
}

impl fmt::Display for OverlabelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} of {} annotation file(s) have more than one object",
            self.overlabeled.len(),
            self.files_checked
        )?;
        for filename in &self.overlabeled {
            writeln!(f, "  {}", filename)?;
        }
        Ok(())
    }
}
