//! Contiguous integer numbering of image directories.
//!
//! A directory is *contiguous from `start`* when its files are named
//! `start.ext`, `start+1.ext`, ... with no gaps and no duplicates. This module
//! checks that property and restores it after files were added or removed.
//!
//! Renumbering is split into three phases so the filesystem is never touched
//! with an unvalidated plan:
//!
//! 1. [`RenamePlan::compute`] parses the listed names and pairs every
//!    misplaced file with a free target slot.
//! 2. [`RenamePlan::apply`] renames in place. Free slots never coincide with
//!    an existing name, so no rename can clobber another file.
//! 3. The post-condition (same file count, contiguous) is re-checked from
//!    disk and recorded in a [`RenumberReport`].

mod lock;
mod plan;
mod report;

pub use lock::{DirLock, LOCK_FILE_NAME};
pub use plan::{Rename, RenamePlan};
pub use report::{ConsistencyIssue, ContiguityReport, RenumberOutcome, RenumberReport};

use std::collections::BTreeSet;
use std::path::Path;

use log::info;

use crate::error::AnnoprepError;
use crate::listing::list_files;

/// Extension used when none is configured.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Options for [`renumber`].
#[derive(Clone, Debug)]
pub struct RenumberOptions {
    /// First number of the sequence.
    pub start: u64,
    /// Extension every file must carry, without the leading dot.
    pub extension: String,
    /// Compute and report the plan without renaming anything.
    pub dry_run: bool,
}

impl Default for RenumberOptions {
    fn default() -> Self {
        Self {
            start: 1,
            extension: DEFAULT_EXTENSION.to_string(),
            dry_run: false,
        }
    }
}

/// Parse the integer stem of `name`, which must be `<digits>.<extension>`.
///
/// The extension is matched case-sensitively: on case-insensitive
/// filesystems `3.JPG` and `3.jpg` are the same file, and treating them as
/// different names could make a rename overwrite data.
pub fn parse_stem(dir: &Path, name: &str, extension: &str) -> Result<u64, AnnoprepError> {
    let parse_error = |message: String| AnnoprepError::FilenameParse {
        dir: dir.to_path_buf(),
        file: name.to_string(),
        message,
    };

    let stem = name
        .strip_suffix(extension)
        .and_then(|rest| rest.strip_suffix('.'))
        .ok_or_else(|| parse_error(format!("expected a '.{extension}' file")))?;

    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return Err(parse_error(format!(
            "stem '{stem}' is not a non-negative integer"
        )));
    }

    stem.parse::<u64>()
        .map_err(|source| parse_error(format!("stem '{stem}' is out of range: {source}")))
}

/// Canonical file name for sequence number `index`.
pub fn file_name_for(index: u64, extension: &str) -> String {
    format!("{index}.{extension}")
}

/// Inspect the numbering of `dir` against `start`.
///
/// Fails with [`AnnoprepError::FilenameParse`] on the first file whose name
/// is not an integer with the expected extension.
pub fn check_contiguity(
    dir: &Path,
    start: u64,
    extension: &str,
) -> Result<ContiguityReport, AnnoprepError> {
    let names = list_files(dir)?;
    let mut numbers = names
        .iter()
        .map(|name| parse_stem(dir, name, extension))
        .collect::<Result<Vec<_>, _>>()?;
    numbers.sort_unstable();

    let contiguous = is_run_from(&numbers, start);
    let end = start.saturating_add(numbers.len() as u64);
    let present: BTreeSet<u64> = numbers.iter().copied().collect();

    let missing = (start..end)
        .filter(|number| !present.contains(number))
        .collect();
    let out_of_range = present
        .iter()
        .copied()
        .filter(|number| !(start..end).contains(number))
        .collect();
    let duplicates = numbers
        .windows(2)
        .filter(|pair| pair[0] == pair[1])
        .map(|pair| pair[0])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    Ok(ContiguityReport {
        directory: dir.to_path_buf(),
        start,
        extension: extension.to_string(),
        file_count: numbers.len(),
        contiguous,
        missing,
        out_of_range,
        duplicates,
    })
}

/// Check whether the files in `dir` are numbered exactly `start..start+count`.
///
/// An empty directory is contiguous. Fails like [`check_contiguity`].
pub fn is_contiguous(dir: &Path, start: u64, extension: &str) -> Result<bool, AnnoprepError> {
    Ok(check_contiguity(dir, start, extension)?.contiguous)
}

/// True when sorted `numbers` are exactly `start, start+1, ...`.
fn is_run_from(numbers: &[u64], start: u64) -> bool {
    numbers.iter().enumerate().all(|(offset, &number)| {
        start
            .checked_add(offset as u64)
            .is_some_and(|expected| expected == number)
    })
}

/// Renumber the files in `dir` so they become contiguous from `opts.start`.
///
/// Holds an advisory lock on the directory for the whole plan/apply/verify
/// cycle (not taken for dry runs). A post-condition failure is not an
/// `Err`: the renames are already on disk, so it is reported through
/// [`RenumberReport::outcome`] for the caller to inspect.
pub fn renumber(dir: &Path, opts: &RenumberOptions) -> Result<RenumberReport, AnnoprepError> {
    let _lock = if opts.dry_run {
        None
    } else {
        Some(DirLock::acquire(dir)?)
    };

    let current = list_files(dir)?;
    let file_count_before = current.len();
    let plan = RenamePlan::compute(dir, &current, opts.start, &opts.extension)?;

    if opts.dry_run {
        let contiguous = is_contiguous(dir, opts.start, &opts.extension)?;
        return Ok(RenumberReport::planned(
            dir,
            opts,
            file_count_before,
            contiguous,
            plan,
        ));
    }

    plan.apply(dir)?;

    let file_count_after = list_files(dir)?.len();
    let contiguous = is_contiguous(dir, opts.start, &opts.extension)?;
    let report = RenumberReport::verified(
        dir,
        opts,
        file_count_before,
        file_count_after,
        contiguous,
        plan,
    );

    info!(
        "renumbered {} of {} file(s) in {}: {}",
        report.renames.len(),
        file_count_before,
        dir.display(),
        report.outcome
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_dir(names: &[&str]) -> tempfile::TempDir {
        let temp = tempfile::tempdir().expect("create temp dir");
        for name in names {
            fs::write(temp.path().join(name), name.as_bytes()).expect("write file");
        }
        temp
    }

    #[test]
    fn parse_stem_accepts_integer_names() {
        let dir = Path::new("images");
        assert_eq!(parse_stem(dir, "12.jpg", "jpg").expect("parse"), 12);
        assert_eq!(parse_stem(dir, "007.jpg", "jpg").expect("parse"), 7);
    }

    #[test]
    fn parse_stem_rejects_other_names() {
        let dir = Path::new("images");
        for name in ["a.jpg", ".jpg", "1.JPG", "1.png", "+1.jpg", "1jpg", "-3.jpg"] {
            assert!(
                matches!(
                    parse_stem(dir, name, "jpg"),
                    Err(AnnoprepError::FilenameParse { .. })
                ),
                "{name} should not parse"
            );
        }
    }

    #[test]
    fn contiguity_requires_exact_run() {
        let temp = make_dir(&["3.jpg", "1.jpg", "2.jpg", ".DS_Store"]);
        assert!(is_contiguous(temp.path(), 1, "jpg").expect("check"));
        assert!(!is_contiguous(temp.path(), 0, "jpg").expect("check"));
        assert!(!is_contiguous(temp.path(), 2, "jpg").expect("check"));
    }

    #[test]
    fn contiguity_rejects_gaps_and_duplicates() {
        let gapped = make_dir(&["1.jpg", "3.jpg"]);
        assert!(!is_contiguous(gapped.path(), 1, "jpg").expect("check"));

        let duplicated = make_dir(&["1.jpg", "01.jpg"]);
        assert!(!is_contiguous(duplicated.path(), 1, "jpg").expect("check"));
    }

    #[test]
    fn contiguity_report_names_the_problems() {
        let temp = make_dir(&["1.jpg", "01.jpg", "4.jpg", "9.jpg"]);
        let report = check_contiguity(temp.path(), 1, "jpg").expect("check");
        assert!(!report.contiguous);
        assert_eq!(report.file_count, 4);
        assert_eq!(report.missing, vec![2, 3]);
        assert_eq!(report.out_of_range, vec![9]);
        assert_eq!(report.duplicates, vec![1]);
    }

    #[test]
    fn empty_directory_is_contiguous() {
        let temp = make_dir(&[]);
        assert!(is_contiguous(temp.path(), 5, "jpg").expect("check"));
    }

    #[test]
    fn contiguity_fails_on_non_numeric_name() {
        let temp = make_dir(&["1.jpg", "cover.jpg"]);
        assert!(matches!(
            is_contiguous(temp.path(), 1, "jpg"),
            Err(AnnoprepError::FilenameParse { .. })
        ));
    }

    #[test]
    fn renumber_fills_gaps_from_start() {
        let temp = make_dir(&["2.jpg", "4.jpg", "5.jpg"]);
        let report = renumber(temp.path(), &RenumberOptions::default()).expect("renumber");

        assert!(report.is_success());
        assert_eq!(report.file_count_before, 3);
        assert_eq!(report.file_count_after, 3);

        let names = list_files(temp.path()).expect("list");
        assert_eq!(names, vec!["1.jpg", "2.jpg", "3.jpg"]);
        assert_eq!(fs::read(temp.path().join("2.jpg")).expect("read"), b"2.jpg");
        assert_eq!(fs::read(temp.path().join("1.jpg")).expect("read"), b"4.jpg");
        assert_eq!(fs::read(temp.path().join("3.jpg")).expect("read"), b"5.jpg");
        assert!(temp.path().join(LOCK_FILE_NAME).exists());
        DirLock::acquire(temp.path()).expect("lock released after run");
    }

    #[test]
    fn renumber_is_a_noop_on_contiguous_directory() {
        let temp = make_dir(&["0.jpg", "1.jpg"]);
        let opts = RenumberOptions {
            start: 0,
            ..Default::default()
        };
        let report = renumber(temp.path(), &opts).expect("renumber");
        assert!(report.is_success());
        assert!(report.renames.is_empty());
    }

    #[test]
    fn renumber_aborts_before_renaming_on_bad_name() {
        let temp = make_dir(&["5.jpg", "notes.txt"]);
        let result = renumber(temp.path(), &RenumberOptions::default());
        assert!(matches!(result, Err(AnnoprepError::FilenameParse { .. })));
        assert!(temp.path().join("5.jpg").exists());
        assert!(!temp.path().join("1.jpg").exists());
    }

    #[test]
    fn dry_run_leaves_directory_untouched() {
        let temp = make_dir(&["7.jpg", "9.jpg"]);
        let opts = RenumberOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = renumber(temp.path(), &opts).expect("plan");
        assert_eq!(report.outcome, RenumberOutcome::Planned);
        assert_eq!(report.renames.len(), 2);
        assert!(!report.contiguous);
        assert!(temp.path().join("7.jpg").exists());
        assert!(temp.path().join("9.jpg").exists());
    }

    #[test]
    fn renumber_refuses_locked_directory() {
        let temp = make_dir(&["3.jpg"]);
        let _held = DirLock::acquire(temp.path()).expect("first lock");
        assert!(matches!(
            renumber(temp.path(), &RenumberOptions::default()),
            Err(AnnoprepError::DirectoryLocked { .. })
        ));
    }
}
