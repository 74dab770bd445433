//! Directory listing with platform artifacts filtered out.
//!
//! Every operation that enumerates a directory goes through [`list_files`],
//! so the rule for which entries count as data lives in one place.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::AnnoprepError;

/// File names written by operating systems and file browsers.
const PLATFORM_ARTIFACTS: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// Returns true for entries that are never part of a dataset.
///
/// Covers the known platform artifacts and any dot-file (which also hides
/// the renumbering lock file).
pub fn is_platform_artifact(name: &str) -> bool {
    name.starts_with('.')
        || PLATFORM_ARTIFACTS
            .iter()
            .any(|artifact| artifact.eq_ignore_ascii_case(name))
}

/// List the regular-file names in `dir`, sorted, excluding platform artifacts.
///
/// Sub-directories and dangling symlinks are skipped. Names that are not valid UTF-8 are reported
/// as a [`AnnoprepError::FilenameParse`] because no later stage could match
/// them against a target name.
pub fn list_files(dir: &Path) -> Result<Vec<String>, AnnoprepError> {
    if !dir.is_dir() {
        return Err(AnnoprepError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(AnnoprepError::Io)? {
        let entry = entry.map_err(AnnoprepError::Io)?;
        let raw_name = entry.file_name();
        let name = raw_name
            .to_str()
            .ok_or_else(|| AnnoprepError::FilenameParse {
                dir: dir.to_path_buf(),
                file: raw_name.to_string_lossy().into_owned(),
                message: "file name is not valid UTF-8".to_string(),
            })?
            .to_owned();

        if is_platform_artifact(&name) {
            debug!("ignoring platform artifact {}", name);
            continue;
        }

        // Follows symlinks: a link to an image counts as that image.
        if !entry.path().is_file() {
            debug!("ignoring non-file entry {}", name);
            continue;
        }

        names.push(name);
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifacts_are_recognised() {
        assert!(is_platform_artifact(".DS_Store"));
        assert!(is_platform_artifact("thumbs.db"));
        assert!(is_platform_artifact(".annoprep.lock"));
        assert!(!is_platform_artifact("1.jpg"));
    }

    #[test]
    fn list_files_skips_artifacts_and_directories() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("2.jpg"), b"b").expect("write file");
        fs::write(temp.path().join("1.jpg"), b"a").expect("write file");
        fs::write(temp.path().join(".DS_Store"), b"").expect("write artifact");
        fs::create_dir(temp.path().join("nested")).expect("create dir");

        let names = list_files(temp.path()).expect("list");
        assert_eq!(names, vec!["1.jpg".to_string(), "2.jpg".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn list_files_counts_symlinked_files() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let target = tempfile::tempdir().expect("create target dir");
        fs::write(target.path().join("real.jpg"), b"x").expect("write target");
        fs::write(temp.path().join("1.jpg"), b"a").expect("write file");
        std::os::unix::fs::symlink(target.path().join("real.jpg"), temp.path().join("2.jpg"))
            .expect("symlink");
        std::os::unix::fs::symlink(target.path().join("gone.jpg"), temp.path().join("3.jpg"))
            .expect("dangling symlink");

        let names = list_files(temp.path()).expect("list");
        assert_eq!(names, vec!["1.jpg".to_string(), "2.jpg".to_string()]);
    }

    #[test]
    fn list_files_rejects_missing_directory() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let missing = temp.path().join("missing");
        assert!(matches!(
            list_files(&missing),
            Err(AnnoprepError::NotADirectory { .. })
        ));
    }
}
