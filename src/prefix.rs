//! Stripping provenance prefixes from paired dataset directories.
//!
//! Export tools often name files `<hash>-<name>`. This renames them to
//! `<name>` in every configured subdirectory (annotations and images by
//! default), using the same rule the flattener applies to table fields.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::annotation::strip_provenance_prefix;
use crate::error::AnnoprepError;
use crate::listing::list_files;
use crate::sequence::Rename;

/// Subdirectories processed when none are configured.
pub const DEFAULT_SUBDIRS: [&str; 2] = ["Annotations", "images"];

/// Prefix stripping options.
#[derive(Clone, Debug)]
pub struct PrefixOptions {
    /// Subdirectories of the dataset root to process.
    pub subdirs: Vec<String>,
    /// Compute and report the renames without applying them.
    pub dry_run: bool,
}

impl Default for PrefixOptions {
    fn default() -> Self {
        Self {
            subdirs: DEFAULT_SUBDIRS.iter().map(|s| s.to_string()).collect(),
            dry_run: false,
        }
    }
}

/// Renames per subdirectory.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PrefixReport {
    pub root: PathBuf,
    pub dry_run: bool,
    pub renames: BTreeMap<String, Vec<Rename>>,
}

impl PrefixReport {
    pub fn rename_count(&self) -> usize {
        self.renames.values().map(Vec::len).sum()
    }
}

/// Strip provenance prefixes from every file in the configured subdirectories.
///
/// Plans for all subdirectories are computed and checked before the first
/// rename: two files stripping to the same name, or a stripped name that is
/// already taken, abort the run untouched.
pub fn strip_prefixes(root: &Path, opts: &PrefixOptions) -> Result<PrefixReport, AnnoprepError> {
    let mut plans = BTreeMap::new();
    for subdir in &opts.subdirs {
        let dir = root.join(subdir);
        plans.insert(subdir.clone(), plan_directory(&dir)?);
    }

    if !opts.dry_run {
        for (subdir, renames) in &plans {
            let dir = root.join(subdir);
            for rename in renames {
                let to = dir.join(&rename.to);
                if fs::symlink_metadata(&to).is_ok() {
                    return Err(AnnoprepError::RenameCollision {
                        dir: dir.clone(),
                        from: rename.from.clone(),
                        to: rename.to.clone(),
                    });
                }
                fs::rename(dir.join(&rename.from), &to).map_err(AnnoprepError::Io)?;
                debug!("{}: {} -> {}", subdir, rename.from, rename.to);
            }
        }
    }

    let report = PrefixReport {
        root: root.to_path_buf(),
        dry_run: opts.dry_run,
        renames: plans,
    };
    info!(
        "stripped prefixes from {} file(s) under {}",
        report.rename_count(),
        root.display()
    );

    Ok(report)
}

fn plan_directory(dir: &Path) -> Result<Vec<Rename>, AnnoprepError> {
    let names = list_files(dir)?;
    let mut claimed: BTreeMap<String, String> = BTreeMap::new();
    let mut renames = Vec::new();

    for name in &names {
        let stripped = strip_provenance_prefix(name);
        if stripped == name.as_str() {
            claimed.insert(name.clone(), name.clone());
        }
    }

    for name in &names {
        let stripped = strip_provenance_prefix(name);
        if stripped == name.as_str() {
            continue;
        }

        if stripped.is_empty() {
            return Err(AnnoprepError::FilenameParse {
                dir: dir.to_path_buf(),
                file: name.clone(),
                message: "nothing left after stripping the prefix".to_string(),
            });
        }

        if let Some(owner) = claimed.get(stripped) {
            return Err(AnnoprepError::InvalidRenamePlan {
                dir: dir.to_path_buf(),
                message: format!("'{name}' and '{owner}' would both become '{stripped}'"),
            });
        }

        claimed.insert(stripped.to_string(), name.clone());
        renames.push(Rename {
            from: name.clone(),
            to: stripped.to_string(),
        });
    }

    Ok(renames)
}

impl fmt::Display for PrefixReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "Would rename" } else { "Renamed" };
        writeln!(
            f,
            "{} {} file(s) under {}",
            verb,
            self.rename_count(),
            self.root.display()
        )?;
        for (subdir, renames) in &self.renames {
            writeln!(f, "  {}/: {} file(s)", subdir, renames.len())?;
            for rename in renames {
                writeln!(f, "    {} -> {}", rename.from, rename.to)?;
            }
        }
        Ok(())
    }
}
