//! Rename plans for restoring contiguity.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use super::{file_name_for, parse_stem};
use crate::error::AnnoprepError;
use crate::setops::{complement, intersection};

/// A single file move inside one directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// A fully computed, validated set of renames.
///
/// Files already sitting at a target name are left alone; every other file
/// is paired with exactly one free target slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenamePlan {
    renames: Vec<Rename>,
    untouched: Vec<String>,
}

impl RenamePlan {
    /// Compute the plan that renumbers `current` (file names in `dir`) to
    /// `start..start+len` with the given extension.
    ///
    /// Every name is parsed before anything else, so a single bad name
    /// aborts with no plan at all.
    pub fn compute(
        dir: &Path,
        current: &[String],
        start: u64,
        extension: &str,
    ) -> Result<Self, AnnoprepError> {
        let stem_by_name: HashMap<&str, u64> = current
            .iter()
            .map(|name| Ok((name.as_str(), parse_stem(dir, name, extension)?)))
            .collect::<Result<_, AnnoprepError>>()?;

        let end = start
            .checked_add(current.len() as u64)
            .ok_or_else(|| AnnoprepError::InvalidRenamePlan {
                dir: dir.to_path_buf(),
                message: format!(
                    "sequence starting at {start} with {} file(s) overflows",
                    current.len()
                ),
            })?;

        let target_numbers: Vec<u64> = (start..end).collect();
        let target_names: Vec<String> = target_numbers
            .iter()
            .map(|&number| file_name_for(number, extension))
            .collect();

        let already_correct = intersection(&target_names, current);
        let already_correct_numbers: Vec<u64> = already_correct
            .iter()
            .map(|name| stem_by_name[name.as_str()])
            .collect();

        let mut to_move: Vec<(u64, String)> = complement(current, &already_correct)
            .into_iter()
            .map(|name| (stem_by_name[name.as_str()], name))
            .collect();
        let mut free_slots = complement(&target_numbers, &already_correct_numbers);

        // Pair in lockstep over two sorted sequences.
        to_move.sort();
        free_slots.sort_unstable();

        if to_move.len() != free_slots.len() {
            return Err(AnnoprepError::InvalidRenamePlan {
                dir: dir.to_path_buf(),
                message: format!(
                    "{} file(s) to move but {} free slot(s)",
                    to_move.len(),
                    free_slots.len()
                ),
            });
        }

        let renames = to_move
            .into_iter()
            .zip(free_slots)
            .map(|((_, from), slot)| Rename {
                from,
                to: file_name_for(slot, extension),
            })
            .collect();

        let plan = Self {
            renames,
            untouched: already_correct,
        };
        plan.validate(dir, &target_names)?;
        Ok(plan)
    }

    /// Check that the plan is a bijection from moved files onto free slots
    /// and that no target name is currently occupied.
    fn validate(&self, dir: &Path, target_names: &[String]) -> Result<(), AnnoprepError> {
        let invalid = |message: String| AnnoprepError::InvalidRenamePlan {
            dir: dir.to_path_buf(),
            message,
        };

        let sources: BTreeSet<&str> = self.renames.iter().map(|r| r.from.as_str()).collect();
        let targets: BTreeSet<&str> = self.renames.iter().map(|r| r.to.as_str()).collect();
        let untouched: BTreeSet<&str> = self.untouched.iter().map(String::as_str).collect();

        if sources.len() != self.renames.len() {
            return Err(invalid("a file is moved more than once".to_string()));
        }
        if targets.len() != self.renames.len() {
            return Err(invalid("two files share a target name".to_string()));
        }
        if let Some(occupied) = targets
            .iter()
            .find(|name| sources.contains(*name) || untouched.contains(*name))
        {
            return Err(invalid(format!("target '{occupied}' is currently occupied")));
        }

        let expected: BTreeSet<&str> = target_names.iter().map(String::as_str).collect();
        let covered: BTreeSet<&str> = targets.union(&untouched).copied().collect();
        if covered != expected {
            return Err(invalid(format!(
                "plan covers {} of {} target name(s)",
                covered.intersection(&expected).count(),
                expected.len()
            )));
        }

        Ok(())
    }

    /// The renames in the order they will be applied.
    pub fn renames(&self) -> &[Rename] {
        &self.renames
    }

    /// Files already at a target name.
    pub fn untouched(&self) -> &[String] {
        &self.untouched
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    /// Apply the renames in `dir`.
    ///
    /// Each target is checked right before its rename; if it exists the
    /// directory changed since planning and the run stops with
    /// [`AnnoprepError::RenameCollision`] instead of overwriting data.
    pub fn apply(&self, dir: &Path) -> Result<(), AnnoprepError> {
        for rename in &self.renames {
            let from: PathBuf = dir.join(&rename.from);
            let to: PathBuf = dir.join(&rename.to);

            if fs::symlink_metadata(&to).is_ok() {
                return Err(AnnoprepError::RenameCollision {
                    dir: dir.to_path_buf(),
                    from: rename.from.clone(),
                    to: rename.to.clone(),
                });
            }

            fs::rename(&from, &to).map_err(AnnoprepError::Io)?;
            debug!("renamed {} -> {}", rename.from, rename.to);
        }

        Ok(())
    }

    pub(crate) fn into_renames(self) -> Vec<Rename> {
        self.renames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn plan_for(raw: &[&str], start: u64) -> RenamePlan {
        RenamePlan::compute(Path::new("images"), &names(raw), start, "jpg").expect("plan")
    }

    #[test]
    fn plan_pairs_sorted_files_with_sorted_slots() {
        let plan = plan_for(&["5.jpg", "2.jpg", "4.jpg"], 1);
        assert_eq!(plan.untouched(), &["2.jpg".to_string()]);
        assert_eq!(
            plan.renames(),
            &[
                Rename {
                    from: "4.jpg".into(),
                    to: "1.jpg".into()
                },
                Rename {
                    from: "5.jpg".into(),
                    to: "3.jpg".into()
                },
            ]
        );
    }

    #[test]
    fn plan_is_empty_when_already_contiguous() {
        let plan = plan_for(&["10.jpg", "11.jpg", "12.jpg"], 10);
        assert!(plan.is_empty());
        assert_eq!(plan.untouched().len(), 3);
    }

    #[test]
    fn plan_moves_padded_duplicates() {
        let plan = plan_for(&["1.jpg", "01.jpg"], 1);
        assert_eq!(
            plan.renames(),
            &[Rename {
                from: "01.jpg".into(),
                to: "2.jpg".into()
            }]
        );
    }

    #[test]
    fn plan_never_targets_an_existing_name() {
        let current = ["3.jpg", "0.jpg", "8.jpg", "1.jpg", "6.jpg"];
        let plan = plan_for(&current, 2);
        for rename in plan.renames() {
            assert!(!current.contains(&rename.to.as_str()));
        }
    }

    #[test]
    fn empty_directory_gives_empty_plan() {
        let plan = plan_for(&[], 1);
        assert!(plan.is_empty());
        assert!(plan.untouched().is_empty());
    }

    #[test]
    fn overflowing_sequence_is_rejected() {
        let result = RenamePlan::compute(
            Path::new("images"),
            &names(&["1.jpg", "2.jpg"]),
            u64::MAX,
            "jpg",
        );
        assert!(matches!(
            result,
            Err(AnnoprepError::InvalidRenamePlan { .. })
        ));
    }

    #[test]
    fn apply_refuses_to_overwrite() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("2.jpg"), b"two").expect("write");
        let plan = RenamePlan::compute(temp.path(), &names(&["2.jpg"]), 1, "jpg").expect("plan");

        // Simulate another writer creating the target after planning.
        fs::write(temp.path().join("1.jpg"), b"intruder").expect("write");
        assert!(matches!(
            plan.apply(temp.path()),
            Err(AnnoprepError::RenameCollision { .. })
        ));
        assert_eq!(fs::read(temp.path().join("2.jpg")).expect("read"), b"two");
    }
}
