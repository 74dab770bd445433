use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AnnoprepError;

// Label Studio export schema, reduced to the fields we look at.

#[derive(Debug, Deserialize)]
struct LsTask {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    annotations: Vec<LsResultSet>,
}

#[derive(Debug, Default, Deserialize)]
struct LsResultSet {
    #[serde(default)]
    result: Vec<LsResult>,
}

#[derive(Debug, Deserialize)]
struct LsResult {
    #[serde(default)]
    value: Option<LsValue>,
}

#[derive(Debug, Deserialize)]
struct LsValue {
    #[serde(default)]
    rotation: Option<f64>,
}

/// Which slice of the rotated ids to report.
#[derive(Clone, Debug, Default)]
pub struct RotatedQuery {
    /// Start the listing at this task id; it must be one of the rotated ids.
    pub start: Option<String>,
    /// Report at most this many ids.
    pub limit: Option<usize>,
}

/// Tasks whose bounding box is rotated.
#[derive(Clone, Debug, Serialize)]
pub struct RotatedReport {
    pub source: PathBuf,
    /// Tasks that carry a rotation value at all.
    pub tasks_with_rotation: usize,
    /// Total number of rotated tasks, before windowing.
    pub rotated_total: usize,
    /// Rotated task ids after applying the query window.
    pub rotated_ids: Vec<String>,
}

/// Read a Label Studio JSON export and report tasks with nonzero rotation.
///
/// Only the first result of the first annotation of each task is inspected,
/// since a task holds one box per image in these exports.
pub fn find_rotated(path: &Path, query: &RotatedQuery) -> Result<RotatedReport, AnnoprepError> {
    let file = File::open(path).map_err(AnnoprepError::Io)?;
    let tasks: Vec<LsTask> = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        AnnoprepError::LabelStudioJsonParse {
            path: path.to_path_buf(),
            source,
        }
    })?;

    rotated_from_tasks(tasks, path, query)
}

/// Same as [`find_rotated`] for an in-memory export.
pub fn rotated_from_json_str(
    json: &str,
    query: &RotatedQuery,
) -> Result<RotatedReport, AnnoprepError> {
    let path = Path::new("<string>");
    let tasks: Vec<LsTask> =
        serde_json::from_str(json).map_err(|source| AnnoprepError::LabelStudioJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    rotated_from_tasks(tasks, path, query)
}

fn rotated_from_tasks(
    tasks: Vec<LsTask>,
    path: &Path,
    query: &RotatedQuery,
) -> Result<RotatedReport, AnnoprepError> {
    let mut tasks_with_rotation = 0;
    let mut rotated = Vec::new();

    for task in tasks {
        let rotation = task
            .annotations
            .first()
            .and_then(|set| set.result.first())
            .and_then(|result| result.value.as_ref())
            .and_then(|value| value.rotation);

        if let Some(rotation) = rotation {
            tasks_with_rotation += 1;
            if rotation != 0.0 {
                rotated.push(id_string(&task.id));
            }
        }
    }

    let rotated_total = rotated.len();
    let from = match &query.start {
        Some(start) => rotated
            .iter()
            .position(|id| id == start)
            .ok_or_else(|| AnnoprepError::InvalidQuery {
                message: format!("start id '{start}' is not among the rotated tasks"),
            })?,
        None => 0,
    };

    let mut rotated_ids = rotated.split_off(from);
    if let Some(limit) = query.limit {
        rotated_ids.truncate(limit);
    }

    Ok(RotatedReport {
        source: path.to_path_buf(),
        tasks_with_rotation,
        rotated_total,
        rotated_ids,
    })
}

fn id_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for RotatedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rotated_total == 0 {
            return writeln!(
                f,
                "No rotated bounding boxes among {} task(s)",
                self.tasks_with_rotation
            );
        }

        writeln!(
            f,
            "{} of {} task(s) have a rotated bounding box",
            self.rotated_total, self.tasks_with_rotation
        )?;
        writeln!(f, "Rotated ids: {}", self.rotated_ids.join(", "))
    }
}
