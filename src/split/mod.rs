//! Train/validation splitting and CSV artifact writing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::annotation::{AnnotationRecord, COLUMNS};
use crate::error::AnnoprepError;

/// Share of rows that go to the training subset by default.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// Seed used when the caller does not pick one.
pub const DEFAULT_SEED: u64 = 42;

/// Split options.
#[derive(Clone, Copy, Debug)]
pub struct SplitOptions {
    /// Fraction of rows sampled into the training subset, in `[0, 1]`.
    pub fraction: f64,
    /// RNG seed; `None` draws from the OS and is not reproducible.
    pub seed: Option<u64>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            fraction: DEFAULT_TRAIN_FRACTION,
            seed: Some(DEFAULT_SEED),
        }
    }
}

/// Two disjoint subsets that together hold every input row exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetSplit<T> {
    pub train: Vec<T>,
    pub validation: Vec<T>,
}

/// Validate split options before running.
pub fn validate_split_options(opts: &SplitOptions) -> Result<(), AnnoprepError> {
    if !(0.0..=1.0).contains(&opts.fraction) {
        return Err(AnnoprepError::InvalidSplitParams {
            message: format!(
                "train fraction must be in the interval [0.0, 1.0], got {}",
                opts.fraction
            ),
        });
    }

    Ok(())
}

/// Number of training rows for `total` rows, `round(total * fraction)`.
///
/// Ties go to the even count, so 5 rows at 0.5 give 2 training rows.
pub fn train_row_count(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).round_ties_even() as usize).min(total)
}

/// Pick `k` distinct row indices out of `0..total`, returned in ascending order.
pub fn select_train_indices(total: usize, k: usize, seed: Option<u64>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..total).collect();

    if k >= total {
        return indices;
    }

    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
    } else {
        let mut rng = rand::rng();
        indices.shuffle(&mut rng);
    }

    indices.truncate(k);
    indices.sort_unstable();
    indices
}

/// Split `rows` into a random training sample and its exact complement.
///
/// Both subsets keep the input row order.
pub fn split_rows<T: Clone>(
    rows: &[T],
    opts: &SplitOptions,
) -> Result<DatasetSplit<T>, AnnoprepError> {
    validate_split_options(opts)?;

    let k = train_row_count(rows.len(), opts.fraction);
    let selected = select_train_indices(rows.len(), k, opts.seed);

    let mut in_train = vec![false; rows.len()];
    for index in selected {
        in_train[index] = true;
    }

    let mut split = DatasetSplit {
        train: Vec::with_capacity(k),
        validation: Vec::with_capacity(rows.len() - k),
    };
    for (row, train) in rows.iter().zip(in_train) {
        if train {
            split.train.push(row.clone());
        } else {
            split.validation.push(row.clone());
        }
    }

    Ok(split)
}

/// Paths of the three CSV artifacts of one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub full: PathBuf,
    pub train: PathBuf,
    pub validation: PathBuf,
}

impl ArtifactPaths {
    /// `<name>.csv`, `<name>_train.csv` and `<name>_test.csv` inside `out_dir`.
    pub fn new(out_dir: &Path, name: &str) -> Self {
        Self {
            full: out_dir.join(format!("{name}.csv")),
            train: out_dir.join(format!("{name}_train.csv")),
            validation: out_dir.join(format!("{name}_test.csv")),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.full, &self.train, &self.validation]
    }
}

/// Write the full table and both subsets.
///
/// Existence of all three targets is checked before anything is written, so
/// a refused run leaves earlier artifacts untouched.
pub fn write_artifacts(
    out_dir: &Path,
    name: &str,
    full: &[AnnotationRecord],
    split: &DatasetSplit<AnnotationRecord>,
    overwrite: bool,
) -> Result<ArtifactPaths, AnnoprepError> {
    let paths = ArtifactPaths::new(out_dir, name);

    if !overwrite {
        if let Some(existing) = paths.all().into_iter().find(|path| path.exists()) {
            return Err(AnnoprepError::ArtifactExists {
                path: existing.to_path_buf(),
            });
        }
    }

    std::fs::create_dir_all(out_dir).map_err(AnnoprepError::Io)?;
    write_table_csv(&paths.full, full)?;
    write_table_csv(&paths.train, &split.train)?;
    write_table_csv(&paths.validation, &split.validation)?;

    info!(
        "wrote {} row(s) ({} train, {} test) to {}",
        full.len(),
        split.train.len(),
        split.validation.len(),
        out_dir.display()
    );

    Ok(paths)
}

/// Write records as CSV with a header row, even when there are no records.
pub fn write_table_csv(path: &Path, records: &[AnnotationRecord]) -> Result<(), AnnoprepError> {
    let file = File::create(path).map_err(AnnoprepError::Io)?;
    let writer = BufWriter::new(file);

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    let csv_error = |source: csv::Error| AnnoprepError::CsvWrite {
        path: path.to_path_buf(),
        source,
    };

    csv_writer.write_record(COLUMNS).map_err(csv_error)?;
    for record in records {
        csv_writer.serialize(record).map_err(csv_error)?;
    }

    csv_writer
        .into_inner()
        .map_err(|e| AnnoprepError::Io(e.into_error()))?
        .flush()
        .map_err(AnnoprepError::Io)?;

    Ok(())
}

/// Render records as CSV text with a header row.
pub fn to_table_csv_string(records: &[AnnotationRecord]) -> Result<String, AnnoprepError> {
    let dummy_path = Path::new("<string>");
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    let csv_error = |source: csv::Error| AnnoprepError::CsvWrite {
        path: dummy_path.to_path_buf(),
        source,
    };

    csv_writer.write_record(COLUMNS).map_err(csv_error)?;
    for record in records {
        csv_writer.serialize(record).map_err(csv_error)?;
    }

    let bytes = csv_writer
        .into_inner()
        .map_err(|e| AnnoprepError::Io(e.into_error()))?;

    String::from_utf8(bytes).map_err(|e| {
        AnnoprepError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}
