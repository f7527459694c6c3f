pub mod progress;

pub use progress::{BatchProgress, ProgressSnapshot};

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::config::Preset;
use crate::pipeline::{plan_outputs, process_file, FileReport};

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub input: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub processed: Vec<FileReport>,
    pub failed: Vec<FailedFile>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Compresses every input in parallel.
///
/// Outputs land next to their inputs unless `out_dir` is set. Output paths are
/// planned up front so two inputs never write the same file. A file that fails
/// is logged and reported; the rest of the batch carries on.
pub fn process_batch(
    inputs: &[PathBuf],
    out_dir: Option<&Path>,
    preset: &Preset,
    progress: &BatchProgress,
) -> BatchReport {
    let jobs: Vec<(&PathBuf, PathBuf)> = inputs
        .iter()
        .zip(plan_outputs(inputs, out_dir))
        .collect();

    let results: Vec<Result<FileReport, FailedFile>> = jobs
        .par_iter()
        .map(|(input, output)| match process_file(input, output, preset) {
            Ok(report) => {
                progress.record(&report);
                Ok(report)
            }
            Err(e) => {
                tracing::warn!("Failed to process {}: {}", input.display(), e);
                progress.record_failure();
                Err(FailedFile {
                    input: (*input).clone(),
                    error: e.to_string(),
                })
            }
        })
        .collect();

    progress.finish();

    let mut report = BatchReport::default();
    for result in results {
        match result {
            Ok(file) => report.processed.push(file),
            Err(failed) => report.failed.push(failed),
        }
    }
    report
}
