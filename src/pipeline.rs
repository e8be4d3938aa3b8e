//! Batch processing: discovery, then an independent sample → detect → write
//! pass per file.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::analysis::OutlierDetector;
use crate::cancellation::{Cancellable, CancellationToken};
use crate::config::Settings;
use crate::data::discovery::{find_csv_files, list_subdirectories};
use crate::data::loader::{clock_seed, SeededRng, WindowRng, WindowSampler, WINDOW_SIZE};
use crate::data::writer::{output_path, write_outliers};
use crate::data::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer data lines than the window size
    ShortFile,
    /// Every row in the window failed validation
    NoValidRows,
    Cancelled,
}

#[derive(Debug)]
pub enum FileOutcome {
    Written {
        output: PathBuf,
        outliers: usize,
        rejected: usize,
    },
    Skipped(SkipReason),
    Failed(DataError),
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Debug)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub directories: Vec<PathBuf>,
    pub files: Vec<FileReport>,
    pub discovery_errors: Vec<DataError>,
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, FileOutcome::Written { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, FileOutcome::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, FileOutcome::Failed(_)))
            .count()
    }

    pub fn total_outliers(&self) -> usize {
        self.files
            .iter()
            .map(|file| match file.outcome {
                FileOutcome::Written { outliers, .. } => outliers,
                _ => 0,
            })
            .sum()
    }

    pub fn file(&self, path: &Path) -> Option<&FileReport> {
        self.files.iter().find(|file| file.path == path)
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    input_dir: PathBuf,
    output_dir: PathBuf,
    window_size: usize,
    detector: OutlierDetector,
    seed: Option<u64>,
}

impl Pipeline {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            window_size: WINDOW_SIZE,
            detector: OutlierDetector::default(),
            seed: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            input_dir: settings.input_path.clone(),
            output_dir: settings.output_path.clone(),
            window_size: settings.window_size,
            detector: OutlierDetector::with_sigma(settings.threshold_sigma),
            seed: settings.seed,
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_detector(mut self, detector: OutlierDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Samples, scores and writes a single file. Failures are logged and
    /// returned in the outcome, never propagated.
    pub fn process_file<R: WindowRng>(&self, path: &Path, rng: R) -> FileOutcome {
        let mut sampler = WindowSampler::new(rng).with_window_size(self.window_size);

        let window = match sampler.extract_window(path) {
            Ok(window) => window,
            Err(err) => {
                error!(path = %path.display(), error = %err, "Error parsing file");
                return FileOutcome::Failed(err);
            }
        };

        if window.total_lines < self.window_size {
            return FileOutcome::Skipped(SkipReason::ShortFile);
        }
        if window.is_empty() {
            warn!(path = %path.display(), "No valid rows in sampled window");
            return FileOutcome::Skipped(SkipReason::NoValidRows);
        }

        let outliers = self.detector.detect(&window.records);
        info!(
            path = %path.display(),
            rows = window.records.len(),
            outliers = outliers.len(),
            "Identified outliers"
        );

        match write_outliers(&outliers, path, &self.output_dir) {
            Ok(output) => FileOutcome::Written {
                output,
                outliers: outliers.len(),
                rejected: window.rejected,
            },
            Err(err) => {
                error!(path = %path.display(), error = %err, "Error saving outlier data");
                FileOutcome::Failed(err)
            }
        }
    }

    /// Runs the whole batch synchronously: every exchange directory under the
    /// input root, at most `file_limit` files from each.
    pub fn process_batch(&self, file_limit: usize, cancel: &CancellationToken) -> BatchReport {
        let started_at = Utc::now();
        info!(input = %self.input_dir.display(), file_limit, "Processing CSV data");

        let mut discovery_errors = Vec::new();
        let directories = match list_subdirectories(&self.input_dir) {
            Ok(directories) => directories,
            Err(err) => {
                error!(error = %err, "Error reading directory structure");
                discovery_errors.push(err);
                return BatchReport {
                    started_at,
                    finished_at: Utc::now(),
                    directories: Vec::new(),
                    files: Vec::new(),
                    discovery_errors,
                };
            }
        };

        let listings: Vec<_> = directories
            .par_iter()
            .map(|dir| find_csv_files(dir, file_limit))
            .collect();

        let mut csv_files = Vec::new();
        for listing in listings {
            match listing {
                Ok(files) => csv_files.extend(files),
                Err(err) => {
                    error!(error = %err, "Error reading files in directory");
                    discovery_errors.push(err);
                }
            }
        }

        // Each file gets its own generator so no RNG state crosses threads.
        // Files sharing an output name run one after another, last one wins.
        let base_seed = self.seed.unwrap_or_else(clock_seed);
        let groups = group_by_output(csv_files, &self.output_dir);
        let files: Vec<FileReport> = groups
            .par_iter()
            .flat_map_iter(|group| {
                group.iter().map(|(i, path)| {
                    let outcome = if cancel.is_cancelled() {
                        info!(path = %path.display(), "Batch cancelled, skipping file");
                        FileOutcome::Skipped(SkipReason::Cancelled)
                    } else {
                        let rng = SeededRng::new(derive_seed(base_seed, *i));
                        self.process_file(path, rng)
                    };
                    FileReport {
                        path: path.clone(),
                        outcome,
                    }
                })
            })
            .collect();

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            directories,
            files,
            discovery_errors,
        };
        info!(
            output = %self.output_dir.display(),
            written = report.written(),
            skipped = report.skipped(),
            failed = report.failed(),
            outliers = report.total_outliers(),
            "Processing complete"
        );
        report
    }
}

/// Buckets files by output path, keeping discovery order inside each bucket.
/// Each file keeps its discovery index for seeding.
fn group_by_output(files: Vec<PathBuf>, output_dir: &Path) -> Vec<Vec<(usize, PathBuf)>> {
    let mut groups: Vec<Vec<(usize, PathBuf)>> = Vec::new();
    let mut group_of: HashMap<PathBuf, usize> = HashMap::new();

    for (i, path) in files.into_iter().enumerate() {
        let target = output_path(&path, output_dir);
        match group_of.get(&target) {
            Some(&group) => {
                warn!(
                    path = %path.display(),
                    output = %target.display(),
                    "Output name shared with another exchange, later file overwrites"
                );
                groups[group].push((i, path));
            }
            None => {
                group_of.insert(target, groups.len());
                groups.push(vec![(i, path)]);
            }
        }
    }
    groups
}

fn derive_seed(base: u64, index: usize) -> u64 {
    base.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
