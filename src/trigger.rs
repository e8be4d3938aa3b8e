//! Fire-and-forget entry point. The batch runs on the rayon pool and the
//! caller only gets an acknowledgement back.

use std::sync::Arc;

use tracing::info;

use crate::cancellation::CancellationToken;
use crate::pipeline::{BatchReport, Pipeline};

pub const DEFAULT_FILE_LIMIT: usize = 2;

pub const STARTED_MESSAGE: &str = "Data processing started...";

#[derive(Debug, Clone)]
pub struct Acknowledgement {
    pub message: &'static str,
    /// Cancels the remaining files of the submitted batch
    pub cancel: CancellationToken,
}

pub fn start_processing(pipeline: Arc<Pipeline>, file_limit: usize) -> Acknowledgement {
    start_processing_with(pipeline, file_limit, |_| {})
}

/// Same as [`start_processing`], handing the finished report to `on_complete`
/// on the worker thread.
pub fn start_processing_with<F>(
    pipeline: Arc<Pipeline>,
    file_limit: usize,
    on_complete: F,
) -> Acknowledgement
where
    F: FnOnce(BatchReport) + Send + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    info!(file_limit, "Queueing batch");
    rayon::spawn(move || {
        let report = pipeline.process_batch(file_limit, &token);
        info!(
            output = %pipeline.output_dir().display(),
            "Processing complete. Check output folder"
        );
        on_complete(report);
    });

    Acknowledgement {
        message: STARTED_MESSAGE,
        cancel,
    }
}
