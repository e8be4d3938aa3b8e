pub mod analysis;
pub mod cancellation;
pub mod config;
pub mod data;
pub mod logging;
pub mod pipeline;
pub mod trigger;

pub use analysis::outliers::detect_outliers;
pub use cancellation::{Cancellable, CancellationToken};
pub use config::Settings;
pub use data::discovery::{find_csv_files, list_subdirectories};
pub use data::writer::write_outliers;
pub use data::{DataError, OutlierRecord, StockRecord};
pub use pipeline::{BatchReport, FileOutcome, Pipeline, SkipReason};
pub use trigger::{start_processing, Acknowledgement};
