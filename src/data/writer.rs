use super::{DataError, OutlierRecord, Result};
use csv::WriterBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const OUTPUT_PREFIX: &str = "outliers_";

pub const OUTPUT_HEADERS: [&str; 6] = [
    "Stock-ID",
    "Timestamp",
    "actual stock price at that timestamp",
    "mean of 30 data points",
    "deviation",
    "percentage deviation",
];

/// `output_dir/outliers_<source file name>`
pub fn output_path(source_path: &Path, output_dir: &Path) -> PathBuf {
    let name = source_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{}{}", OUTPUT_PREFIX, name))
}

/// Writes the header and one row per outlier, replacing any earlier output
/// for the same source file. The header is written even when there are no
/// outliers.
pub fn write_outliers(
    records: &[OutlierRecord],
    source_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let source_path = source_path.as_ref();
    let output_dir = output_dir.as_ref();
    let path = output_path(source_path, output_dir);
    info!(
        source = %source_path.display(),
        output = %path.display(),
        outliers = records.len(),
        "Saving outlier data"
    );

    let write_error = |source: csv::Error| DataError::Write {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(output_dir).map_err(|err| write_error(err.into()))?;

    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .map_err(write_error)?;

    wtr.write_record(OUTPUT_HEADERS).map_err(write_error)?;
    for record in records {
        wtr.serialize(record).map_err(write_error)?;
    }
    wtr.flush().map_err(|err| write_error(err.into()))?;

    Ok(path)
}

/// Reads an output file back, header included.
pub fn read_outliers(path: impl AsRef<Path>) -> Result<Vec<OutlierRecord>> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_path(path).map_err(|err| DataError::Parse {
        path: path.to_path_buf(),
        line: 0,
        reason: err.to_string(),
    })?;

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: OutlierRecord = result.map_err(|err| DataError::Parse {
            path: path.to_path_buf(),
            line: err.position().map(|pos| pos.line()).unwrap_or_default(),
            reason: err.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}
