use super::validation::{describe, validate};
use super::{DataError, RawStockRow, Result, StockRecord};
use csv::{ByteRecord, ReaderBuilder, StringRecord, Trim};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Consecutive rows sampled from each file.
pub const WINDOW_SIZE: usize = 30;

const COLUMNS: usize = 3;

/// Source of window start offsets.
pub trait WindowRng: Send {
    /// Returns a value in `[0, upper)`, or 0 when `upper` is 0.
    fn next_index(&mut self, upper: usize) -> usize;
}

impl<R: WindowRng + ?Sized> WindowRng for &mut R {
    fn next_index(&mut self, upper: usize) -> usize {
        (**self).next_index(upper)
    }
}

pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(12345)
}

/// Linear congruential generator, reproducible for a given seed.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn from_clock() -> Self {
        Self::new(clock_seed())
    }

    fn next_u64(&mut self) -> u64 {
        // LCG parameters from Numerical Recipes
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.state
    }
}

impl WindowRng for SeededRng {
    fn next_index(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        // Low bits of an LCG have short periods
        ((self.next_u64() >> 33) as usize) % upper
    }
}

#[derive(Debug, Clone, Default)]
pub struct Window {
    /// Rows that passed validation, in file order
    pub records: Vec<StockRecord>,
    /// Zero-based data line the window starts at
    pub start: usize,
    pub total_lines: usize,
    /// Rows inside the window dropped by validation
    pub rejected: usize,
}

impl Window {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct WindowSampler<R: WindowRng> {
    rng: R,
    window_size: usize,
}

impl<R: WindowRng> WindowSampler<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            window_size: WINDOW_SIZE,
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Samples `window_size` consecutive rows from a random offset and keeps
    /// the ones that validate. Files shorter than the window give an empty
    /// window rather than an error.
    pub fn extract_window<P: AsRef<Path>>(&mut self, path: P) -> Result<Window> {
        let path = path.as_ref();
        info!(path = %path.display(), rows = self.window_size, "Parsing data window");

        let total_lines = count_data_lines(path)?;
        if total_lines < self.window_size {
            info!(
                path = %path.display(),
                total_lines,
                "File too short to sample, skipping"
            );
            return Ok(Window {
                total_lines,
                ..Window::default()
            });
        }

        let start = self.rng.next_index(total_lines - self.window_size);
        debug!(path = %path.display(), start, total_lines, "Chose window start");

        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)
            .map_err(|err| read_error(path, err))?;

        let mut window = Window {
            records: Vec::with_capacity(self.window_size),
            start,
            total_lines,
            rejected: 0,
        };

        // Rows before the window are only split, never deserialized or validated
        for result in rdr.records().skip(start).take(self.window_size) {
            let raw = result.map_err(|err| read_error(path, err))?;
            let row = parse_row(path, &raw)?;

            let violations = validate(&row);
            match row.price {
                Some(price) if violations.is_empty() => {
                    window
                        .records
                        .push(StockRecord::new(row.stock_id, row.timestamp, price));
                }
                _ => {
                    warn!(
                        path = %path.display(),
                        "Data validation error: {}",
                        describe(&row, &violations)
                    );
                    window.rejected += 1;
                }
            }
        }

        Ok(window)
    }
}

fn parse_row(path: &Path, raw: &StringRecord) -> Result<RawStockRow> {
    let line = raw.position().map(|pos| pos.line()).unwrap_or_default();
    if raw.len() != COLUMNS {
        return Err(DataError::Parse {
            path: path.to_path_buf(),
            line,
            reason: format!("expected {} columns, found {}", COLUMNS, raw.len()),
        });
    }
    raw.deserialize(None).map_err(|err| DataError::Parse {
        path: path.to_path_buf(),
        line,
        reason: err.to_string(),
    })
}

fn read_error(path: &Path, err: csv::Error) -> DataError {
    let line = err.position().map(|pos| pos.line()).unwrap_or_default();
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => DataError::Io {
            path: path.to_path_buf(),
            source,
        },
        _ => DataError::Parse {
            path: path.to_path_buf(),
            line,
            reason,
        },
    }
}

/// Counts records with the same reader settings used for sampling, so `\r`,
/// `\n` and `\r\n` endings and skipped blank lines agree with the window
/// offsets. Records are split into a reused buffer and never deserialized.
fn count_data_lines(path: &Path) -> Result<usize> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| read_error(path, err))?;

    let mut record = ByteRecord::new();
    let mut count = 0;
    while rdr
        .read_byte_record(&mut record)
        .map_err(|err| read_error(path, err))?
    {
        count += 1;
    }
    Ok(count)
}
