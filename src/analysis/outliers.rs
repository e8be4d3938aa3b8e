use crate::data::{OutlierRecord, StockRecord};
use ndarray::Array1;
use serde::Serialize;

/// Mean and population standard deviation of a window's prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl WindowStats {
    pub fn from_records(window: &[StockRecord]) -> Self {
        if window.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
            };
        }

        let prices = Array1::from_iter(window.iter().map(|record| record.price));
        let mean = prices.mean().unwrap_or(0.0);
        // Variance taken about the same mean the deviations are measured from,
        // divided by N
        let variance = prices.mapv(|price| (price - mean).powi(2)).mean().unwrap_or(0.0);

        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutlierDetector {
    sigma: f64,
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self { sigma: 2.0 }
    }
}

impl OutlierDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sigma(sigma: f64) -> Self {
        Self { sigma }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Rows strictly further than `sigma` standard deviations from the window mean.
    pub fn detect(&self, window: &[StockRecord]) -> Vec<OutlierRecord> {
        let stats = WindowStats::from_records(window);
        let threshold = self.sigma * stats.std_dev;

        window
            .iter()
            .filter_map(|record| {
                let deviation = (record.price - stats.mean).abs();
                // NaN on either side compares false and is never flagged
                (deviation > threshold).then(|| OutlierRecord {
                    stock_id: record.stock_id.clone(),
                    timestamp: record.timestamp.clone(),
                    price: record.price,
                    window_mean: stats.mean,
                    deviation,
                    percentage_deviation: percentage_of_threshold(deviation, threshold),
                })
            })
            .collect()
    }
}

/// Deviation as a percentage of the threshold distance. A zero-width band
/// (constant window) has no finite ratio, so any deviation beyond it is infinite.
fn percentage_of_threshold(deviation: f64, threshold: f64) -> f64 {
    if threshold > 0.0 {
        deviation / threshold * 100.0
    } else {
        f64::INFINITY
    }
}

/// Flags rows more than two population standard deviations from the window mean.
pub fn detect_outliers(window: &[StockRecord]) -> Vec<OutlierRecord> {
    OutlierDetector::default().detect(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn window(prices: &[f64]) -> Vec<StockRecord> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| StockRecord::new(format!("ID{}", i + 1), "20-09-2023", price))
            .collect()
    }

    #[test]
    fn test_population_std_dev() {
        let stats = WindowStats::from_records(&window(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]));

        assert_relative_eq!(stats.mean, 5.0, epsilon = 1e-12);
        assert_relative_eq!(stats.std_dev, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_window() {
        let stats = WindowStats::from_records(&[]);
        assert_eq!(stats, WindowStats { mean: 0.0, std_dev: 0.0 });
        assert!(detect_outliers(&[]).is_empty());
    }

    #[test]
    fn test_constant_window_has_no_outliers() {
        let result = detect_outliers(&window(&[207.93, 207.93, 207.93]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_three_point_window_cannot_exceed_two_sigma() {
        // With N = 3 no single point can sit more than sqrt(2) sigma from the mean
        let result = detect_outliers(&window(&[200.02, 207.93, 20227.93]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_flags_spike() {
        let mut prices = vec![100.0; 29];
        prices.push(400.0);

        let result = detect_outliers(&window(&prices));

        assert_eq!(result.len(), 1);
        let outlier = &result[0];
        assert_eq!(outlier.stock_id, "ID30");
        assert_eq!(outlier.price, 400.0);
        assert_relative_eq!(outlier.window_mean, 110.0, epsilon = 1e-9);
        assert_relative_eq!(outlier.deviation, 290.0, epsilon = 1e-9);

        // variance = (29 * 10^2 + 290^2) / 30 = 2900
        let threshold = 2.0 * 2900.0_f64.sqrt();
        assert_relative_eq!(
            outlier.percentage_deviation,
            290.0 / threshold * 100.0,
            epsilon = 1e-9
        );
        assert!(outlier.percentage_deviation > 100.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        // mean 0, population std 1: both points sit exactly one sigma away
        let records = window(&[-1.0, 1.0]);

        assert!(OutlierDetector::with_sigma(1.0).detect(&records).is_empty());
        assert_eq!(OutlierDetector::with_sigma(0.5).detect(&records).len(), 2);
    }

    #[test]
    fn test_exactly_two_sigma_is_not_flagged() {
        // mean 1, population std 2, the last point sits exactly 4 away
        let records = window(&[0.0, 0.0, 0.0, 0.0, 5.0]);
        let stats = WindowStats::from_records(&records);

        assert_eq!(stats.mean, 1.0);
        assert_eq!(stats.std_dev, 2.0);
        assert!(detect_outliers(&records).is_empty());
    }

    #[test]
    fn test_non_finite_window_flags_nothing() {
        let mut prices = vec![100.0; 29];
        prices.push(f64::INFINITY);

        assert!(detect_outliers(&window(&prices)).is_empty());

        prices[29] = f64::NAN;
        assert!(detect_outliers(&window(&prices)).is_empty());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let mut prices: Vec<f64> = (0..29).map(|i| 100.0 + (i % 5) as f64 * 0.37).collect();
        prices.push(163.21);
        let records = window(&prices);

        let first = detect_outliers(&records);
        let second = detect_outliers(&records);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.deviation.to_bits(), b.deviation.to_bits());
            assert_eq!(a.percentage_deviation.to_bits(), b.percentage_deviation.to_bits());
            assert_eq!(a.window_mean.to_bits(), b.window_mean.to_bits());
        }
    }

    #[test]
    fn test_zero_band_percentage_is_infinite() {
        assert_eq!(percentage_of_threshold(1.0, 0.0), f64::INFINITY);
        assert_relative_eq!(percentage_of_threshold(3.0, 2.0), 150.0);
    }
}
