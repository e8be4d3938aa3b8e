pub mod outliers;

pub use outliers::{detect_outliers, OutlierDetector, WindowStats};
