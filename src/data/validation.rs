use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use super::RawStockRow;

static TIMESTAMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(3[01]|[12][0-9]|0[1-9])-(1[0-2]|0[1-9])-(\d{4})$")
        .expect("timestamp pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    BlankStockId,
    BlankTimestamp,
    TimestampFormat,
    MissingPrice,
    NonFinitePrice,
    NegativePrice,
}

impl Violation {
    pub fn message(self) -> &'static str {
        match self {
            Violation::BlankStockId => "Stock ID field can not be empty",
            Violation::BlankTimestamp => "Timestamp field can not be empty",
            Violation::TimestampFormat => "Timestamp must be in the format dd-mm-yyyy",
            Violation::MissingPrice => "Stock Price field can not be empty",
            Violation::NonFinitePrice => "Stock Price must be a finite number",
            Violation::NegativePrice => "Stock Price must be a positive number",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

type Check = fn(&RawStockRow) -> Option<Violation>;

fn check_stock_id(row: &RawStockRow) -> Option<Violation> {
    row.stock_id
        .trim()
        .is_empty()
        .then_some(Violation::BlankStockId)
}

fn check_timestamp_present(row: &RawStockRow) -> Option<Violation> {
    row.timestamp
        .trim()
        .is_empty()
        .then_some(Violation::BlankTimestamp)
}

fn check_timestamp_format(row: &RawStockRow) -> Option<Violation> {
    (!TIMESTAMP_PATTERN.is_match(&row.timestamp)).then_some(Violation::TimestampFormat)
}

fn check_price(row: &RawStockRow) -> Option<Violation> {
    match row.price {
        None => Some(Violation::MissingPrice),
        Some(price) if price.is_nan() => Some(Violation::MissingPrice),
        Some(price) if price.is_infinite() => Some(Violation::NonFinitePrice),
        Some(price) if price < 0.0 => Some(Violation::NegativePrice),
        Some(_) => None,
    }
}

const CHECKS: [Check; 4] = [
    check_stock_id,
    check_timestamp_present,
    check_timestamp_format,
    check_price,
];

/// Runs every field check against the row and returns all violations found.
pub fn validate(row: &RawStockRow) -> Vec<Violation> {
    CHECKS.iter().filter_map(|check| check(row)).collect()
}

/// Joins violations into a single log line, e.g. `Row A,1-1-2023,5 has errors: ...;`
pub fn describe(row: &RawStockRow, violations: &[Violation]) -> String {
    let details: String = violations
        .iter()
        .map(|violation| format!(" {};", violation))
        .collect();
    format!("Row {} has errors:{}", row, details)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(stock_id: &str, timestamp: &str, price: Option<f64>) -> RawStockRow {
        RawStockRow {
            stock_id: stock_id.to_string(),
            timestamp: timestamp.to_string(),
            price,
        }
    }

    #[test]
    fn test_valid_row() {
        assert!(validate(&row("FLTR", "20-09-2023", Some(16_340.0))).is_empty());
        assert!(validate(&row("FLTR", "31-12-1999", Some(0.0))).is_empty());
    }

    #[test]
    fn test_blank_id() {
        assert_eq!(
            validate(&row("  ", "20-09-2023", Some(1.0))),
            vec![Violation::BlankStockId]
        );
    }

    #[test]
    fn test_timestamp_pattern() {
        for bad in ["2023-09-20", "20/09/2023", "32-01-2023", "00-01-2023", "01-13-2023", "1-1-2023"] {
            assert_eq!(
                validate(&row("FLTR", bad, Some(1.0))),
                vec![Violation::TimestampFormat],
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_blank_timestamp_reports_presence_and_format() {
        assert_eq!(
            validate(&row("FLTR", "", Some(1.0))),
            vec![Violation::BlankTimestamp, Violation::TimestampFormat]
        );
    }

    #[test]
    fn test_price_checks() {
        assert_eq!(
            validate(&row("FLTR", "20-09-2023", Some(-0.01))),
            vec![Violation::NegativePrice]
        );
        assert_eq!(
            validate(&row("FLTR", "20-09-2023", None)),
            vec![Violation::MissingPrice]
        );
        assert_eq!(
            validate(&row("FLTR", "20-09-2023", Some(f64::NAN))),
            vec![Violation::MissingPrice]
        );
    }

    #[test]
    fn test_infinite_price_rejected() {
        assert_eq!(
            validate(&row("FLTR", "20-09-2023", Some(f64::INFINITY))),
            vec![Violation::NonFinitePrice]
        );
        assert_eq!(
            validate(&row("FLTR", "20-09-2023", Some(f64::NEG_INFINITY))),
            vec![Violation::NonFinitePrice]
        );
    }

    #[test]
    fn test_collects_every_violation() {
        let violations = validate(&row("", "yesterday", Some(-5.0)));
        assert_eq!(
            violations,
            vec![
                Violation::BlankStockId,
                Violation::TimestampFormat,
                Violation::NegativePrice
            ]
        );
    }

    #[test]
    fn test_describe() {
        let bad = row("", "20-09-2023", Some(-5.0));
        let message = describe(&bad, &validate(&bad));
        assert_eq!(
            message,
            "Row ,20-09-2023,-5 has errors: Stock ID field can not be empty; Stock Price must be a positive number;"
        );
    }
}
