//! Multi-pass cleaning of a mapped frame.
//!
//! Each pass owns one concern and its own report counters: duplicate order
//! removal, date recovery, numeric coercion, blank-row dropping, optional-fill,
//! text normalization, and month-bucket derivation. Cleaning is total: bad
//! values become nulls or dropped rows and are counted, never raised, so an
//! empty result is a valid terminal state the caller must expect.

use std::collections::HashSet;

use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::{
    data::{Cell, Frame},
    dates::{DateRecovery, FormatSweep},
    schema::{self, CanonicalSchema},
};

/// Counters for every corrective action taken. Additive per pass; purely
/// observational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub original_rows: usize,
    pub duplicates_removed: usize,
    pub null_rows_dropped: usize,
    pub invalid_dates: usize,
    pub invalid_revenue: usize,
    pub negative_revenue: usize,
    pub text_columns_normalized: usize,
    pub final_rows: usize,
}

impl CleaningReport {
    /// Human-readable bullet lines for log or report output.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "started with {} row(s), {} remain after cleaning",
            self.original_rows, self.final_rows
        )];
        if self.duplicates_removed > 0 {
            lines.push(format!(
                "removed {} duplicate order(s)",
                self.duplicates_removed
            ));
        }
        if self.invalid_dates > 0 {
            lines.push(format!(
                "{} row(s) had invalid dates and were removed",
                self.invalid_dates
            ));
        }
        if self.negative_revenue > 0 {
            lines.push(format!(
                "{} row(s) carry negative revenue (kept in analysis)",
                self.negative_revenue
            ));
        }
        if self.text_columns_normalized > 0 {
            lines.push(format!(
                "normalized {} text column(s) to lowercase",
                self.text_columns_normalized
            ));
        }
        lines
    }
}

/// Cleans a mapped frame with the schema's own date-format sweep.
pub fn clean(frame: Frame, schema: &CanonicalSchema) -> (Frame, CleaningReport) {
    let recovery = FormatSweep::new(&schema.date_formats);
    clean_with(frame, schema, &recovery)
}

/// Cleans a mapped frame with a caller-chosen date recovery strategy.
pub fn clean_with(
    mut frame: Frame,
    schema: &CanonicalSchema,
    recovery: &dyn DateRecovery,
) -> (Frame, CleaningReport) {
    let mut report = CleaningReport {
        original_rows: frame.len(),
        ..CleaningReport::default()
    };

    report.duplicates_removed = drop_duplicate_orders(&mut frame);
    normalize_dates(&mut frame, recovery, &mut report);

    let strip = currency_stripper(&schema.currency_symbols);
    normalize_numerics(&mut frame, &strip, &mut report);

    report.null_rows_dropped += drop_all_null_required(&mut frame, schema);
    fill_optional_zeros(&mut frame);
    report.text_columns_normalized = normalize_text_columns(&mut frame, schema);
    derive_year_month(&mut frame);

    report.final_rows = frame.len();
    debug!(
        "Cleaning finished: {} -> {} row(s)",
        report.original_rows, report.final_rows
    );
    (frame, report)
}

/// First occurrence of each `order_id` wins; later duplicates are discarded.
/// Rows with a missing order id count as duplicates of one another.
fn drop_duplicate_orders(frame: &mut Frame) -> usize {
    let Some(idx) = frame.column_index(schema::ORDER_ID) else {
        return 0;
    };
    let before = frame.len();
    let mut seen: HashSet<Option<String>> = HashSet::new();
    frame.rows.retain(|row| {
        let key = row
            .get(idx)
            .and_then(Option::as_ref)
            .map(|cell| cell.as_display());
        seen.insert(key)
    });
    before - frame.len()
}

fn normalize_dates(frame: &mut Frame, recovery: &dyn DateRecovery, report: &mut CleaningReport) {
    let Some(idx) = frame.column_index(schema::DATE) else {
        return;
    };
    let raw: Vec<Option<String>> = frame
        .rows
        .iter()
        .map(|row| {
            row.get(idx)
                .and_then(Option::as_ref)
                .map(|cell| cell.as_display())
                .filter(|text| !text.trim().is_empty())
        })
        .collect();
    let parsed = recovery.parse_column(&raw);

    report.invalid_dates += raw
        .iter()
        .zip(&parsed)
        .filter(|(value, date)| value.is_some() && date.is_none())
        .count();

    for (row, date) in frame.rows.iter_mut().zip(&parsed) {
        row[idx] = date.map(Cell::Date);
    }
    let before = frame.len();
    frame
        .rows
        .retain(|row| row.get(idx).and_then(Option::as_ref).is_some());
    report.null_rows_dropped += before - frame.len();
}

fn currency_stripper(symbols: &[char]) -> Regex {
    let class: String = symbols.iter().collect();
    let pattern = format!("[{}\\s]+", regex::escape(&class));
    Regex::new(&pattern).expect("escaped symbol class is a valid pattern")
}

fn normalize_numerics(frame: &mut Frame, strip: &Regex, report: &mut CleaningReport) {
    for field in schema::NUMERIC_FIELDS {
        let Some(idx) = frame.column_index(field) else {
            continue;
        };
        for row in &mut frame.rows {
            row[idx] = coerce_numeric(row[idx].take(), strip);
        }
    }

    if let Some(idx) = frame.column_index(schema::REVENUE) {
        for row in &frame.rows {
            match row.get(idx).and_then(Option::as_ref) {
                None => report.invalid_revenue += 1,
                Some(Cell::Number(n)) if *n < 0.0 => report.negative_revenue += 1,
                _ => {}
            }
        }
    }
}

fn coerce_numeric(cell: Option<Cell>, strip: &Regex) -> Option<Cell> {
    match cell {
        None => None,
        Some(Cell::Number(n)) => Some(Cell::Number(n)),
        Some(Cell::Date(_)) => None,
        Some(Cell::Text(text)) => {
            let stripped = strip.replace_all(&text, "");
            if is_null_token(&stripped) {
                return None;
            }
            stripped.parse::<f64>().ok().map(Cell::Number)
        }
    }
}

/// Drops rows where every required field that survived mapping is null at
/// once. Partially incomplete rows stay.
fn drop_all_null_required(frame: &mut Frame, schema: &CanonicalSchema) -> usize {
    let present: Vec<usize> = schema
        .required_names()
        .iter()
        .filter_map(|name| frame.column_index(name))
        .collect();
    if present.is_empty() {
        return 0;
    }
    let before = frame.len();
    frame.rows.retain(|row| {
        present
            .iter()
            .any(|idx| row.get(*idx).and_then(Option::as_ref).is_some())
    });
    before - frame.len()
}

/// Missing cost/spend means no spend happened, not an unknown amount.
fn fill_optional_zeros(frame: &mut Frame) {
    for field in schema::FILL_ZERO_FIELDS {
        let Some(idx) = frame.column_index(field) else {
            continue;
        };
        for row in &mut frame.rows {
            if row[idx].is_none() {
                row[idx] = Some(Cell::Number(0.0));
            }
        }
    }
}

fn normalize_text_columns(frame: &mut Frame, schema: &CanonicalSchema) -> usize {
    let mut normalized = 0;
    for field in &schema.text_fields {
        let Some(idx) = frame.column_index(field) else {
            continue;
        };
        for row in &mut frame.rows {
            row[idx] = Some(Cell::Text(normalize_text_value(row[idx].take())));
        }
        normalized += 1;
    }
    normalized
}

fn normalize_text_value(cell: Option<Cell>) -> String {
    let Some(cell) = cell else {
        return "unknown".to_string();
    };
    let lowered = cell.as_display().trim().to_lowercase();
    if is_null_token(&lowered) {
        "unknown".to_string()
    } else {
        lowered
    }
}

fn derive_year_month(frame: &mut Frame) {
    let Some(idx) = frame.column_index(schema::DATE) else {
        return;
    };
    frame.columns.push(schema::YEAR_MONTH.to_string());
    for row in &mut frame.rows {
        let bucket = row
            .get(idx)
            .and_then(Option::as_ref)
            .and_then(Cell::as_date)
            .map(|date| Cell::Text(date.format("%Y-%m").to_string()));
        row.push(bucket);
    }
}

fn is_null_token(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "" | "nan" | "none" | "null"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn schema() -> CanonicalSchema {
        CanonicalSchema::default()
    }

    fn text(value: &str) -> Option<Cell> {
        Some(Cell::Text(value.to_string()))
    }

    fn frame(columns: &[&str], rows: &[&[Option<Cell>]]) -> Frame {
        let mut frame = Frame::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            frame.push_row(row.to_vec());
        }
        frame
    }

    #[test]
    fn duplicate_orders_keep_the_first_row() {
        let input = frame(
            &["date", "order_id", "customer_id", "revenue"],
            &[
                &[text("2024-01-01"), text("X"), text("c1"), text("100")],
                &[text("2024-01-02"), text("X"), text("c2"), text("999")],
                &[text("2024-01-03"), text("Y"), text("c3"), text("50")],
            ],
        );
        let (cleaned, report) = clean(input, &schema());
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(cleaned.len(), 2);
        let revenue_idx = cleaned.column_index("revenue").unwrap();
        assert_eq!(cleaned.cell(0, revenue_idx), Some(&Cell::Number(100.0)));
    }

    #[test]
    fn day_first_dates_recover_through_the_sweep() {
        let input = frame(
            &["date", "order_id", "customer_id", "revenue"],
            &[
                &[text("25-06-2024"), text("a"), text("c1"), text("10")],
                &[text("26-06-2024"), text("b"), text("c2"), text("20")],
                &[text("27-06-2024"), text("c"), text("c3"), text("30")],
            ],
        );
        let (cleaned, report) = clean(input, &schema());
        assert_eq!(report.invalid_dates, 0);
        assert_eq!(cleaned.len(), 3);
        let date_idx = cleaned.column_index("date").unwrap();
        assert_eq!(
            cleaned.cell(0, date_idx).and_then(Cell::as_date),
            NaiveDate::from_ymd_opt(2024, 6, 25)
        );
    }

    #[test]
    fn unparsable_dates_drop_their_rows() {
        let input = frame(
            &["date", "order_id", "customer_id", "revenue"],
            &[
                &[text("2024-01-01"), text("a"), text("c1"), text("10")],
                &[text("2024-01-02"), text("b"), text("c2"), text("20")],
                &[text("2024-01-03"), text("c"), text("c3"), text("30")],
                &[text("not a date"), text("d"), text("c4"), text("40")],
            ],
        );
        let (cleaned, report) = clean(input, &schema());
        assert_eq!(report.invalid_dates, 1);
        assert_eq!(report.null_rows_dropped, 1);
        assert_eq!(cleaned.len(), 3);
    }

    #[test]
    fn currency_symbols_and_sentinels_coerce_to_numbers_or_null() {
        let input = frame(
            &["date", "order_id", "customer_id", "revenue"],
            &[
                &[text("2024-01-01"), text("a"), text("c1"), text("$1,234.56")],
                &[text("2024-01-02"), text("b"), text("c2"), text("₹ 99")],
                &[text("2024-01-03"), text("c"), text("c3"), text("nan")],
                &[text("2024-01-04"), text("d"), text("c4"), text("twelve")],
                &[text("2024-01-05"), text("e"), text("c5"), text("-45.5")],
            ],
        );
        let (cleaned, report) = clean(input, &schema());
        let idx = cleaned.column_index("revenue").unwrap();
        assert_eq!(cleaned.cell(0, idx), Some(&Cell::Number(1234.56)));
        assert_eq!(cleaned.cell(1, idx), Some(&Cell::Number(99.0)));
        assert_eq!(cleaned.cell(2, idx), None);
        assert_eq!(cleaned.cell(3, idx), None);
        assert_eq!(cleaned.cell(4, idx), Some(&Cell::Number(-45.5)));
        assert_eq!(report.invalid_revenue, 2);
        assert_eq!(report.negative_revenue, 1);
        // Negative or null revenue never drops a row.
        assert_eq!(cleaned.len(), 5);
    }

    #[test]
    fn rows_with_every_required_field_null_are_dropped() {
        // No date column, so the blank-row guard is the only row-dropping pass.
        let input = frame(
            &["order_id", "customer_id", "revenue"],
            &[
                &[text("a"), text("c1"), text("10")],
                &[None, None, None],
                &[text("b"), text("c2"), None],
            ],
        );
        let (cleaned, report) = clean(input, &schema());
        assert_eq!(report.null_rows_dropped, 1);
        assert_eq!(cleaned.len(), 2);
    }

    #[test]
    fn optional_numeric_nulls_become_zero() {
        let input = frame(
            &["date", "order_id", "customer_id", "revenue", "cost", "marketing_spend"],
            &[
                &[text("2024-01-01"), text("a"), text("c1"), text("10"), text("4"), None],
                &[text("2024-01-02"), text("b"), text("c2"), text("20"), None, text("nan")],
            ],
        );
        let (cleaned, _) = clean(input, &schema());
        let cost = cleaned.column_index("cost").unwrap();
        let spend = cleaned.column_index("marketing_spend").unwrap();
        assert_eq!(cleaned.cell(0, cost), Some(&Cell::Number(4.0)));
        assert_eq!(cleaned.cell(1, cost), Some(&Cell::Number(0.0)));
        assert_eq!(cleaned.cell(0, spend), Some(&Cell::Number(0.0)));
        assert_eq!(cleaned.cell(1, spend), Some(&Cell::Number(0.0)));
    }

    #[test]
    fn text_columns_normalize_and_default_to_unknown() {
        let input = frame(
            &["date", "order_id", "customer_id", "revenue", "channel", "region"],
            &[
                &[text("2024-01-01"), text("a"), text("c1"), text("10"), text("  Paid Search "), None],
                &[text("2024-01-02"), text("b"), text("c2"), text("20"), text("NULL"), text("EU")],
            ],
        );
        let (cleaned, report) = clean(input, &schema());
        assert_eq!(report.text_columns_normalized, 2);
        let channel = cleaned.column_index("channel").unwrap();
        let region = cleaned.column_index("region").unwrap();
        assert_eq!(cleaned.cell(0, channel), Some(&Cell::Text("paid search".into())));
        assert_eq!(cleaned.cell(1, channel), Some(&Cell::Text("unknown".into())));
        assert_eq!(cleaned.cell(0, region), Some(&Cell::Text("unknown".into())));
        assert_eq!(cleaned.cell(1, region), Some(&Cell::Text("eu".into())));
    }

    #[test]
    fn year_month_bucket_is_derived_from_the_date() {
        let input = frame(
            &["date", "order_id", "customer_id", "revenue"],
            &[&[text("2024-03-09"), text("a"), text("c1"), text("10")]],
        );
        let (cleaned, _) = clean(input, &schema());
        let idx = cleaned.column_index("year_month").unwrap();
        assert_eq!(cleaned.cell(0, idx), Some(&Cell::Text("2024-03".into())));
    }

    #[test]
    fn passthrough_columns_survive_cleaning() {
        let input = frame(
            &["date", "order_id", "customer_id", "revenue", "notes"],
            &[&[text("2024-01-01"), text("a"), text("c1"), text("10"), text("gift wrap")]],
        );
        let (cleaned, _) = clean(input, &schema());
        let idx = cleaned.column_index("notes").unwrap();
        assert_eq!(cleaned.cell(0, idx), Some(&Cell::Text("gift wrap".into())));
    }

    #[test]
    fn an_empty_frame_is_a_valid_terminal_state() {
        let input = frame(&["date", "order_id", "customer_id", "revenue"], &[]);
        let (cleaned, report) = clean(input, &schema());
        assert!(cleaned.is_empty());
        assert_eq!(report.original_rows, 0);
        assert_eq!(report.final_rows, 0);
    }

    #[test]
    fn report_lines_mention_only_the_actions_taken() {
        let report = CleaningReport {
            original_rows: 10,
            duplicates_removed: 2,
            final_rows: 8,
            ..CleaningReport::default()
        };
        let lines = report.summary_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("10 row(s)"));
        assert!(lines[1].contains("2 duplicate"));
    }
}
