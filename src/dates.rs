//! Date recovery over a whole column.
//!
//! Input dates arrive in whatever convention the export tool used. Recovery is
//! modeled as a strategy over the full column rather than per value: the
//! default strategy first tries a general-purpose parse, and only when most of
//! the column fails does it sweep the configured explicit formats and keep the
//! best-scoring one. Column-level scoring is what lets a uniformly formatted
//! `DD-MM-YYYY` column win over a general parse that reads nothing.

use chrono::{NaiveDate, NaiveDateTime};

/// Formats attempted by the general-purpose parse. ISO variants first;
/// ambiguous slash dates read month-first.
const GENERAL_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const GENERAL_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_date_general(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in GENERAL_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    for fmt in GENERAL_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed.date());
        }
    }
    None
}

/// A column-level date parsing strategy. `None` entries are values that were
/// already missing; they stay `None` in the output.
pub trait DateRecovery {
    fn parse_column(&self, values: &[Option<String>]) -> Vec<Option<NaiveDate>>;
}

/// Default recovery: general parse first, then a sweep over the explicit
/// formats once more than `retry_threshold` of the column is still unparsed,
/// keeping whichever attempt (general included) parsed the most values.
#[derive(Debug, Clone)]
pub struct FormatSweep {
    formats: Vec<String>,
    retry_threshold: f64,
}

impl FormatSweep {
    pub fn new(formats: &[String]) -> Self {
        FormatSweep {
            formats: formats.to_vec(),
            retry_threshold: 0.5,
        }
    }
}

impl DateRecovery for FormatSweep {
    fn parse_column(&self, values: &[Option<String>]) -> Vec<Option<NaiveDate>> {
        let mut best: Vec<Option<NaiveDate>> = values
            .iter()
            .map(|v| v.as_deref().and_then(parse_date_general))
            .collect();
        if values.is_empty() {
            return best;
        }

        let unparsed = best.iter().filter(|d| d.is_none()).count();
        if (unparsed as f64) / (values.len() as f64) <= self.retry_threshold {
            return best;
        }

        let mut best_count = best.len() - unparsed;
        for fmt in &self.formats {
            let attempt: Vec<Option<NaiveDate>> = values
                .iter()
                .map(|v| {
                    v.as_deref()
                        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), fmt).ok())
                })
                .collect();
            let count = attempt.iter().filter(|d| d.is_some()).count();
            if count > best_count {
                best_count = count;
                best = attempt;
            }
        }
        best
    }
}
