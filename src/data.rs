use std::fmt;

use anyhow::{Result, ensure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single typed cell value. Missing values are represented as `None` at the
/// `Frame` level rather than with a dedicated variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn as_display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => display_number(*n),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn display_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Row-major table of optional cells. The one container shared by every
/// pipeline stage: raw input, mapped, and cleaned tables are all frames.
///
/// Each stage consumes its input frame by value and returns a new one, so no
/// table is ever observed mid-mutation by a caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<Cell>>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Frame {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Appends a row, padding or truncating it to the frame width.
    pub fn push_row(&mut self, mut row: Vec<Option<Cell>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(Option::as_ref)
    }

    /// Adds a derived column; `values` must match the current row count.
    pub fn push_column(&mut self, name: &str, values: Vec<Option<Cell>>) -> Result<()> {
        ensure!(
            values.len() == self.rows.len(),
            "Derived column '{name}' has {} values for {} rows",
            values.len(),
            self.rows.len()
        );
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    pub fn column_cells(&self, index: usize) -> impl Iterator<Item = Option<&Cell>> {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(Option::as_ref))
    }
}
