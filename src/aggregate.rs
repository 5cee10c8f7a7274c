//! Group-by reductions over the cleaned frame.
//!
//! Three independent summaries: monthly (ascending `year_month`), segment
//! (caller-chosen categorical field, revenue descending), and daily (ascending
//! `date`). A missing grouping column or an empty frame yields an empty
//! summary, never an error. Orders are counted as distinct `order_id` values,
//! falling back to the row count only when no `order_id` column exists.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    data::{Cell, Frame, display_number},
    math::{round2, safe_divide},
    schema,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRow {
    pub year_month: String,
    pub total_revenue: f64,
    pub total_orders: u64,
    pub unique_customers: u64,
    pub avg_order_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_marketing_spend: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRow {
    pub segment: String,
    pub total_revenue: f64,
    pub total_orders: u64,
    pub unique_customers: u64,
    pub avg_order_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub daily_revenue: f64,
    pub daily_orders: u64,
}

#[derive(Default)]
struct GroupAccum {
    revenue: f64,
    cost: f64,
    spend: f64,
    rows: u64,
    orders: HashSet<String>,
    customers: HashSet<String>,
}

impl GroupAccum {
    fn order_count(&self, has_order_column: bool) -> u64 {
        if has_order_column {
            self.orders.len() as u64
        } else {
            self.rows
        }
    }
}

struct ColumnLayout {
    revenue: usize,
    order_id: Option<usize>,
    customer_id: Option<usize>,
    cost: Option<usize>,
    spend: Option<usize>,
}

impl ColumnLayout {
    fn resolve(frame: &Frame) -> Option<Self> {
        Some(ColumnLayout {
            revenue: frame.column_index(schema::REVENUE)?,
            order_id: frame.column_index(schema::ORDER_ID),
            customer_id: frame.column_index(schema::CUSTOMER_ID),
            cost: frame.column_index(schema::COST),
            spend: frame.column_index(schema::MARKETING_SPEND),
        })
    }
}

fn accumulate(acc: &mut GroupAccum, row: &[Option<Cell>], layout: &ColumnLayout) {
    acc.rows += 1;
    if let Some(Cell::Number(n)) = row.get(layout.revenue).and_then(Option::as_ref) {
        acc.revenue += n;
    }
    if let Some(idx) = layout.order_id
        && let Some(cell) = row.get(idx).and_then(Option::as_ref)
    {
        acc.orders.insert(cell.as_display());
    }
    if let Some(idx) = layout.customer_id
        && let Some(cell) = row.get(idx).and_then(Option::as_ref)
    {
        acc.customers.insert(cell.as_display());
    }
    if let Some(idx) = layout.cost
        && let Some(Cell::Number(n)) = row.get(idx).and_then(Option::as_ref)
    {
        acc.cost += n;
    }
    if let Some(idx) = layout.spend
        && let Some(Cell::Number(n)) = row.get(idx).and_then(Option::as_ref)
    {
        acc.spend += n;
    }
}

/// Groups rows of `frame` by the text value of `key_idx`, in ascending key
/// order. Rows with a null key are skipped.
fn group_by_text(
    frame: &Frame,
    key_idx: usize,
    layout: &ColumnLayout,
) -> BTreeMap<String, GroupAccum> {
    let mut groups: BTreeMap<String, GroupAccum> = BTreeMap::new();
    for row in &frame.rows {
        let Some(key) = row.get(key_idx).and_then(Option::as_ref) else {
            continue;
        };
        accumulate(groups.entry(key.as_display()).or_default(), row, layout);
    }
    groups
}

pub fn monthly_summary(frame: &Frame) -> Vec<MonthlyRow> {
    let Some(month_idx) = frame.column_index(schema::YEAR_MONTH) else {
        return Vec::new();
    };
    let Some(layout) = ColumnLayout::resolve(frame) else {
        return Vec::new();
    };
    let has_cost = layout.cost.is_some();
    let has_spend = layout.spend.is_some();
    let has_orders = layout.order_id.is_some();

    group_by_text(frame, month_idx, &layout)
        .into_iter()
        .map(|(year_month, acc)| {
            let total_orders = acc.order_count(has_orders);
            MonthlyRow {
                year_month,
                total_revenue: acc.revenue,
                total_orders,
                unique_customers: acc.customers.len() as u64,
                avg_order_value: round2(safe_divide(acc.revenue, total_orders as f64, 0.0)),
                total_cost: has_cost.then_some(acc.cost),
                total_marketing_spend: has_spend.then_some(acc.spend),
            }
        })
        .collect()
}

/// Aggregates by an arbitrary categorical field, sorted by revenue
/// descending. Ties keep ascending key order.
pub fn segment_summary(frame: &Frame, segment_field: &str) -> Vec<SegmentRow> {
    let Some(segment_idx) = frame.column_index(segment_field) else {
        return Vec::new();
    };
    let Some(layout) = ColumnLayout::resolve(frame) else {
        return Vec::new();
    };
    let has_orders = layout.order_id.is_some();

    group_by_text(frame, segment_idx, &layout)
        .into_iter()
        .map(|(segment, acc)| {
            let total_orders = acc.order_count(has_orders);
            SegmentRow {
                segment,
                total_revenue: acc.revenue,
                total_orders,
                unique_customers: acc.customers.len() as u64,
                avg_order_value: round2(safe_divide(acc.revenue, total_orders as f64, 0.0)),
            }
        })
        .sorted_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue))
        .collect()
}

pub fn daily_summary(frame: &Frame) -> Vec<DailyRow> {
    let Some(date_idx) = frame.column_index(schema::DATE) else {
        return Vec::new();
    };
    let Some(layout) = ColumnLayout::resolve(frame) else {
        return Vec::new();
    };
    let has_orders = layout.order_id.is_some();

    let mut groups: BTreeMap<NaiveDate, GroupAccum> = BTreeMap::new();
    for row in &frame.rows {
        let Some(date) = row.get(date_idx).and_then(Option::as_ref).and_then(Cell::as_date)
        else {
            continue;
        };
        accumulate(groups.entry(date).or_default(), row, &layout);
    }
    groups
        .into_iter()
        .map(|(date, acc)| DailyRow {
            date,
            daily_revenue: acc.revenue,
            daily_orders: acc.order_count(has_orders),
        })
        .collect()
}

pub fn monthly_table_headers(rows: &[MonthlyRow]) -> Vec<String> {
    let mut headers = vec![
        "year_month".to_string(),
        "total_revenue".to_string(),
        "total_orders".to_string(),
        "unique_customers".to_string(),
        "avg_order_value".to_string(),
    ];
    if rows.iter().any(|r| r.total_cost.is_some()) {
        headers.push("total_cost".to_string());
    }
    if rows.iter().any(|r| r.total_marketing_spend.is_some()) {
        headers.push("total_marketing_spend".to_string());
    }
    headers
}

pub fn monthly_table_rows(rows: &[MonthlyRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            let mut cells = vec![
                r.year_month.clone(),
                display_number(r.total_revenue),
                r.total_orders.to_string(),
                r.unique_customers.to_string(),
                display_number(r.avg_order_value),
            ];
            if let Some(cost) = r.total_cost {
                cells.push(display_number(cost));
            }
            if let Some(spend) = r.total_marketing_spend {
                cells.push(display_number(spend));
            }
            cells
        })
        .collect()
}

pub fn segment_table_rows(rows: &[SegmentRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            vec![
                r.segment.clone(),
                display_number(r.total_revenue),
                r.total_orders.to_string(),
                r.unique_customers.to_string(),
                display_number(r.avg_order_value),
            ]
        })
        .collect()
}

pub fn daily_table_rows(rows: &[DailyRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            vec![
                r.date.format("%Y-%m-%d").to_string(),
                display_number(r.daily_revenue),
                r.daily_orders.to_string(),
            ]
        })
        .collect()
}
