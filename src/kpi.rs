//! Top-line KPI derivation over the cleaned frame and monthly summary.
//!
//! Every ratio goes through guarded arithmetic, and an empty input produces
//! the fully-populated zero/None set rather than an error. A `None` KPI is
//! structurally unavailable (the prerequisite column is absent, or fewer than
//! two months exist for growth); callers must keep it distinct from a
//! computed zero.

use itertools::Itertools;
use serde::Serialize;

use crate::{
    aggregate::MonthlyRow,
    data::{Cell, Frame, display_number},
    math::{round2, safe_divide, safe_pct_change},
    schema,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSet {
    pub total_revenue: f64,
    pub total_orders: u64,
    pub unique_customers: u64,
    pub avg_order_value: f64,
    pub revenue_per_customer: f64,
    pub orders_per_customer: f64,
    pub latest_month: Option<String>,
    pub latest_month_revenue: f64,
    pub mom_revenue_growth: Option<f64>,
    pub total_cost: Option<f64>,
    pub gross_margin: Option<f64>,
    pub total_marketing_spend: Option<f64>,
    pub roas: Option<f64>,
    pub total_months: usize,
}

impl KpiSet {
    /// The all-zero/None set returned for empty inputs.
    pub fn empty() -> Self {
        KpiSet {
            total_revenue: 0.0,
            total_orders: 0,
            unique_customers: 0,
            avg_order_value: 0.0,
            revenue_per_customer: 0.0,
            orders_per_customer: 0.0,
            latest_month: None,
            latest_month_revenue: 0.0,
            mom_revenue_growth: None,
            total_cost: None,
            gross_margin: None,
            total_marketing_spend: None,
            roas: None,
            total_months: 0,
        }
    }

    /// `(metric, value)` rows for table rendering; unavailable metrics show
    /// as `n/a`.
    pub fn table_rows(&self) -> Vec<Vec<String>> {
        let opt_number = |value: Option<f64>| {
            value.map(display_number).unwrap_or_else(|| "n/a".to_string())
        };
        vec![
            vec!["total_revenue".into(), display_number(self.total_revenue)],
            vec!["total_orders".into(), self.total_orders.to_string()],
            vec!["unique_customers".into(), self.unique_customers.to_string()],
            vec!["avg_order_value".into(), display_number(self.avg_order_value)],
            vec![
                "revenue_per_customer".into(),
                display_number(self.revenue_per_customer),
            ],
            vec![
                "orders_per_customer".into(),
                display_number(self.orders_per_customer),
            ],
            vec![
                "latest_month".into(),
                self.latest_month.clone().unwrap_or_else(|| "n/a".to_string()),
            ],
            vec![
                "latest_month_revenue".into(),
                display_number(self.latest_month_revenue),
            ],
            vec![
                "mom_revenue_growth".into(),
                self.mom_revenue_growth
                    .map(|g| format!("{g}%"))
                    .unwrap_or_else(|| "n/a".to_string()),
            ],
            vec!["total_cost".into(), opt_number(self.total_cost)],
            vec![
                "gross_margin".into(),
                self.gross_margin
                    .map(|m| format!("{m}%"))
                    .unwrap_or_else(|| "n/a".to_string()),
            ],
            vec![
                "total_marketing_spend".into(),
                opt_number(self.total_marketing_spend),
            ],
            vec!["roas".into(), opt_number(self.roas)],
            vec!["total_months".into(), self.total_months.to_string()],
        ]
    }
}

fn sum_numeric(frame: &Frame, field: &str) -> Option<f64> {
    let idx = frame.column_index(field)?;
    Some(
        frame
            .column_cells(idx)
            .filter_map(|cell| cell.and_then(Cell::as_number))
            .sum(),
    )
}

fn distinct_count(frame: &Frame, field: &str) -> Option<u64> {
    let idx = frame.column_index(field)?;
    Some(
        frame
            .column_cells(idx)
            .flatten()
            .map(Cell::as_display)
            .unique()
            .count() as u64,
    )
}

pub fn compute(clean: &Frame, monthly: &[MonthlyRow]) -> KpiSet {
    if clean.is_empty() || monthly.is_empty() {
        return KpiSet::empty();
    }

    let total_revenue = round2(sum_numeric(clean, schema::REVENUE).unwrap_or(0.0));
    // Distinct order ids; plain row count only when the column never mapped.
    let total_orders =
        distinct_count(clean, schema::ORDER_ID).unwrap_or(clean.len() as u64);
    let unique_customers = distinct_count(clean, schema::CUSTOMER_ID).unwrap_or(0);

    let latest = monthly.last();
    let previous = monthly.len().checked_sub(2).and_then(|i| monthly.get(i));
    let mom_revenue_growth = previous.zip(latest).map(|(prev, curr)| {
        round2(safe_pct_change(curr.total_revenue, prev.total_revenue, 0.0))
    });

    let total_cost = sum_numeric(clean, schema::COST).map(round2);
    let gross_margin = total_cost.map(|cost| {
        round2(safe_divide(total_revenue - cost, total_revenue, 0.0) * 100.0)
    });
    let total_marketing_spend = sum_numeric(clean, schema::MARKETING_SPEND).map(round2);
    let roas = total_marketing_spend
        .map(|spend| round2(safe_divide(total_revenue, spend, 0.0)));

    KpiSet {
        total_revenue,
        total_orders,
        unique_customers,
        avg_order_value: round2(safe_divide(total_revenue, total_orders as f64, 0.0)),
        revenue_per_customer: round2(safe_divide(
            total_revenue,
            unique_customers as f64,
            0.0,
        )),
        orders_per_customer: round2(safe_divide(
            total_orders as f64,
            unique_customers as f64,
            0.0,
        )),
        latest_month: latest.map(|row| row.year_month.clone()),
        latest_month_revenue: latest.map(|row| round2(row.total_revenue)).unwrap_or(0.0),
        mom_revenue_growth,
        total_cost,
        gross_margin,
        total_marketing_spend,
        roas,
        total_months: monthly.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::monthly_summary;

    fn text(value: &str) -> Option<Cell> {
        Some(Cell::Text(value.to_string()))
    }

    fn number(value: f64) -> Option<Cell> {
        Some(Cell::Number(value))
    }

    fn month(value: &str) -> Option<Cell> {
        Some(Cell::Text(value.to_string()))
    }

    fn fixture(rows: &[(&str, &str, f64, &str)]) -> Frame {
        let mut frame = Frame::new(
            ["order_id", "customer_id", "revenue", "year_month"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        for (order, customer, revenue, bucket) in rows {
            frame.push_row(vec![
                text(order),
                text(customer),
                number(*revenue),
                month(bucket),
            ]);
        }
        frame
    }

    #[test]
    fn mom_growth_matches_the_two_latest_months() {
        let clean = fixture(&[
            ("o1", "c1", 1000.0, "2024-01"),
            ("o2", "c2", 1200.0, "2024-02"),
        ]);
        let monthly = monthly_summary(&clean);
        let kpis = compute(&clean, &monthly);
        assert_eq!(kpis.mom_revenue_growth, Some(20.0));
        assert_eq!(kpis.latest_month.as_deref(), Some("2024-02"));
        assert_eq!(kpis.latest_month_revenue, 1200.0);
        assert_eq!(kpis.total_months, 2);
    }

    #[test]
    fn single_month_growth_is_unavailable_not_zero() {
        let clean = fixture(&[("o1", "c1", 1000.0, "2024-01")]);
        let monthly = monthly_summary(&clean);
        let kpis = compute(&clean, &monthly);
        assert_eq!(kpis.mom_revenue_growth, None);
        assert_eq!(kpis.total_months, 1);
    }

    #[test]
    fn ratios_use_distinct_order_and_customer_counts() {
        let clean = fixture(&[
            ("o1", "c1", 100.0, "2024-01"),
            ("o2", "c1", 200.0, "2024-01"),
            ("o3", "c2", 300.0, "2024-01"),
        ]);
        let monthly = monthly_summary(&clean);
        let kpis = compute(&clean, &monthly);
        assert_eq!(kpis.total_revenue, 600.0);
        assert_eq!(kpis.total_orders, 3);
        assert_eq!(kpis.unique_customers, 2);
        assert_eq!(kpis.avg_order_value, 200.0);
        assert_eq!(kpis.revenue_per_customer, 300.0);
        assert_eq!(kpis.orders_per_customer, 1.5);
    }

    #[test]
    fn margin_and_roas_require_their_columns() {
        let clean = fixture(&[("o1", "c1", 1000.0, "2024-01")]);
        let monthly = monthly_summary(&clean);
        let kpis = compute(&clean, &monthly);
        assert_eq!(kpis.total_cost, None);
        assert_eq!(kpis.gross_margin, None);
        assert_eq!(kpis.total_marketing_spend, None);
        assert_eq!(kpis.roas, None);
    }

    #[test]
    fn margin_and_roas_derive_from_present_columns() {
        let mut clean = fixture(&[
            ("o1", "c1", 800.0, "2024-01"),
            ("o2", "c2", 200.0, "2024-01"),
        ]);
        clean
            .push_column("cost", vec![number(300.0), number(100.0)])
            .unwrap();
        clean
            .push_column("marketing_spend", vec![number(250.0), number(250.0)])
            .unwrap();
        let monthly = monthly_summary(&clean);
        let kpis = compute(&clean, &monthly);
        assert_eq!(kpis.total_cost, Some(400.0));
        assert_eq!(kpis.gross_margin, Some(60.0));
        assert_eq!(kpis.total_marketing_spend, Some(500.0));
        assert_eq!(kpis.roas, Some(2.0));
    }

    #[test]
    fn empty_inputs_yield_the_default_set() {
        let empty = Frame::new(vec!["revenue".to_string()]);
        let kpis = compute(&empty, &[]);
        assert_eq!(kpis, KpiSet::empty());
        assert_eq!(kpis.table_rows().len(), 14);
    }

    #[test]
    fn zero_marketing_spend_gives_zero_roas_not_none() {
        let mut clean = fixture(&[("o1", "c1", 1000.0, "2024-01")]);
        clean.push_column("marketing_spend", vec![number(0.0)]).unwrap();
        let monthly = monthly_summary(&clean);
        let kpis = compute(&clean, &monthly);
        assert_eq!(kpis.total_marketing_spend, Some(0.0));
        assert_eq!(kpis.roas, Some(0.0));
    }
}
