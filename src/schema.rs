//! Canonical schema configuration: the logical fields the pipeline normalizes
//! every input onto, with their priority-ordered alias lists, plus the shared
//! cleaning configuration (currency symbols, explicit date formats, text
//! fields).
//!
//! This is plain data, injected by value into mapper and cleaner calls. It is
//! never mutated during a run; callers who need different alias lists load
//! their own copy from YAML with [`CanonicalSchema::load`].

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

pub const DATE: &str = "date";
pub const ORDER_ID: &str = "order_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const REVENUE: &str = "revenue";
pub const COST: &str = "cost";
pub const CHANNEL: &str = "channel";
pub const REGION: &str = "region";
pub const CATEGORY: &str = "category";
pub const DEVICE: &str = "device";
pub const MARKETING_SPEND: &str = "marketing_spend";
pub const YEAR_MONTH: &str = "year_month";

/// Monetary fields that go through currency stripping and numeric coercion.
pub const NUMERIC_FIELDS: &[&str] = &[REVENUE, COST, MARKETING_SPEND];

/// Optional numeric fields where a missing value means "no spend", not
/// "unknown"; nulls are filled with zero after coercion.
pub const FILL_ZERO_FIELDS: &[&str] = &[COST, MARKETING_SPEND];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    /// Acceptable source-column spellings, most specific first. List order is
    /// the binding priority.
    pub aliases: Vec<String>,
}

impl FieldSpec {
    fn new(name: &str, aliases: &[&str]) -> Self {
        FieldSpec {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalSchema {
    pub required: Vec<FieldSpec>,
    pub optional: Vec<FieldSpec>,
    /// Symbols stripped from monetary values before numeric coercion.
    pub currency_symbols: Vec<char>,
    /// Explicit formats swept when general date parsing fails on most rows.
    pub date_formats: Vec<String>,
    /// Categorical fields normalized to trimmed lowercase text.
    pub text_fields: Vec<String>,
}

impl Default for CanonicalSchema {
    fn default() -> Self {
        CanonicalSchema {
            required: vec![
                FieldSpec::new(
                    DATE,
                    &[
                        "date",
                        "order_date",
                        "purchase_date",
                        "transaction_date",
                        "created_at",
                        "created_date",
                        "sale_date",
                        "invoice_date",
                        "dt",
                        "dates",
                    ],
                ),
                FieldSpec::new(
                    ORDER_ID,
                    &[
                        "order_id",
                        "orderid",
                        "order_number",
                        "order_no",
                        "transaction_id",
                        "txn_id",
                        "invoice_id",
                        "id",
                    ],
                ),
                FieldSpec::new(
                    CUSTOMER_ID,
                    &[
                        "customer_id",
                        "customerid",
                        "cust_id",
                        "custid",
                        "client_id",
                        "user_id",
                        "userid",
                        "buyer_id",
                    ],
                ),
                FieldSpec::new(
                    REVENUE,
                    &[
                        "revenue",
                        "sales",
                        "amount",
                        "total_amount",
                        "order_value",
                        "total_sales",
                        "total_revenue",
                        "sale_amount",
                        "gmv",
                        "gross_revenue",
                        "net_revenue",
                        "price",
                        "total_price",
                        "order_amount",
                        "transaction_amount",
                    ],
                ),
            ],
            optional: vec![
                FieldSpec::new(
                    COST,
                    &[
                        "cost",
                        "total_cost",
                        "cogs",
                        "cost_of_goods",
                        "expense",
                        "product_cost",
                    ],
                ),
                FieldSpec::new(
                    CHANNEL,
                    &[
                        "channel",
                        "source",
                        "traffic_source",
                        "acquisition_channel",
                        "utm_source",
                        "marketing_channel",
                        "medium",
                    ],
                ),
                FieldSpec::new(
                    REGION,
                    &[
                        "region",
                        "location",
                        "area",
                        "zone",
                        "city",
                        "state",
                        "country",
                        "geography",
                        "geo",
                    ],
                ),
                FieldSpec::new(
                    CATEGORY,
                    &[
                        "category",
                        "product_category",
                        "item_category",
                        "department",
                        "product_type",
                        "type",
                        "segment",
                    ],
                ),
                FieldSpec::new(
                    DEVICE,
                    &["device", "device_type", "platform", "device_category"],
                ),
                FieldSpec::new(
                    MARKETING_SPEND,
                    &[
                        "marketing_spend",
                        "ad_spend",
                        "spend",
                        "marketing_cost",
                        "advertising_cost",
                        "campaign_cost",
                        "media_spend",
                    ],
                ),
            ],
            currency_symbols: vec!['₹', '$', '€', '£', '¥', ','],
            date_formats: [
                "%Y-%m-%d",
                "%d-%m-%Y",
                "%m-%d-%Y",
                "%d/%m/%Y",
                "%m/%d/%Y",
                "%Y/%m/%d",
                "%d %b %Y",
                "%d %B %Y",
                "%b %d, %Y",
                "%B %d, %Y",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
            text_fields: [CHANNEL, REGION, CATEGORY, DEVICE]
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

impl CanonicalSchema {
    /// All field specs in binding priority order: required first, then
    /// optional, each in declared order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.required.iter().chain(self.optional.iter())
    }

    pub fn required_names(&self) -> Vec<&str> {
        self.required.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: CanonicalSchema =
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.required.is_empty(),
            "Schema must declare at least one required field"
        );
        for field in self.fields() {
            ensure!(!field.name.trim().is_empty(), "Field name cannot be empty");
            ensure!(
                !field.aliases.is_empty(),
                "Field '{}' has no aliases",
                field.name
            );
        }
        ensure!(
            !self.date_formats.is_empty(),
            "Schema must list at least one explicit date format"
        );
        Ok(())
    }
}
