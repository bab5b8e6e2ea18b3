use crate::error::{InventoryReportError, Result};
use crate::utils::{parse_numeric_or_zero, YearMonth};
use chrono::{DateTime, FixedOffset, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProductRef {
    #[schemars(description = "Stable product identifier from the product catalogue")]
    pub id: String,

    #[serde(default)]
    #[schemars(description = "Short product code shown in reports (e.g. 'CHK-RAW')")]
    pub code: String,

    #[serde(default)]
    #[schemars(description = "Human readable product name")]
    pub name: String,
}

impl ProductRef {
    pub fn new(id: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
        }
    }
}

/// A quantity as delivered by the backing store: a number, numeric text, null, or
/// anything else the store happens to hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawQuantity {
    Number(f64),
    Text(String),
    Missing,
    Unparsed(serde_json::Value),
}

impl Default for RawQuantity {
    fn default() -> Self {
        Self::Missing
    }
}

impl RawQuantity {
    /// Resolves to a finite number, or zero when the value cannot be interpreted.
    pub fn value(&self) -> f64 {
        match self {
            RawQuantity::Number(v) if v.is_finite() => *v,
            RawQuantity::Number(_) => 0.0,
            RawQuantity::Text(text) => parse_numeric_or_zero(text),
            RawQuantity::Missing | RawQuantity::Unparsed(_) => 0.0,
        }
    }
}

impl From<f64> for RawQuantity {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawQuantity {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PurchaseLine {
    #[serde(default)]
    pub product: Option<ProductRef>,

    #[serde(default)]
    pub qty: RawQuantity,

    #[serde(default)]
    #[schemars(description = "Date of the parent purchase document")]
    pub purchase_date: Option<NaiveDate>,
}

impl PurchaseLine {
    pub fn new(product: ProductRef, qty: impl Into<RawQuantity>, purchase_date: NaiveDate) -> Self {
        Self {
            product: Some(product),
            qty: qty.into(),
            purchase_date: Some(purchase_date),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SaleLine {
    #[serde(default)]
    pub product: Option<ProductRef>,

    #[serde(default)]
    pub qty: RawQuantity,

    #[serde(default)]
    #[schemars(description = "Date of the parent sale document")]
    pub sale_date: Option<NaiveDate>,
}

impl SaleLine {
    pub fn new(product: ProductRef, qty: impl Into<RawQuantity>, sale_date: NaiveDate) -> Self {
        Self {
            product: Some(product),
            qty: qty.into(),
            sale_date: Some(sale_date),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    #[schemars(description = "Stock added by production (e.g. marinated output)")]
    Addition,

    #[default]
    #[schemars(description = "Stock consumed by production or written off")]
    Removal,
}

/// Only the exact string `"addition"` adds stock. Any other value, including a
/// missing or non-string kind, reads as a removal.
fn lenient_adjustment_kind<'de, D>(deserializer: D) -> std::result::Result<AdjustmentKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(kind)) if kind == "addition" => AdjustmentKind::Addition,
        _ => AdjustmentKind::Removal,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AdjustmentRecord {
    #[serde(default)]
    pub product: Option<ProductRef>,

    #[serde(default)]
    pub quantity: RawQuantity,

    #[serde(default, deserialize_with = "lenient_adjustment_kind")]
    pub kind: AdjustmentKind,

    #[serde(default)]
    #[schemars(description = "Timestamp of the parent adjustment batch (RFC 3339)")]
    pub adjusted_at: Option<DateTime<FixedOffset>>,
}

impl AdjustmentRecord {
    pub fn new(
        product: ProductRef,
        quantity: impl Into<RawQuantity>,
        kind: AdjustmentKind,
        adjusted_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            product: Some(product),
            quantity: quantity.into(),
            kind,
            adjusted_at: Some(adjusted_at),
        }
    }
}

/// One row from any of the three source collections.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceRecord {
    Purchase(PurchaseLine),
    Sale(SaleLine),
    Adjustment(AdjustmentRecord),
}

/// The three collections fetched from the backing store for one report pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReportInputs {
    #[serde(default)]
    pub purchases: Vec<PurchaseLine>,
    #[serde(default)]
    pub sales: Vec<SaleLine>,
    #[serde(default)]
    pub adjustments: Vec<AdjustmentRecord>,
}

impl ReportInputs {
    /// Flattens the collections into source order: purchases, then sales, then adjustments.
    pub fn records(&self) -> Vec<SourceRecord> {
        self.purchases
            .iter()
            .cloned()
            .map(SourceRecord::Purchase)
            .chain(self.sales.iter().cloned().map(SourceRecord::Sale))
            .chain(self.adjustments.iter().cloned().map(SourceRecord::Adjustment))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.purchases.len() + self.sales.len() + self.adjustments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
    #[serde(default)]
    #[schemars(description = "First day to display (inclusive). Months are shown when they overlap the range.")]
    pub from: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Last day to display (inclusive)")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains_month(&self, month: YearMonth) -> bool {
        let after_start = self
            .from
            .map_or(true, |from| month >= YearMonth::from_date(from));
        let before_end = self.to.map_or(true, |to| month <= YearMonth::from_date(to));
        after_start && before_end
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(InventoryReportError::InvalidDateRange {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "selector", rename_all = "snake_case")]
pub enum ProductPairSelector {
    #[schemars(description = "Select the raw input and produced output products by identifier.")]
    Explicit {
        raw_product_id: String,
        produced_product_id: String,
    },

    #[schemars(
        description = "Select the first product whose name contains each keyword (case-insensitive). Depends on naming conventions; prefer Explicit."
    )]
    NameKeywords {
        raw_keyword: String,
        produced_keyword: String,
    },
}

impl ProductPairSelector {
    pub fn explicit(raw_product_id: impl Into<String>, produced_product_id: impl Into<String>) -> Self {
        Self::Explicit {
            raw_product_id: raw_product_id.into(),
            produced_product_id: produced_product_id.into(),
        }
    }

    pub fn name_keywords(raw_keyword: impl Into<String>, produced_keyword: impl Into<String>) -> Self {
        Self::NameKeywords {
            raw_keyword: raw_keyword.into(),
            produced_keyword: produced_keyword.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        let (raw, produced) = match self {
            ProductPairSelector::Explicit {
                raw_product_id,
                produced_product_id,
            } => (raw_product_id, produced_product_id),
            ProductPairSelector::NameKeywords {
                raw_keyword,
                produced_keyword,
            } => (raw_keyword, produced_keyword),
        };

        if raw.trim().is_empty() || produced.trim().is_empty() {
            return Err(InventoryReportError::InvalidConfig(
                "production pair selector needs both a raw and a produced product".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReportConfig {
    #[serde(default)]
    #[schemars(description = "Narrows the displayed months. Balances always accumulate from the first recorded transaction.")]
    pub date_range: DateRange,

    #[serde(default)]
    #[schemars(description = "Raw input / produced output pair to reconcile. Reconciliation is skipped when absent.")]
    pub production: Option<ProductPairSelector>,

    #[serde(default)]
    #[schemars(description = "When set, the rollup is verified for conservation and continuity within this tolerance.")]
    pub verification_tolerance: Option<f64>,
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ReportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.date_range.validate()?;

        if let Some(selector) = &self.production {
            selector.validate()?;
        }

        if let Some(tolerance) = self.verification_tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(InventoryReportError::InvalidConfig(format!(
                    "verification tolerance must be a non-negative number, got {}",
                    tolerance
                )));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_generation() {
        let schema_json = ReportConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("date_range"));
        assert!(schema_json.contains("production"));
        assert!(schema_json.contains("verification_tolerance"));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "date_range": { "from": "2024-02-01", "to": "2024-04-30" },
            "production": {
                "selector": "explicit",
                "raw_product_id": "p-raw",
                "produced_product_id": "p-out"
            },
            "verification_tolerance": 0.001
        }"#;

        let config = ReportConfig::from_json_str(json).unwrap();
        assert_eq!(
            config.production,
            Some(ProductPairSelector::explicit("p-raw", "p-out"))
        );
        assert_eq!(
            config.date_range.from,
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
    }

    #[test]
    fn test_config_rejects_reversed_range() {
        let json = r#"{ "date_range": { "from": "2024-05-01", "to": "2024-04-30" } }"#;
        let result = ReportConfig::from_json_str(json);
        assert!(matches!(
            result,
            Err(InventoryReportError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_config_rejects_blank_keywords() {
        let config = ReportConfig {
            production: Some(ProductPairSelector::name_keywords("chicken", " ")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_date_range_month_overlap() {
        let range = DateRange::between(
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        );
        assert!(!range.contains_month(YearMonth::new(2024, 1).unwrap()));
        assert!(range.contains_month(YearMonth::new(2024, 2).unwrap()));
        assert!(range.contains_month(YearMonth::new(2024, 4).unwrap()));
        assert!(!range.contains_month(YearMonth::new(2024, 5).unwrap()));
        assert!(DateRange::all().contains_month(YearMonth::new(1999, 1).unwrap()));
    }

    #[test]
    fn test_raw_quantity_deserialization() {
        let line: PurchaseLine = serde_json::from_str(
            r#"{ "product": { "id": "p1" }, "qty": "12.5", "purchase_date": "2024-01-03" }"#,
        )
        .unwrap();
        assert_eq!(line.qty.value(), 12.5);

        let line: PurchaseLine =
            serde_json::from_str(r#"{ "product": null, "qty": null }"#).unwrap();
        assert!(line.product.is_none());
        assert_eq!(line.qty, RawQuantity::Missing);
        assert_eq!(line.qty.value(), 0.0);

        let line: SaleLine = serde_json::from_str(r#"{ "qty": "lots" }"#).unwrap();
        assert_eq!(line.qty.value(), 0.0);

        for odd in [r#"true"#, r#"{ "amount": 3 }"#, r#"[1, 2]"#] {
            let json = format!(r#"{{ "product": {{ "id": "p1" }}, "qty": {} }}"#, odd);
            let line: PurchaseLine = serde_json::from_str(&json).unwrap();
            assert!(matches!(line.qty, RawQuantity::Unparsed(_)));
            assert_eq!(line.qty.value(), 0.0);
        }
    }

    #[test]
    fn test_adjustment_kind_defaults_to_removal() {
        let parse = |json: &str| serde_json::from_str::<AdjustmentRecord>(json).unwrap().kind;

        assert_eq!(
            parse(r#"{ "product": { "id": "p1" }, "quantity": 1, "kind": "addition" }"#),
            AdjustmentKind::Addition
        );
        assert_eq!(
            parse(r#"{ "product": { "id": "p1" }, "quantity": 1, "kind": "correction" }"#),
            AdjustmentKind::Removal
        );
        assert_eq!(
            parse(r#"{ "product": { "id": "p1" }, "quantity": 1, "kind": "Addition" }"#),
            AdjustmentKind::Removal
        );
        assert_eq!(
            parse(r#"{ "product": { "id": "p1" }, "quantity": 1, "kind": null }"#),
            AdjustmentKind::Removal
        );
        assert_eq!(
            parse(r#"{ "product": { "id": "p1" }, "quantity": 1, "kind": 7 }"#),
            AdjustmentKind::Removal
        );
        assert_eq!(
            parse(r#"{ "product": { "id": "p1" }, "quantity": 1 }"#),
            AdjustmentKind::Removal
        );
    }

    #[test]
    fn test_source_record_tagging() {
        let record: SourceRecord = serde_json::from_str(
            r#"{
                "source": "adjustment",
                "product": { "id": "p1", "code": "C1", "name": "Raw Chicken" },
                "quantity": 4,
                "kind": "removal",
                "adjusted_at": "2024-03-31T23:30:00+07:00"
            }"#,
        )
        .unwrap();

        match record {
            SourceRecord::Adjustment(adj) => {
                assert_eq!(adj.kind, AdjustmentKind::Removal);
                assert_eq!(adj.quantity.value(), 4.0);
            }
            other => panic!("expected adjustment, got {:?}", other),
        }
    }

    #[test]
    fn test_records_preserve_source_order() {
        let product = ProductRef::new("p1", "C1", "Thing");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let inputs = ReportInputs {
            purchases: vec![PurchaseLine::new(product.clone(), 1.0, date)],
            sales: vec![SaleLine::new(product, 1.0, date)],
            adjustments: vec![],
        };

        let records = inputs.records();
        assert_eq!(inputs.len(), 2);
        assert!(matches!(records[0], SourceRecord::Purchase(_)));
        assert!(matches!(records[1], SourceRecord::Sale(_)));
    }
}
