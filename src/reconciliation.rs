//! Production reconciliation between a raw input product and the product made from it.
//!
//! Each displayed month is classified on its own: the raw product's `production_out`
//! is compared with the produced product's `production_in`, and sales of the produced
//! product with no recorded production are flagged. A negative closing stock on the
//! produced product always turns the message into a stock alert.

use crate::engine::{MonthlyBalance, ProductMonthlySeries, RollupResult};
use crate::schema::ProductPairSelector;
use crate::utils::{format_quantity, YearMonth};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Match,
    Mismatch,
    NoProduction,
    Oversold,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Match => "match",
            ReconciliationStatus::Mismatch => "mismatch",
            ReconciliationStatus::NoProduction => "no_production",
            ReconciliationStatus::Oversold => "oversold",
        }
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRow {
    pub month: YearMonth,
    pub raw_used: f64,
    pub produced: f64,
    pub production_difference: f64,
    pub produced_sold: f64,
    pub produced_ending: f64,
    pub status: ReconciliationStatus,
    pub alert_message: String,
}

impl ReconciliationRow {
    pub fn has_alert(&self) -> bool {
        !self.alert_message.is_empty()
    }
}

/// The pair of series a reconciliation pass compares.
#[derive(Debug, Clone, Copy)]
pub struct ProductionPair<'a> {
    pub raw: Option<&'a ProductMonthlySeries>,
    pub produced: Option<&'a ProductMonthlySeries>,
}

impl<'a> ProductionPair<'a> {
    /// Resolves the selector against the rollup. Unresolved products stay `None` and
    /// read as zero activity.
    pub fn resolve(rollup: &'a RollupResult, selector: &ProductPairSelector) -> Self {
        let (raw, produced) = match selector {
            ProductPairSelector::Explicit {
                raw_product_id,
                produced_product_id,
            } => (
                rollup.series_for(raw_product_id),
                rollup.series_for(produced_product_id),
            ),
            ProductPairSelector::NameKeywords {
                raw_keyword,
                produced_keyword,
            } => (
                find_by_name_keyword(rollup, raw_keyword),
                find_by_name_keyword(rollup, produced_keyword),
            ),
        };

        if raw.is_none() {
            warn!("Raw product for {:?} not found; treating as no activity", selector);
        }
        if produced.is_none() {
            warn!(
                "Produced product for {:?} not found; treating as no activity",
                selector
            );
        }

        Self { raw, produced }
    }
}

fn find_by_name_keyword<'a>(
    rollup: &'a RollupResult,
    keyword: &str,
) -> Option<&'a ProductMonthlySeries> {
    let needle = keyword.to_lowercase();
    rollup
        .balances
        .iter()
        .find(|s| s.product.name.to_lowercase().contains(&needle))
}

fn month_balance(series: Option<&ProductMonthlySeries>, month: &YearMonth) -> MonthlyBalance {
    series
        .and_then(|s| s.get(month))
        .copied()
        .unwrap_or_default()
}

pub struct ReconciliationAnalyzer<'a> {
    pair: ProductionPair<'a>,
}

impl<'a> ReconciliationAnalyzer<'a> {
    pub fn new(pair: ProductionPair<'a>) -> Self {
        Self { pair }
    }

    pub fn analyze(&self, months: &[YearMonth]) -> Vec<ReconciliationRow> {
        months.iter().map(|month| self.analyze_month(*month)).collect()
    }

    pub fn analyze_month(&self, month: YearMonth) -> ReconciliationRow {
        let raw = month_balance(self.pair.raw, &month);
        let produced = month_balance(self.pair.produced, &month);

        classify_month(
            month,
            raw.production_out,
            produced.production_in,
            produced.sales,
            produced.ending,
        )
    }
}

/// Classifies one month of production activity.
pub fn classify_month(
    month: YearMonth,
    raw_used: f64,
    produced: f64,
    produced_sold: f64,
    produced_ending: f64,
) -> ReconciliationRow {
    let production_difference = produced - raw_used;

    let (mut status, mut alert_message) =
        if produced_sold > 0.0 && produced == 0.0 && raw_used == 0.0 {
            (
                ReconciliationStatus::NoProduction,
                format!(
                    "{} sold with no recorded production this month",
                    format_quantity(produced_sold)
                ),
            )
        } else if raw_used > 0.0 || produced > 0.0 {
            if production_difference != 0.0 {
                (
                    ReconciliationStatus::Mismatch,
                    format!(
                        "Produced {} from {} raw used (difference {})",
                        format_quantity(produced),
                        format_quantity(raw_used),
                        format_quantity(production_difference)
                    ),
                )
            } else {
                (ReconciliationStatus::Match, String::new())
            }
        } else {
            (ReconciliationStatus::Match, String::new())
        };

    if produced_ending < 0.0 {
        alert_message = format!(
            "Stock alert: closing stock is {} after selling {}",
            format_quantity(produced_ending),
            format_quantity(produced_sold)
        );
        if status == ReconciliationStatus::NoProduction {
            status = ReconciliationStatus::Oversold;
        }
    }

    ReconciliationRow {
        month,
        raw_used,
        produced,
        production_difference,
        produced_sold,
        produced_ending,
        status,
        alert_message,
    }
}

pub fn reconcile_production(
    rollup: &RollupResult,
    selector: &ProductPairSelector,
) -> Vec<ReconciliationRow> {
    let pair = ProductionPair::resolve(rollup, selector);
    ReconciliationAnalyzer::new(pair).analyze(&rollup.months)
}
