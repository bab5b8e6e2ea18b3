//! # Inventory Rollup
//!
//! A library for turning a retail back-office's purchase lines, sale lines and stock
//! adjustments into monthly inventory balances per product, and for reconciling a raw
//! input product against the product made from it.
//!
//! ## Core Concepts
//!
//! - **Transactions**: every source row is normalized into a single stock movement
//!   (purchase, sale, production in, production out). Rows without a product or a date
//!   are skipped and counted.
//! - **Running Balance**: each product's stock is carried month to month from the first
//!   recorded transaction. A date range narrows the months shown, never the arithmetic.
//! - **Integrity**: `ending = beginning + purchases + production_in - sales - production_out`
//!   for every cell, and each month begins where the previous one ended.
//! - **Production Reconciliation**: raw consumption is compared with produced output
//!   month by month, flagging mismatches, sales without production and oversold stock.
//!
//! ## Features
//!
//! - `tokio`: enables `load_report_inputs_with_timeout`. Its tests only build with the
//!   feature on, so run `cargo test --features tokio` to cover the timeout path.
//!
//! ## Example
//!
//! ```rust,ignore
//! use inventory_rollup::*;
//! use chrono::NaiveDate;
//!
//! let chicken = ProductRef::new("p-raw", "CHK", "Whole Chicken");
//! let inputs = ReportInputs {
//!     purchases: vec![PurchaseLine::new(
//!         chicken,
//!         120.0,
//!         NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
//!     )],
//!     ..Default::default()
//! };
//!
//! let config = ReportConfig {
//!     production: Some(ProductPairSelector::explicit("p-raw", "p-marinated")),
//!     ..Default::default()
//! };
//!
//! let report = process_inventory_report(&config, &inputs, &AllowAll).unwrap();
//! let csv = ReportExporter::new(&AllowAll).balances_csv(&report).unwrap();
//! ```

pub mod authorization;
pub mod engine;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod integrity;
pub mod reconciliation;
pub mod schema;
pub mod source;
pub mod utils;

pub use authorization::{
    Action, AllowAll, Authorizer, PermissionGrant, Resource, RoleAuthorizer, RoleGrants,
};
pub use engine::{
    rollup_transactions, MonthlyBalance, MovementTotals, ProductInfo, ProductMonthlySeries,
    RollupEngine, RollupResult,
};
pub use error::{InventoryReportError, Result};
pub use export::{
    balances_to_csv, reconciliation_to_csv, report_to_json, report_to_markdown, ReportExporter,
};
pub use ingestion::*;
pub use integrity::{verify_rollup, RollupVerifier, VerificationResult};
pub use reconciliation::{
    classify_month, reconcile_production, ProductionPair, ReconciliationAnalyzer,
    ReconciliationRow, ReconciliationStatus,
};
pub use schema::*;
pub use source::{load_report_inputs, InMemorySource, RecordSource};
#[cfg(feature = "tokio")]
pub use source::load_report_inputs_with_timeout;
pub use utils::*;

use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub product_count: usize,
    pub month_count: usize,
    /// (product, month) cells that close with negative stock.
    pub negative_ending_cells: usize,
    /// Reconciliation months carrying an alert message.
    pub alerting_months: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryReport {
    pub rollup: RollupResult,
    pub reconciliation: Vec<ReconciliationRow>,
    pub normalization: NormalizationSummary,
    pub summary: ReportSummary,
    pub verification: Option<VerificationResult>,
}

pub struct InventoryReportProcessor<'a, A: Authorizer + ?Sized> {
    config: &'a ReportConfig,
    authorizer: &'a A,
}

impl<'a, A: Authorizer + ?Sized> InventoryReportProcessor<'a, A> {
    pub fn new(config: &'a ReportConfig, authorizer: &'a A) -> Self {
        Self { config, authorizer }
    }

    pub fn process(&self, inputs: &ReportInputs) -> Result<InventoryReport> {
        self.authorizer.require(Resource::Reports, Action::View)?;
        self.config.validate()?;

        info!(
            "Building inventory report from {} source rows",
            inputs.len()
        );

        let normalized = normalize_inputs(inputs);
        let rollup = rollup_transactions(&normalized.transactions, &self.config.date_range);

        let reconciliation = match &self.config.production {
            Some(selector) => reconcile_production(&rollup, selector),
            None => {
                debug!("No production pair configured; skipping reconciliation");
                Vec::new()
            }
        };

        let verification = match self.config.verification_tolerance {
            Some(tolerance) => Some(verify_rollup(&rollup, tolerance)?),
            None => None,
        };

        let summary = summarize(&rollup, &reconciliation);

        info!(
            "Inventory report ready: {} products over {} months, {} alerting months",
            summary.product_count, summary.month_count, summary.alerting_months
        );

        Ok(InventoryReport {
            rollup,
            reconciliation,
            normalization: normalized.summary,
            summary,
            verification,
        })
    }

    pub fn process_with_verification(
        &self,
        inputs: &ReportInputs,
        tolerance: f64,
    ) -> Result<InventoryReport> {
        let mut report = self.process(inputs)?;

        if report.verification.is_none() {
            report.verification = Some(verify_rollup(&report.rollup, tolerance)?);
        }

        Ok(report)
    }

    /// Fetches all inputs from `source` and builds the report. A failed fetch surfaces
    /// as a single error and no report is computed.
    pub async fn load_and_process<S: RecordSource>(&self, source: &S) -> Result<InventoryReport> {
        self.authorizer.require(Resource::Reports, Action::View)?;
        let inputs = load_report_inputs(source).await?;
        self.process(&inputs)
    }
}

fn summarize(rollup: &RollupResult, reconciliation: &[ReconciliationRow]) -> ReportSummary {
    let negative_ending_cells = rollup
        .balances
        .iter()
        .flat_map(|s| s.months.values())
        .filter(|b| b.ending < 0.0)
        .count();

    ReportSummary {
        product_count: rollup.balances.len(),
        month_count: rollup.months.len(),
        negative_ending_cells,
        alerting_months: reconciliation.iter().filter(|r| r.has_alert()).count(),
    }
}

pub fn process_inventory_report<A: Authorizer + ?Sized>(
    config: &ReportConfig,
    inputs: &ReportInputs,
    authorizer: &A,
) -> Result<InventoryReport> {
    InventoryReportProcessor::new(config, authorizer).process(inputs)
}

pub fn process_with_verification<A: Authorizer + ?Sized>(
    config: &ReportConfig,
    inputs: &ReportInputs,
    authorizer: &A,
    tolerance: f64,
) -> Result<InventoryReport> {
    InventoryReportProcessor::new(config, authorizer).process_with_verification(inputs, tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw() -> ProductRef {
        ProductRef::new("p-raw", "CHK", "Whole Chicken")
    }

    fn marinated() -> ProductRef {
        ProductRef::new("p-mar", "MAR", "Marinated Chicken")
    }

    fn inputs() -> ReportInputs {
        ReportInputs {
            purchases: vec![PurchaseLine::new(raw(), 100.0, date(2024, 1, 2))],
            sales: vec![
                SaleLine::new(marinated(), 30.0, date(2024, 1, 20)),
                SaleLine::new(marinated(), 15.0, date(2024, 2, 10)),
            ],
            adjustments: vec![
                AdjustmentRecord::new(
                    raw(),
                    40.0,
                    AdjustmentKind::Removal,
                    DateTime::parse_from_rfc3339("2024-01-10T08:00:00+00:00").unwrap(),
                ),
                AdjustmentRecord::new(
                    marinated(),
                    40.0,
                    AdjustmentKind::Addition,
                    DateTime::parse_from_rfc3339("2024-01-10T09:00:00+00:00").unwrap(),
                ),
            ],
        }
    }

    #[test]
    fn test_end_to_end_processing() {
        let config = ReportConfig {
            production: Some(ProductPairSelector::explicit("p-raw", "p-mar")),
            verification_tolerance: Some(0.0),
            ..Default::default()
        };

        let report = process_inventory_report(&config, &inputs(), &AllowAll).unwrap();

        assert_eq!(report.summary.product_count, 2);
        assert_eq!(report.summary.month_count, 2);
        assert_eq!(report.reconciliation.len(), 2);

        let jan = &report.reconciliation[0];
        assert_eq!(jan.status, ReconciliationStatus::Match);
        assert_eq!(jan.produced_ending, 10.0);

        // February sells 15 with nothing produced and closes at -5.
        let feb = &report.reconciliation[1];
        assert_eq!(feb.status, ReconciliationStatus::Oversold);
        assert_eq!(report.summary.alerting_months, 1);
        assert_eq!(report.summary.negative_ending_cells, 1);

        let verification = report.verification.unwrap();
        assert_eq!(verification.cells_checked, 4);
        assert_eq!(verification.warnings.len(), 1);
    }

    #[test]
    fn test_reconciliation_skipped_without_pair() {
        let report =
            process_inventory_report(&ReportConfig::default(), &inputs(), &AllowAll).unwrap();
        assert!(report.reconciliation.is_empty());
        assert!(report.verification.is_none());
    }

    #[test]
    fn test_processing_requires_view_permission() {
        let auth = RoleAuthorizer::from_roles(&[]);
        let result = process_inventory_report(&ReportConfig::default(), &inputs(), &auth);
        assert!(matches!(
            result,
            Err(InventoryReportError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        let config = ReportConfig {
            date_range: DateRange::between(date(2024, 3, 1), date(2024, 1, 1)),
            ..Default::default()
        };
        let result = process_inventory_report(&config, &inputs(), &AllowAll);
        assert!(matches!(
            result,
            Err(InventoryReportError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_process_with_verification() {
        let report =
            process_with_verification(&ReportConfig::default(), &inputs(), &AllowAll, 1e-9)
                .unwrap();
        assert!(report.verification.is_some());
    }
}
