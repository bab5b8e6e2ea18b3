use crate::schema::{AdjustmentKind, ProductRef, ReportInputs, SourceRecord};
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Sale,
    ProductionIn,
    ProductionOut,
}

/// A single stock movement, derived fresh from source rows on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub qty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingProduct,
    MissingDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub missing_product: usize,
    pub missing_date: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.missing_product + self.missing_date
    }

    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingProduct => self.missing_product += 1,
            SkipReason::MissingDate => self.missing_date += 1,
        }
    }
}

/// How many rows of each source made it into the transaction list, and why the rest
/// did not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationSummary {
    pub accepted: usize,
    pub purchases_skipped: SkipCounts,
    pub sales_skipped: SkipCounts,
    pub adjustments_skipped: SkipCounts,
}

impl NormalizationSummary {
    pub fn total_skipped(&self) -> usize {
        self.purchases_skipped.total()
            + self.sales_skipped.total()
            + self.adjustments_skipped.total()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedTransactions {
    pub transactions: Vec<Transaction>,
    pub summary: NormalizationSummary,
}

/// Converts one source row into a transaction, or explains why it cannot be used.
pub fn normalize_record(record: &SourceRecord) -> Result<Transaction, SkipReason> {
    match record {
        SourceRecord::Purchase(line) => build_transaction(
            line.product.as_ref(),
            line.purchase_date,
            TransactionKind::Purchase,
            line.qty.value(),
        ),
        SourceRecord::Sale(line) => build_transaction(
            line.product.as_ref(),
            line.sale_date,
            TransactionKind::Sale,
            line.qty.value(),
        ),
        SourceRecord::Adjustment(adjustment) => {
            let kind = match adjustment.kind {
                AdjustmentKind::Addition => TransactionKind::ProductionIn,
                AdjustmentKind::Removal => TransactionKind::ProductionOut,
            };
            // The calendar date is taken in the batch timestamp's own offset.
            let date = adjustment.adjusted_at.map(|ts| ts.date_naive());
            build_transaction(
                adjustment.product.as_ref(),
                date,
                kind,
                adjustment.quantity.value(),
            )
        }
    }
}

fn build_transaction(
    product: Option<&ProductRef>,
    date: Option<NaiveDate>,
    kind: TransactionKind,
    qty: f64,
) -> Result<Transaction, SkipReason> {
    let product = product
        .filter(|p| !p.id.is_empty())
        .ok_or(SkipReason::MissingProduct)?;
    let date = date.ok_or(SkipReason::MissingDate)?;

    Ok(Transaction {
        product_id: product.id.clone(),
        product_code: product.code.clone(),
        product_name: product.name.clone(),
        date,
        kind,
        qty,
    })
}

/// Normalizes a list of records in order, dropping rows without a product or a date.
pub fn normalize_records(records: &[SourceRecord]) -> NormalizedTransactions {
    let mut transactions = Vec::with_capacity(records.len());
    let mut summary = NormalizationSummary::default();

    for record in records {
        match normalize_record(record) {
            Ok(transaction) => transactions.push(transaction),
            Err(reason) => {
                let counts = match record {
                    SourceRecord::Purchase(_) => &mut summary.purchases_skipped,
                    SourceRecord::Sale(_) => &mut summary.sales_skipped,
                    SourceRecord::Adjustment(_) => &mut summary.adjustments_skipped,
                };
                counts.record(reason);
            }
        }
    }

    summary.accepted = transactions.len();

    if summary.total_skipped() > 0 {
        warn!(
            "Skipped {} source rows without a product or date (purchases: {:?}, sales: {:?}, adjustments: {:?})",
            summary.total_skipped(),
            summary.purchases_skipped,
            summary.sales_skipped,
            summary.adjustments_skipped
        );
    }
    debug!("Normalized {} transactions", summary.accepted);

    NormalizedTransactions {
        transactions,
        summary,
    }
}

pub fn normalize_inputs(inputs: &ReportInputs) -> NormalizedTransactions {
    normalize_records(&inputs.records())
}
