use crate::ingestion::{Transaction, TransactionKind};
use crate::schema::DateRange;
use crate::utils::YearMonth;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Stock position of one product over one calendar month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    pub beginning: f64,
    pub purchases: f64,
    pub sales: f64,
    pub production_in: f64,
    pub production_out: f64,
    pub ending: f64,
    /// Reserved for physical-count reconciliation; always zero.
    pub variance: f64,
}

impl MonthlyBalance {
    /// Expected ending balance from the month's movements.
    pub fn expected_ending(&self) -> f64 {
        self.beginning + self.purchases + self.production_in - self.sales - self.production_out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMonthlySeries {
    pub product: ProductInfo,
    pub months: BTreeMap<YearMonth, MonthlyBalance>,
}

/// Movement totals for one product across the months held in its series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementTotals {
    pub opening: f64,
    pub purchases: f64,
    pub sales: f64,
    pub production_in: f64,
    pub production_out: f64,
    pub closing: f64,
}

impl ProductMonthlySeries {
    pub fn get(&self, month: &YearMonth) -> Option<&MonthlyBalance> {
        self.months.get(month)
    }

    pub fn totals(&self) -> MovementTotals {
        let mut totals = MovementTotals {
            opening: self
                .months
                .values()
                .next()
                .map(|b| b.beginning)
                .unwrap_or(0.0),
            closing: self
                .months
                .values()
                .next_back()
                .map(|b| b.ending)
                .unwrap_or(0.0),
            ..Default::default()
        };

        for balance in self.months.values() {
            totals.purchases += balance.purchases;
            totals.sales += balance.sales;
            totals.production_in += balance.production_in;
            totals.production_out += balance.production_out;
        }

        totals
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollupResult {
    pub balances: Vec<ProductMonthlySeries>,
    pub months: Vec<YearMonth>,
}

impl RollupResult {
    pub fn series_for(&self, product_id: &str) -> Option<&ProductMonthlySeries> {
        self.balances.iter().find(|s| s.product.id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Movements {
    purchases: f64,
    sales: f64,
    production_in: f64,
    production_out: f64,
}

impl Movements {
    fn add(&mut self, kind: TransactionKind, qty: f64) {
        match kind {
            TransactionKind::Purchase => self.purchases += qty,
            TransactionKind::Sale => self.sales += qty,
            TransactionKind::ProductionIn => self.production_in += qty,
            TransactionKind::ProductionOut => self.production_out += qty,
        }
    }
}

pub struct RollupEngine {
    display_range: DateRange,
}

impl RollupEngine {
    pub fn new(display_range: DateRange) -> Self {
        Self { display_range }
    }

    pub fn rollup(&self, transactions: &[Transaction]) -> RollupResult {
        let mut sorted: Vec<&Transaction> = transactions.iter().collect();
        // Stable: same-day transactions keep their source order.
        sorted.sort_by_key(|t| t.date);

        let all_months: Vec<YearMonth> = sorted
            .iter()
            .map(|t| YearMonth::from_date(t.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut products: Vec<ProductInfo> = Vec::new();
        let mut product_index: HashMap<&str, usize> = HashMap::new();
        let mut movements: Vec<BTreeMap<YearMonth, Movements>> = Vec::new();

        for transaction in &sorted {
            let idx = *product_index
                .entry(transaction.product_id.as_str())
                .or_insert_with(|| {
                    products.push(ProductInfo {
                        id: transaction.product_id.clone(),
                        code: transaction.product_code.clone(),
                        name: transaction.product_name.clone(),
                    });
                    movements.push(BTreeMap::new());
                    products.len() - 1
                });

            movements[idx]
                .entry(YearMonth::from_date(transaction.date))
                .or_default()
                .add(transaction.kind, transaction.qty);
        }

        let balances: Vec<ProductMonthlySeries> = products
            .into_iter()
            .zip(movements)
            .map(|(product, by_month)| ProductMonthlySeries {
                product,
                months: self.fold_running_balance(&all_months, &by_month),
            })
            .collect();

        let months: Vec<YearMonth> = all_months
            .into_iter()
            .filter(|m| self.display_range.contains_month(*m))
            .collect();

        debug!(
            "Rolled up {} transactions into {} products over {} displayed months",
            transactions.len(),
            balances.len(),
            months.len()
        );

        RollupResult { balances, months }
    }

    fn fold_running_balance(
        &self,
        all_months: &[YearMonth],
        by_month: &BTreeMap<YearMonth, Movements>,
    ) -> BTreeMap<YearMonth, MonthlyBalance> {
        let mut series = BTreeMap::new();
        let mut running_balance = 0.0;

        for month in all_months {
            let moved = by_month.get(month).copied().unwrap_or_default();
            let mut balance = MonthlyBalance {
                beginning: running_balance,
                purchases: moved.purchases,
                sales: moved.sales,
                production_in: moved.production_in,
                production_out: moved.production_out,
                ending: 0.0,
                variance: 0.0,
            };
            balance.ending = balance.expected_ending();
            running_balance = balance.ending;

            if self.display_range.contains_month(*month) {
                series.insert(*month, balance);
            }
        }

        series
    }
}

pub fn rollup_transactions(transactions: &[Transaction], display_range: &DateRange) -> RollupResult {
    RollupEngine::new(display_range.clone()).rollup(transactions)
}
