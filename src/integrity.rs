use crate::engine::{ProductMonthlySeries, RollupResult};
use crate::error::{InventoryReportError, Result};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    pub cells_checked: usize,
    pub warnings: Vec<String>,
}

pub struct RollupVerifier<'a> {
    rollup: &'a RollupResult,
}

impl<'a> RollupVerifier<'a> {
    pub fn new(rollup: &'a RollupResult) -> Self {
        Self { rollup }
    }

    /// Checks conservation for every cell and continuity between adjacent displayed
    /// months. Negative closing stock is reported as a warning, not an error.
    pub fn verify(&self, tolerance: f64) -> Result<VerificationResult> {
        let mut result = VerificationResult::default();

        for series in &self.rollup.balances {
            self.verify_series(series, tolerance, &mut result)?;
        }

        debug!(
            "Verified {} cells with {} warnings",
            result.cells_checked,
            result.warnings.len()
        );

        Ok(result)
    }

    fn verify_series(
        &self,
        series: &ProductMonthlySeries,
        tolerance: f64,
        result: &mut VerificationResult,
    ) -> Result<()> {
        let label = product_label(series);
        let mut previous_ending: Option<f64> = None;

        for (month, balance) in &series.months {
            let expected = balance.expected_ending();
            if (balance.ending - expected).abs() > tolerance {
                return Err(InventoryReportError::ConservationViolation {
                    product: label,
                    month: month.to_string(),
                    ending: balance.ending,
                    expected,
                });
            }

            if let Some(previous) = previous_ending {
                if (balance.beginning - previous).abs() > tolerance {
                    return Err(InventoryReportError::ContinuityViolation {
                        product: label,
                        month: month.to_string(),
                        beginning: balance.beginning,
                        previous_ending: previous,
                    });
                }
            }

            if balance.ending < 0.0 {
                result.warnings.push(format!(
                    "{} closes {} with negative stock {}",
                    label, month, balance.ending
                ));
            }

            previous_ending = Some(balance.ending);
            result.cells_checked += 1;
        }

        Ok(())
    }
}

fn product_label(series: &ProductMonthlySeries) -> String {
    if series.product.code.is_empty() {
        series.product.id.clone()
    } else {
        series.product.code.clone()
    }
}

pub fn verify_rollup(rollup: &RollupResult, tolerance: f64) -> Result<VerificationResult> {
    RollupVerifier::new(rollup).verify(tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MonthlyBalance, ProductInfo};
    use crate::utils::YearMonth;
    use std::collections::BTreeMap;

    fn series(months: Vec<(u32, MonthlyBalance)>) -> RollupResult {
        let months: BTreeMap<YearMonth, MonthlyBalance> = months
            .into_iter()
            .map(|(m, b)| (YearMonth::new(2024, m).unwrap(), b))
            .collect();
        RollupResult {
            months: months.keys().copied().collect(),
            balances: vec![ProductMonthlySeries {
                product: ProductInfo {
                    id: "p1".to_string(),
                    code: "P1".to_string(),
                    name: "Product".to_string(),
                },
                months,
            }],
        }
    }

    #[test]
    fn test_consistent_rollup_verifies() {
        let rollup = series(vec![
            (
                1,
                MonthlyBalance {
                    purchases: 10.0,
                    ending: 10.0,
                    ..Default::default()
                },
            ),
            (
                2,
                MonthlyBalance {
                    beginning: 10.0,
                    sales: 15.0,
                    ending: -5.0,
                    ..Default::default()
                },
            ),
        ]);

        let result = verify_rollup(&rollup, 0.0).unwrap();
        assert_eq!(result.cells_checked, 2);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("2024-02"));
    }

    #[test]
    fn test_conservation_violation() {
        let rollup = series(vec![(
            1,
            MonthlyBalance {
                purchases: 10.0,
                ending: 9.0,
                ..Default::default()
            },
        )]);

        let result = verify_rollup(&rollup, 0.01);
        assert!(matches!(
            result,
            Err(InventoryReportError::ConservationViolation { .. })
        ));
    }

    #[test]
    fn test_continuity_violation() {
        let rollup = series(vec![
            (
                1,
                MonthlyBalance {
                    purchases: 10.0,
                    ending: 10.0,
                    ..Default::default()
                },
            ),
            (
                2,
                MonthlyBalance {
                    beginning: 8.0,
                    ending: 8.0,
                    ..Default::default()
                },
            ),
        ]);

        let result = verify_rollup(&rollup, 0.01);
        assert!(matches!(
            result,
            Err(InventoryReportError::ContinuityViolation { .. })
        ));
    }
}
