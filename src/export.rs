use crate::authorization::{Action, Authorizer, Resource};
use crate::engine::RollupResult;
use crate::error::{InventoryReportError, Result};
use crate::reconciliation::ReconciliationRow;
use crate::utils::format_quantity;
use crate::InventoryReport;
use csv::Writer;
use std::path::Path;

pub const BALANCE_HEADERS: [&str; 10] = [
    "product_code",
    "product_name",
    "month",
    "beginning",
    "purchases",
    "production_in",
    "sales",
    "production_out",
    "ending",
    "variance",
];

pub const RECONCILIATION_HEADERS: [&str; 8] = [
    "month",
    "raw_used",
    "produced",
    "difference",
    "sold",
    "stock_left",
    "status",
    "alert_message",
];

fn finish(writer: Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| InventoryReportError::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

/// One row per (product, displayed month).
pub fn balances_to_csv(rollup: &RollupResult) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(BALANCE_HEADERS)?;

    for series in &rollup.balances {
        for (month, balance) in &series.months {
            writer.write_record([
                series.product.code.clone(),
                series.product.name.clone(),
                month.to_string(),
                format_quantity(balance.beginning),
                format_quantity(balance.purchases),
                format_quantity(balance.production_in),
                format_quantity(balance.sales),
                format_quantity(balance.production_out),
                format_quantity(balance.ending),
                format_quantity(balance.variance),
            ])?;
        }
    }

    finish(writer)
}

pub fn reconciliation_to_csv(rows: &[ReconciliationRow]) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(RECONCILIATION_HEADERS)?;

    for row in rows {
        writer.write_record([
            row.month.to_string(),
            format_quantity(row.raw_used),
            format_quantity(row.produced),
            format_quantity(row.production_difference),
            format_quantity(row.produced_sold),
            format_quantity(row.produced_ending),
            row.status.to_string(),
            row.alert_message.clone(),
        ])?;
    }

    finish(writer)
}

pub fn report_to_json(report: &InventoryReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn markdown_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

pub fn report_to_markdown(report: &InventoryReport) -> String {
    let mut output = String::new();

    output.push_str("# Inventory Report\n\n");
    output.push_str(&format!(
        "**Products:** {}  \n**Months:** {}  \n**Negative closing cells:** {}  \n**Alerting months:** {}  \n**Skipped source rows:** {}\n\n",
        report.summary.product_count,
        report.summary.month_count,
        report.summary.negative_ending_cells,
        report.summary.alerting_months,
        report.normalization.total_skipped()
    ));

    output.push_str("## Closing Stock\n\n");
    output.push_str("| Code | Product | Opening | Purchases | Production In | Sales | Production Out | Closing |\n");
    output.push_str("|------|---------|---------|-----------|---------------|-------|----------------|---------|\n");
    for series in &report.rollup.balances {
        let totals = series.totals();
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
            markdown_cell(&series.product.code),
            markdown_cell(&series.product.name),
            format_quantity(totals.opening),
            format_quantity(totals.purchases),
            format_quantity(totals.production_in),
            format_quantity(totals.sales),
            format_quantity(totals.production_out),
            format_quantity(totals.closing)
        ));
    }

    if !report.reconciliation.is_empty() {
        output.push_str("\n## Production Reconciliation\n\n");
        output.push_str("| Month | Raw Used | Produced | Difference | Sold | Stock Left | Status | Alert |\n");
        output.push_str("|-------|----------|----------|------------|------|------------|--------|-------|\n");
        for row in &report.reconciliation {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                row.month,
                format_quantity(row.raw_used),
                format_quantity(row.produced),
                format_quantity(row.production_difference),
                format_quantity(row.produced_sold),
                format_quantity(row.produced_ending),
                row.status,
                markdown_cell(&row.alert_message)
            ));
        }
    }

    output
}

/// Export surface gated on `(Reports, Export)`.
pub struct ReportExporter<'a, A: Authorizer + ?Sized> {
    authorizer: &'a A,
}

impl<'a, A: Authorizer + ?Sized> ReportExporter<'a, A> {
    pub fn new(authorizer: &'a A) -> Self {
        Self { authorizer }
    }

    fn authorize(&self) -> Result<()> {
        self.authorizer.require(Resource::Reports, Action::Export)
    }

    pub fn balances_csv(&self, report: &InventoryReport) -> Result<String> {
        self.authorize()?;
        balances_to_csv(&report.rollup)
    }

    pub fn reconciliation_csv(&self, report: &InventoryReport) -> Result<String> {
        self.authorize()?;
        reconciliation_to_csv(&report.reconciliation)
    }

    pub fn json(&self, report: &InventoryReport) -> Result<String> {
        self.authorize()?;
        report_to_json(report)
    }

    pub fn markdown(&self, report: &InventoryReport) -> Result<String> {
        self.authorize()?;
        Ok(report_to_markdown(report))
    }

    pub fn write_balances_csv(&self, report: &InventoryReport, path: impl AsRef<Path>) -> Result<()> {
        let csv = self.balances_csv(report)?;
        std::fs::write(path, csv)?;
        Ok(())
    }

    pub fn write_reconciliation_csv(
        &self,
        report: &InventoryReport,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let csv = self.reconciliation_csv(report)?;
        std::fs::write(path, csv)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MonthlyBalance, ProductInfo, ProductMonthlySeries};
    use crate::reconciliation::classify_month;
    use crate::utils::YearMonth;
    use std::collections::BTreeMap;

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    #[test]
    fn test_balances_csv_layout() {
        let mut months = BTreeMap::new();
        months.insert(
            ym(2024, 1),
            MonthlyBalance {
                purchases: 12.5,
                sales: 2.0,
                ending: 10.5,
                ..Default::default()
            },
        );
        let rollup = RollupResult {
            months: vec![ym(2024, 1)],
            balances: vec![ProductMonthlySeries {
                product: ProductInfo {
                    id: "p1".to_string(),
                    code: "SAUCE".to_string(),
                    name: "Sauce, spicy".to_string(),
                },
                months,
            }],
        };

        let csv = balances_to_csv(&rollup).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "product_code,product_name,month,beginning,purchases,production_in,sales,production_out,ending,variance"
        );
        assert_eq!(
            lines.next().unwrap(),
            "SAUCE,\"Sauce, spicy\",2024-01,0,12.5,0,2,0,10.5,0"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let mut months = BTreeMap::new();
        months.insert(ym(2024, 1), MonthlyBalance::default());
        let report = InventoryReport {
            rollup: RollupResult {
                months: vec![ym(2024, 1)],
                balances: vec![ProductMonthlySeries {
                    product: ProductInfo {
                        id: "p1".to_string(),
                        code: "A|B".to_string(),
                        name: "Wings | Thighs".to_string(),
                    },
                    months,
                }],
            },
            reconciliation: Vec::new(),
            normalization: Default::default(),
            summary: Default::default(),
            verification: None,
        };

        let markdown = report_to_markdown(&report);
        assert!(markdown.contains("| A\\|B | Wings \\| Thighs | 0 |"));
    }

    #[test]
    fn test_reconciliation_csv_layout() {
        let rows = vec![
            classify_month(ym(2024, 1), 100.0, 100.0, 0.0, 100.0),
            classify_month(ym(2024, 2), 0.0, 0.0, 5.0, -5.0),
        ];

        let csv = reconciliation_to_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "month,raw_used,produced,difference,sold,stock_left,status,alert_message"
        );
        assert_eq!(lines[1], "2024-01,100,100,0,0,100,match,");
        assert!(lines[2].starts_with("2024-02,0,0,0,5,-5,oversold,"));
    }
}
