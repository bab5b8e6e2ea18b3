use chrono::{DateTime, NaiveDate};
use futures::executor::block_on;
use inventory_rollup::{
    AdjustmentKind, AdjustmentRecord, AllowAll, InMemorySource, InventoryReportProcessor,
    ProductPairSelector, ProductRef, PurchaseLine, ReportConfig, ReportExporter, ReportInputs,
    SaleLine,
};

fn main() {
    let chicken = ProductRef::new("prod-001", "CHK-RAW", "Whole Chicken");
    let marinated = ProductRef::new("prod-002", "CHK-MAR", "Marinated Chicken");

    let inputs = ReportInputs {
        purchases: vec![
            PurchaseLine::new(chicken.clone(), 120.0, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()),
            PurchaseLine::new(chicken.clone(), 80.0, NaiveDate::from_ymd_opt(2024, 2, 2).unwrap()),
        ],
        sales: vec![
            SaleLine::new(marinated.clone(), 70.0, NaiveDate::from_ymd_opt(2024, 1, 25).unwrap()),
            SaleLine::new(marinated.clone(), 45.0, NaiveDate::from_ymd_opt(2024, 2, 20).unwrap()),
            SaleLine::new(marinated.clone(), 12.0, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()),
        ],
        adjustments: vec![
            AdjustmentRecord::new(
                chicken.clone(),
                100.0,
                AdjustmentKind::Removal,
                DateTime::parse_from_rfc3339("2024-01-10T07:30:00+07:00").unwrap(),
            ),
            AdjustmentRecord::new(
                marinated.clone(),
                100.0,
                AdjustmentKind::Addition,
                DateTime::parse_from_rfc3339("2024-01-10T07:30:00+07:00").unwrap(),
            ),
            AdjustmentRecord::new(
                chicken,
                60.0,
                AdjustmentKind::Removal,
                DateTime::parse_from_rfc3339("2024-02-08T07:30:00+07:00").unwrap(),
            ),
            AdjustmentRecord::new(
                marinated,
                55.0,
                AdjustmentKind::Addition,
                DateTime::parse_from_rfc3339("2024-02-08T07:30:00+07:00").unwrap(),
            ),
        ],
    };

    let config = ReportConfig {
        production: Some(ProductPairSelector::explicit("prod-001", "prod-002")),
        verification_tolerance: Some(1e-9),
        ..Default::default()
    };

    let source = InMemorySource::new(inputs);
    let processor = InventoryReportProcessor::new(&config, &AllowAll);
    let report = block_on(processor.load_and_process(&source)).expect("report should build");

    let exporter = ReportExporter::new(&AllowAll);
    println!("{}", exporter.balances_csv(&report).expect("balance export"));
    println!(
        "{}",
        exporter
            .reconciliation_csv(&report)
            .expect("reconciliation export")
    );
    println!("{}", exporter.markdown(&report).expect("markdown export"));
}
