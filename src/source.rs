use crate::error::{InventoryReportError, Result};
use crate::schema::{AdjustmentRecord, PurchaseLine, ReportInputs, SaleLine};
use futures::future;
use futures::TryFutureExt;
use log::{debug, info};
use std::future::Future;

/// Backing store for the three source collections. Each getter is an independent
/// request.
pub trait RecordSource {
    fn purchase_lines(&self) -> impl Future<Output = Result<Vec<PurchaseLine>>> + Send;

    fn sale_lines(&self) -> impl Future<Output = Result<Vec<SaleLine>>> + Send;

    fn adjustment_records(&self) -> impl Future<Output = Result<Vec<AdjustmentRecord>>> + Send;
}

fn fetch_error(collection: &str, error: InventoryReportError) -> InventoryReportError {
    match error {
        e @ InventoryReportError::FetchFailed { .. } => e,
        other => InventoryReportError::FetchFailed {
            collection: collection.to_string(),
            message: other.to_string(),
        },
    }
}

/// Issues all three requests concurrently. The first failure aborts the whole load;
/// no partial inputs are returned and nothing is retried.
pub async fn load_report_inputs<S: RecordSource>(source: &S) -> Result<ReportInputs> {
    info!("Fetching purchases, sales and adjustments");

    let (purchases, sales, adjustments) = futures::try_join!(
        source
            .purchase_lines()
            .map_err(|e| fetch_error("purchases", e)),
        source.sale_lines().map_err(|e| fetch_error("sales", e)),
        source
            .adjustment_records()
            .map_err(|e| fetch_error("adjustments", e)),
    )?;

    debug!(
        "Fetched {} purchase lines, {} sale lines, {} adjustments",
        purchases.len(),
        sales.len(),
        adjustments.len()
    );

    Ok(ReportInputs {
        purchases,
        sales,
        adjustments,
    })
}

/// Like [`load_report_inputs`], but gives up once `timeout` elapses. Dropping the
/// joined future cancels the requests still in flight.
#[cfg(feature = "tokio")]
pub async fn load_report_inputs_with_timeout<S: RecordSource>(
    source: &S,
    timeout: std::time::Duration,
) -> Result<ReportInputs> {
    tokio::time::timeout(timeout, load_report_inputs(source))
        .await
        .map_err(|_| InventoryReportError::FetchTimeout(timeout.as_millis()))?
}

/// A source over collections already held in memory, e.g. a JSON snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    inputs: ReportInputs,
}

impl InMemorySource {
    pub fn new(inputs: ReportInputs) -> Self {
        Self { inputs }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

impl RecordSource for InMemorySource {
    fn purchase_lines(&self) -> impl Future<Output = Result<Vec<PurchaseLine>>> + Send {
        future::ready(Ok(self.inputs.purchases.clone()))
    }

    fn sale_lines(&self) -> impl Future<Output = Result<Vec<SaleLine>>> + Send {
        future::ready(Ok(self.inputs.sales.clone()))
    }

    fn adjustment_records(&self) -> impl Future<Output = Result<Vec<AdjustmentRecord>>> + Send {
        future::ready(Ok(self.inputs.adjustments.clone()))
    }
}
