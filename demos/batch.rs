//! # Example: Batch
//!
//! Pushes a set of fake downloads through four workers. Odd ids fail and are
//! reported on the error sink; the batch keeps going.
//!
//! ```text
//! $ cargo run --example batch
//! ```

use std::time::Duration;

use hostvisor::{Batch, WorkError, logging};

#[tokio::main]
async fn main() -> Result<(), hostvisor::BoxError> {
    logging::init(Some(tracing::Level::INFO))?;

    let (errors_tx, mut errors_rx) = tokio::sync::mpsc::channel(64);
    let errors = tokio::spawn(async move {
        let mut failed = Vec::new();
        while let Some(err) = errors_rx.recv().await {
            failed.push(err);
        }
        failed
    });

    let report = Batch::new(
        |id: u32| async move {
            tokio::time::sleep(Duration::from_millis(50 + u64::from(id % 5) * 10)).await;
            if id % 2 == 1 {
                return Err(WorkError::fail(format!("download {id}: connection reset")));
            }
            tracing::info!(id, "downloaded");
            Ok(())
        },
        1..=20,
    )
    .with_num_workers(4)
    .with_errors(errors_tx)
    .process()
    .await;

    let failed = errors.await?;
    tracing::info!(
        delivered = report.delivered,
        failed = failed.len(),
        "batch complete"
    );
    for err in failed {
        tracing::warn!(error = %err, "item failed");
    }
    Ok(())
}
