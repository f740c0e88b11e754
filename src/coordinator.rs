use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::{debug, info};

use crate::common::ClusterBatch;
use crate::config::Configuration;
use crate::error::AppError;
use crate::pipeline::{BatchProcessor, IdentifiedBatch, IdentifiedPublishingService};

/// Runs the batch processor on its own task. Batches are handled one at a
/// time, each to completion, in arrival order.
pub struct Coordinator {
    batch_tx: mpsc::Sender<ClusterBatch>,
    publisher: IdentifiedPublishingService,
    pipeline_task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl Coordinator {
    fn new(
        processor: BatchProcessor,
        intake_buffer_size: usize,
        publish_buffer_size: usize,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let (batch_tx, batch_rx) = mpsc::channel(intake_buffer_size);
        // The initial receiver is dropped; consumers subscribe on demand.
        let (publisher, _) = IdentifiedPublishingService::new(publish_buffer_size);
        let pipeline_task = Self::start_pipeline_task(
            processor,
            publisher.clone(),
            batch_rx,
            cancel_token.clone(),
        );

        Self {
            batch_tx,
            publisher,
            pipeline_task: Some(pipeline_task),
            cancel_token,
        }
    }

    fn start_pipeline_task(
        mut processor: BatchProcessor,
        mut publisher: IdentifiedPublishingService,
        mut batch_rx: mpsc::Receiver<ClusterBatch>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Clusters identifier started - waiting for batches...");
            loop {
                let batch = tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    batch = batch_rx.recv() => match batch {
                        Some(batch) => batch,
                        None => break,
                    },
                };

                let identified = match (&mut processor).oneshot(batch).await {
                    Ok(identified) => identified,
                    Err(never) => match never {},
                };
                match (&mut publisher).oneshot(identified).await {
                    Ok(receivers) => debug!(receivers, "Identified batch delivered"),
                    Err(never) => match never {},
                }
            }
            info!("Clusters identifier stopped");
        })
    }

    pub fn batch_sender(&self) -> mpsc::Sender<ClusterBatch> {
        self.batch_tx.clone()
    }

    pub fn publisher(&self) -> IdentifiedPublishingService {
        self.publisher.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IdentifiedBatch> {
        self.publisher.subscribe()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Stops the pipeline and waits for the batch in flight, if any.
    pub async fn join(mut self) -> Result<(), AppError> {
        self.stop();
        if let Some(task) = self.pipeline_task.take() {
            task.await
                .map_err(|e| AppError::Pipeline(format!("Pipeline task failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    processor: Option<BatchProcessor>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            processor: None,
        }
    }

    // Adjusts the intake buffer size, this will override the configuration.
    pub fn intake_buffer_size(mut self, intake_buffer_size: usize) -> Self {
        self.configuration.intake_buffer_size = intake_buffer_size;
        self
    }

    // Adjusts the publish buffer size, this will override the configuration.
    pub fn publish_buffer_size(mut self, publish_buffer_size: usize) -> Self {
        self.configuration.publish_buffer_size = publish_buffer_size;
        self
    }

    // Uses the given processor instead of one built from the configuration.
    pub fn processor(mut self, processor: BatchProcessor) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Validates the configuration and starts the pipeline task. Must be called
    /// from within a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.configuration.validate()?;
        let processor = match self.processor {
            Some(processor) => processor,
            None => BatchProcessor::new(self.configuration.identifier_config()?),
        };
        Ok(Coordinator::new(
            processor,
            self.configuration.intake_buffer_size,
            self.configuration.publish_buffer_size,
        ))
    }
}
