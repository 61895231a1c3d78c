//! Background dispatch and the handoff back to the delivery context.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::{LoaderError, Result};
use crate::fetcher::Fetcher;
use crate::record::LoadedImage;
use crate::request::{DispatchTicket, RequestId, SlotId};

/// Result of one dispatched fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The image was fetched and decoded.
    Loaded(Arc<LoadedImage>),
    /// The fetch ran and failed.
    Failed(LoaderError),
    /// The request was cancelled before the fetch started.
    Skipped,
}

impl FetchOutcome {
    /// Collapse to what the consumer sees: an image or nothing.
    pub fn into_image(self) -> Option<Arc<LoadedImage>> {
        match self {
            FetchOutcome::Loaded(image) => Some(image),
            FetchOutcome::Failed(_) | FetchOutcome::Skipped => None,
        }
    }
}

/// A finished dispatch, addressed to exactly one request.
#[derive(Debug)]
pub struct Delivery {
    /// Slot the request was made for.
    pub slot: SlotId,
    /// Request the outcome belongs to.
    pub request_id: RequestId,
    /// Identity that was fetched.
    pub identity: String,
    /// What happened.
    pub outcome: FetchOutcome,
}

/// Runs fetches on the runtime and queues their results for the delivery
/// context.
///
/// Every dispatch produces exactly one [`Delivery`], so `in_flight` is
/// exact. The receiving half is only ever drained by the owner of this
/// coordinator.
#[derive(Debug)]
pub struct LoadCoordinator {
    fetcher: Arc<Fetcher>,
    runtime: Handle,
    tx: mpsc::UnboundedSender<Delivery>,
    rx: mpsc::UnboundedReceiver<Delivery>,
    in_flight: usize,
}

impl LoadCoordinator {
    /// Coordinator that spawns fetches onto `runtime`.
    pub fn new(fetcher: Arc<Fetcher>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            runtime,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Build against the runtime the caller is running in.
    pub fn with_current_runtime(fetcher: Arc<Fetcher>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            LoaderError::Internal(format!("no tokio runtime: {e}"))
        })?;
        Ok(Self::new(fetcher, runtime))
    }

    /// Fetcher shared by every dispatch.
    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    /// Dispatches whose delivery has not been taken yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start a background fetch for `ticket`. Returns immediately; the
    /// result arrives later through [`LoadCoordinator::try_next`] or
    /// [`LoadCoordinator::next`].
    pub fn dispatch(&mut self, ticket: DispatchTicket) {
        self.in_flight += 1;
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        let runtime = self.runtime.clone();

        self.runtime.spawn(async move {
            let DispatchTicket {
                request_id,
                slot,
                identity,
                cancel,
            } = ticket;

            let outcome = if cancel.is_cancelled() {
                tracing::trace!(
                    %request_id,
                    slot,
                    %identity,
                    "skipping cancelled request"
                );
                FetchOutcome::Skipped
            } else {
                // Run the fetch as its own task so a panic still yields a
                // delivery and keeps the in-flight count honest.
                let fetch = {
                    let identity = identity.clone();
                    runtime.spawn(async move {
                        fetcher.fetch_image(&identity).await
                    })
                };
                match fetch.await {
                    Ok(Ok(image)) => FetchOutcome::Loaded(Arc::new(image)),
                    Ok(Err(err)) => {
                        tracing::warn!(
                            %request_id,
                            slot,
                            %identity,
                            error = %err,
                            "image load failed"
                        );
                        FetchOutcome::Failed(err)
                    }
                    Err(join_err) => {
                        tracing::error!(
                            %request_id,
                            slot,
                            %identity,
                            error = %join_err,
                            "image load task aborted"
                        );
                        FetchOutcome::Failed(LoaderError::Internal(
                            join_err.to_string(),
                        ))
                    }
                }
            };

            // Receiver dropped: the owner is gone, nothing to deliver to.
            let _ = tx.send(Delivery {
                slot,
                request_id,
                identity,
                outcome,
            });
        });
    }

    /// Take a ready delivery without waiting.
    pub fn try_next(&mut self) -> Option<Delivery> {
        let delivery = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(delivery)
    }

    /// Wait for the next delivery; `None` once nothing is in flight.
    pub async fn next(&mut self) -> Option<Delivery> {
        if self.in_flight == 0 {
            return None;
        }
        let delivery = self.rx.recv().await?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(delivery)
    }
}
