//! # Event Dispatcher
//!
//! Turns committed booking events into customer messages.
//!
//! ## Dispatch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Poll:    outbox.pending(batch_size, max_attempts)                   │
//! │                                                                         │
//! │  2. Decode:  payload JSON → BookingEvent                                │
//! │              (bad payload → mark_failed, move on)                       │
//! │                                                                         │
//! │  3. Resolve: customers.get_by_id(event.customer_id) → phone             │
//! │                                                                         │
//! │  4. Send:    sender.send(phone, template::render(event, name))          │
//! │                                                                         │
//! │  5. Mark:    ok  → mark_dispatched                                      │
//! │              err → mark_failed (attempts += 1, last_error)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-event failures are logged and recorded on the row; they never abort
//! the batch and never touch the booking.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use rentix_core::OutboxEvent;
use rentix_db::{Database, OutboxRepository};

use crate::config::NotifyConfig;
use crate::error::{NotifyError, NotifyResult};
use crate::sender::NotificationSender;
use crate::template;

/// Counts from one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Drains the outbox through a [`NotificationSender`].
pub struct EventDispatcher {
    db: Arc<Database>,
    sender: Arc<dyn NotificationSender>,
    config: Arc<NotifyConfig>,
}

/// Handle for stopping a running dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl DispatcherHandle {
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Dispatcher already stopped");
        }
    }
}

impl EventDispatcher {
    pub fn new(db: Arc<Database>, sender: Arc<dyn NotificationSender>, config: Arc<NotifyConfig>) -> Self {
        EventDispatcher { db, sender, config }
    }

    /// Processes one batch of pending events.
    ///
    /// Returns an error only if the outbox itself cannot be read.
    pub async fn dispatch_pending(&self) -> NotifyResult<DispatchReport> {
        let mut report = DispatchReport::default();

        if !self.config.is_enabled() {
            debug!("Notifications disabled, leaving outbox untouched");
            return Ok(report);
        }

        let outbox = self.db.outbox();
        let entries = outbox
            .pending(self.config.dispatch.batch_size, self.config.dispatch.max_attempts)
            .await?;

        if entries.is_empty() {
            debug!("No pending events");
            return Ok(report);
        }

        info!(count = entries.len(), sender = self.sender.name(), "Dispatching events");

        for entry in &entries {
            match self.dispatch_one(entry).await {
                Ok(()) => {
                    if let Err(e) = outbox.mark_dispatched(&entry.id).await {
                        error!(?e, id = %entry.id, "Failed to mark event as dispatched");
                    }
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(
                        id = %entry.id,
                        event_type = %entry.event_type,
                        attempts = entry.attempts + 1,
                        retryable = e.is_retryable(),
                        error = %e,
                        "Event dispatch failed"
                    );
                    if let Err(mark_err) = outbox.mark_failed(&entry.id, &e.to_string()).await {
                        error!(?mark_err, id = %entry.id, "Failed to record dispatch failure");
                    }
                    report.failed += 1;
                }
            }
        }

        info!(sent = report.sent, failed = report.failed, "Dispatch pass finished");
        Ok(report)
    }

    async fn dispatch_one(&self, entry: &OutboxEvent) -> NotifyResult<()> {
        let event = OutboxRepository::decode(entry).map_err(|e| NotifyError::InvalidPayload(e.to_string()))?;

        let customer = self
            .db
            .customers()
            .get_by_id(event.customer_id())
            .await?
            .ok_or_else(|| NotifyError::RecipientNotFound(event.customer_id().to_string()))?;

        let message = template::render(&event, &customer.name);
        self.sender.send(&customer.phone, &message).await?;

        debug!(id = %entry.id, booking_id = %entry.booking_id, "Event dispatched");
        Ok(())
    }

    /// Spawnable polling loop. Stops when the returned handle is used.
    pub fn spawn(self) -> (tokio::task::JoinHandle<()>, DispatcherHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));
        (task, DispatcherHandle { shutdown_tx })
    }

    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!("Event dispatcher starting");

        let poll_interval = Duration::from_secs(self.config.dispatch.poll_interval_secs.max(1));
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.dispatch_pending().await {
                        error!(?e, "Failed to read outbox");
                    }
                }

                _ = shutdown_rx.recv() => {
                    info!("Event dispatcher shutting down");
                    break;
                }
            }
        }

        info!("Event dispatcher stopped");
    }
}
