//! Post-action usage recording
//!
//! The recorder is the hook invoked after a gated action has succeeded. It
//! accepts events via a bounded channel and commits them from a background
//! task: the action already ran, so a failed increment is a metering
//! accuracy issue to log and retry, never an error surfaced to the caller.

use tokio::sync::mpsc;

use plaza_db::{SubscriptionRepository, UsageRepository};
use plaza_types::{Feature, Period, UserId};

use crate::error::EntitlementError;
use crate::lifecycle::SubscriptionLifecycleManager;

/// Usage event to be recorded.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    /// User who performed the action
    pub user_id: UserId,
    /// Metered feature consumed
    pub feature: Feature,
    /// Units consumed
    pub amount: i64,
}

impl UsageEvent {
    /// Create a new usage event
    pub fn new(user_id: UserId, feature: Feature, amount: i64) -> Self {
        Self {
            user_id,
            feature,
            amount,
        }
    }
}

/// Background task for fire-and-forget usage recording.
///
/// Counters are seeded from the user's plan at commit time, so an event
/// recorded just after an upgrade lands under the new limits.
#[derive(Clone, Debug)]
pub struct UsageRecorder {
    tx: mpsc::Sender<UsageEvent>,
}

impl UsageRecorder {
    /// Create a recorder draining into the given lifecycle manager's meter.
    ///
    /// Returns the recorder and a handle to the background task.
    pub fn new<S, U>(
        lifecycle: SubscriptionLifecycleManager<S, U>,
        buffer_size: usize,
    ) -> (Self, UsageRecorderHandle)
    where
        S: SubscriptionRepository + 'static,
        U: UsageRepository + 'static,
    {
        let (tx, rx) = mpsc::channel(buffer_size);

        let handle = UsageRecorderHandle {
            task: tokio::spawn(run_background(lifecycle, rx)),
        };

        (Self { tx }, handle)
    }

    /// Queue a usage event (fire-and-forget, never blocks).
    pub fn record(&self, event: UsageEvent) {
        if let Err(err) = self.tx.try_send(event) {
            tracing::warn!(error = %err, "usage recorder buffer full, event dropped");
        }
    }

    /// Queue a single-unit usage event.
    pub fn record_one(&self, user_id: UserId, feature: Feature) {
        self.record(UsageEvent::new(user_id, feature, 1));
    }
}

/// Handle for the background recorder task.
pub struct UsageRecorderHandle {
    task: tokio::task::JoinHandle<()>,
}

impl UsageRecorderHandle {
    /// Wait for the recorder to finish draining. All [`UsageRecorder`]
    /// clones must be dropped first, or this waits forever.
    pub async fn shutdown(self) {
        let _ = self.task.await;
    }
}

async fn run_background<S, U>(
    lifecycle: SubscriptionLifecycleManager<S, U>,
    mut rx: mpsc::Receiver<UsageEvent>,
) where
    S: SubscriptionRepository,
    U: UsageRepository,
{
    while let Some(event) = rx.recv().await {
        if let Err(first) = commit_event(&lifecycle, &event).await {
            tracing::warn!(
                error = %first,
                user_id = %event.user_id,
                feature = %event.feature,
                "usage commit failed, retrying"
            );
            if let Err(err) = commit_event(&lifecycle, &event).await {
                tracing::warn!(
                    error = %err,
                    user_id = %event.user_id,
                    feature = %event.feature,
                    amount = event.amount,
                    "usage increment dropped after retry"
                );
            }
        }
    }
}

async fn commit_event<S, U>(
    lifecycle: &SubscriptionLifecycleManager<S, U>,
    event: &UsageEvent,
) -> Result<(), EntitlementError>
where
    S: SubscriptionRepository,
    U: UsageRepository,
{
    let sub = lifecycle.get(event.user_id).await?;
    let commit = lifecycle
        .meter()
        .commit(
            event.user_id,
            sub.plan,
            event.feature,
            event.amount,
            &Period::current(),
        )
        .await;

    match commit {
        Ok(_) => Ok(()),
        // Capability-only features carry no budget on this plan; nothing
        // to record.
        Err(EntitlementError::NotMetered(_)) => {
            tracing::debug!(feature = %event.feature, "feature not metered, usage event ignored");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
