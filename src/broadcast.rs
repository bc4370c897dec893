//! Periodic reminder sent to every subscribed user.
//!
//! Delivery is best effort: a failed send is counted and logged, and the
//! rest of the round carries on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::StoreError;
use crate::quiz::UserId;
use crate::store::QuizStore;

pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: UserId, text: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends `text` to every subscriber, at most `concurrency` at a time.
pub async fn fan_out(
    store: &dyn QuizStore,
    notifier: Arc<dyn Notifier>,
    text: Arc<str>,
    concurrency: usize,
) -> Result<BroadcastReport, StoreError> {
    let users = store.list_subscribed_user_ids().await?;
    info!("broadcasting to {} users", users.len());

    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut deliveries = JoinSet::new();
    for user in users {
        let permits = permits.clone();
        let notifier = notifier.clone();
        let text = text.clone();
        deliveries.spawn(async move {
            // The semaphore is never closed.
            let _permit = permits.acquire_owned().await;
            let result = notifier.notify(user, &text).await;
            if let Err(e) = &result {
                warn!("broadcast to {user} failed: {e}");
            }
            result.is_ok()
        });
    }

    let mut report = BroadcastReport::default();
    while let Some(delivered) = deliveries.join_next().await {
        match delivered {
            Ok(true) => report.sent += 1,
            Ok(false) => report.failed += 1,
            Err(e) => {
                warn!("broadcast task died: {e}");
                report.failed += 1;
            }
        }
    }
    info!(
        "broadcast finished: {} sent, {} failed",
        report.sent, report.failed
    );
    Ok(report)
}

/// Runs [`fan_out`] every `period`, starting one period from now.
pub fn spawn(
    store: Arc<dyn QuizStore>,
    notifier: Arc<dyn Notifier>,
    text: String,
    period: Duration,
    concurrency: usize,
) -> JoinHandle<()> {
    let text: Arc<str> = text.into();
    tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            if let Err(e) = fan_out(store.as_ref(), notifier.clone(), text.clone(), concurrency).await {
                error!("broadcast skipped, could not list subscribers: {e}");
            }
        }
    })
}
