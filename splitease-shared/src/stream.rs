/// Polling source for the notification stream
///
/// Each stream connection polls the user's unread notifications on a fixed
/// period and yields only the ones it has not delivered before. A poll that
/// finds nothing new yields nothing. Delivery state lives with the
/// connection, so a reconnecting client receives its whole unread list again.
///
/// Dropping the stream drops its timer; nothing outlives the connection.

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, Stream};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::models::notification::Notification;
use crate::notify::NotificationStore;

/// Default poll period in seconds
pub const DEFAULT_POLL_SECONDS: u64 = 10;

/// Remembers which notification ids a connection already delivered
#[derive(Debug, Default)]
pub struct DeliveryTracker {
    seen: HashSet<i64>,
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notifications of `unread` not delivered yet and marks
    /// them delivered.
    ///
    /// Ids that dropped out of the unread set are forgotten: a notification
    /// never becomes unread again, so they can never reappear.
    pub fn take_undelivered(&mut self, unread: Vec<Notification>) -> Vec<Notification> {
        let current: HashSet<i64> = unread.iter().map(|n| n.id).collect();
        self.seen.retain(|id| current.contains(id));

        unread
            .into_iter()
            .filter(|n| self.seen.insert(n.id))
            .collect()
    }

    pub fn delivered_count(&self) -> usize {
        self.seen.len()
    }
}

/// Polls `store` every `period` for `user_id` and yields batches of newly
/// unread notifications. The first poll happens one period after the call.
pub fn poll_unread<S>(
    store: S,
    user_id: i64,
    period: Duration,
) -> impl Stream<Item = Vec<Notification>> + Send
where
    S: NotificationStore + 'static,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    stream::unfold(
        (store, ticker, DeliveryTracker::new()),
        move |(store, mut ticker, mut tracker)| async move {
            loop {
                ticker.tick().await;

                match store.list_unread(user_id).await {
                    Ok(unread) => {
                        let fresh = tracker.take_undelivered(unread);
                        if !fresh.is_empty() {
                            tracing::debug!(user_id, count = fresh.len(), "Delivering notifications");
                            return Some((fresh, (store, ticker, tracker)));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(user_id, error = %e, "Notification poll failed");
                    }
                }
            }
        },
    )
}
