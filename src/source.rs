//! Where pours come from. The reports screen only ever needs two things
//! from its data source: a one-shot fetch of the pours inside a time
//! window, and a way to hear that the set changed so it can fetch again.
//! [`crate::database::Database`] is the production source; [`Memory`]
//! backs tests without a live server.

use crate::model::{Pour, Window};

use core::future::Future;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::errors::BroadcastStreamRecvError, wrappers::BroadcastStream, StreamExt};

/// How many pending change pings a slow subscriber may fall behind by.
/// Lagging is harmless since a fresh fetch supersedes everything missed.
const CHANGE_BACKLOG: usize = 16;

/// A live feed of pour events, abstracted away from the HTTP layer so
/// tests can substitute an in-memory source.
pub trait TransactionSource {
    /// All pours inside the window, newest first.
    fn in_window(&self, window: Window) -> impl Future<Output = anyhow::Result<Vec<Pour>>> + Send;

    /// Subscribes to change notifications. Dropping the handle unsubscribes.
    fn watch(&self) -> Subscription;
}

/// Cancellable handle to a source's change notifications.
pub struct Subscription(BroadcastStream<()>);

impl From<broadcast::Receiver<()>> for Subscription {
    fn from(rx: broadcast::Receiver<()>) -> Self {
        Self(BroadcastStream::new(rx))
    }
}

impl Subscription {
    /// Waits for the next change. Returns `false` once the feed is gone.
    /// Missed notifications collapse into one: the caller refetches a
    /// whole snapshot anyway, so only the latest state matters.
    pub async fn changed(&mut self) -> bool {
        match self.0.next().await {
            Some(Ok(())) | Some(Err(BroadcastStreamRecvError::Lagged(_))) => true,
            None => false,
        }
    }
}

/// Fan-out point for change notifications; one lives inside each source.
pub struct Changes(broadcast::Sender<()>);

impl Default for Changes {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_BACKLOG);
        Self(tx)
    }
}

impl Changes {
    pub fn subscribe(&self) -> Subscription {
        Subscription::from(self.0.subscribe())
    }

    /// Pings every live subscriber. A ping with no listeners is fine.
    pub fn notify(&self) {
        let _ = self.0.send(());
    }
}

/// In-memory [`TransactionSource`] for tests and offline development.
#[derive(Default)]
pub struct Memory {
    pours: Mutex<Vec<Pour>>,
    changes: Changes,
}

impl Memory {
    /// Appends a pour and notifies subscribers, like a dispenser would.
    pub fn record(&self, pour: Pour) {
        self.pours.lock().unwrap().push(pour);
        self.changes.notify();
    }
}

impl TransactionSource for Memory {
    fn in_window(&self, window: Window) -> impl Future<Output = anyhow::Result<Vec<Pour>>> + Send {
        let since = window.since();
        let mut pours: Vec<_> =
            self.pours.lock().unwrap().iter().filter(|pour| pour.created >= since).cloned().collect();
        pours.sort_by_key(|pour| core::cmp::Reverse(pour.created));
        core::future::ready(Ok(pours))
    }

    fn watch(&self) -> Subscription {
        self.changes.subscribe()
    }
}
