//! Broadcast fan-out for session notices

use tokio::sync::broadcast;
use tracing::debug;

use super::{RecoveryNotifier, SessionNotice};

/// Default channel capacity (notices)
pub const DEFAULT_NOTICE_CAPACITY: usize = 64;

/// Delivers notices to every subscriber
///
/// Fire-and-forget: with no subscribers a notice is dropped, and a lagging
/// subscriber loses the oldest notices first.
#[derive(Clone)]
pub struct NoticeBus {
    tx: broadcast::Sender<SessionNotice>,
}

impl NoticeBus {
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "NoticeBus::new: creating notice bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every notice emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        debug!("NoticeBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_CAPACITY)
    }
}

impl RecoveryNotifier for NoticeBus {
    fn notify(&self, notice: SessionNotice) {
        debug!(scope = notice.scope(), "NoticeBus::notify");
        // No subscribers is fine
        let _ = self.tx.send(notice);
    }
}
