//! SessionHandle - consumer interface for a running coordinator

use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use super::messages::{SessionError, SessionMetrics, SessionRequest};
use super::snapshot::SessionSnapshot;
use crate::provider::Credentials;

/// Handle for route guards and UI components
///
/// Cloneable. Consumers only ever read the derived snapshot and call the
/// action surface; coordinator state is never mutated directly.
pub struct SessionHandle<P> {
    scope: String,
    tx: mpsc::Sender<SessionRequest<P>>,
    snapshot_rx: watch::Receiver<SessionSnapshot<P>>,
}

impl<P> Clone for SessionHandle<P> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope.clone(),
            tx: self.tx.clone(),
            snapshot_rx: self.snapshot_rx.clone(),
        }
    }
}

impl<P: Clone> SessionHandle<P> {
    pub(crate) fn new(
        scope: String,
        tx: mpsc::Sender<SessionRequest<P>>,
        snapshot_rx: watch::Receiver<SessionSnapshot<P>>,
    ) -> Self {
        debug!(%scope, "SessionHandle::new: called");
        Self { scope, tx, snapshot_rx }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Current readiness snapshot
    pub fn snapshot(&self) -> SessionSnapshot<P> {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver notified whenever the snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot<P>> {
        debug!(scope = %self.scope, "SessionHandle::subscribe: called");
        self.snapshot_rx.clone()
    }

    /// Wait until the snapshot satisfies `pred` and return it
    ///
    /// Checks the current value first, so an already-satisfied predicate
    /// returns immediately.
    pub async fn wait_for(
        &self,
        mut pred: impl FnMut(&SessionSnapshot<P>) -> bool,
    ) -> Result<SessionSnapshot<P>, SessionError> {
        debug!(scope = %self.scope, "SessionHandle::wait_for: called");
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx.wait_for(|s| pred(s)).await.map_err(|_| SessionError::Stopped)?;
        Ok((*snapshot).clone())
    }

    /// Sign in through the identity channel
    ///
    /// Resolves once the provider answered. The identity itself is applied
    /// from the channel, never from this call.
    pub async fn login(&self, credentials: Credentials) -> Result<(), SessionError> {
        debug!(scope = %self.scope, email = %credentials.email, "SessionHandle::login: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Login { credentials, reply })
            .await
            .map_err(|_| SessionError::Stopped)?;
        reply_rx.await.map_err(|_| SessionError::Stopped)?
    }

    /// Sign out
    ///
    /// Local state is cleared before the provider is contacted; the returned
    /// future resolves once the provider confirmed.
    pub async fn logout(&self) -> Result<(), SessionError> {
        debug!(scope = %self.scope, "SessionHandle::logout: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Logout { reply })
            .await
            .map_err(|_| SessionError::Stopped)?;
        reply_rx.await.map_err(|_| SessionError::Stopped)?
    }

    /// Get coordinator metrics
    pub async fn metrics(&self) -> Result<SessionMetrics, SessionError> {
        debug!(scope = %self.scope, "SessionHandle::metrics: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::GetMetrics { reply })
            .await
            .map_err(|_| SessionError::Stopped)?;
        reply_rx.await.map_err(|_| SessionError::Stopped)
    }

    /// Stop the coordinator
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        debug!(scope = %self.scope, "SessionHandle::shutdown: called");
        self.tx
            .send(SessionRequest::Shutdown)
            .await
            .map_err(|_| SessionError::Stopped)
    }
}
