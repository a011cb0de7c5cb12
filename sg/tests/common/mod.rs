//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sessiongate::provider::MemoryIdentityChannel;
use sessiongate::{
    ChannelError, Credentials, FetchError, IdentityChannel, IdentityKey, ProfileFetcher, RecoveryNotifier,
    SessionNotice, Subscription,
};
use tokio::sync::Semaphore;

/// Identity channel whose one-shot reads return a value that is already
/// `delay` old by the time the caller sees it
pub struct SlowReadChannel {
    inner: Arc<MemoryIdentityChannel>,
    delay: Duration,
}

impl SlowReadChannel {
    pub fn new(inner: Arc<MemoryIdentityChannel>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl IdentityChannel for SlowReadChannel {
    fn scope(&self) -> &str {
        self.inner.scope()
    }

    async fn current_identity(&self) -> Result<Option<IdentityKey>, ChannelError> {
        let identity = self.inner.current_identity().await;
        tokio::time::sleep(self.delay).await;
        identity
    }

    fn subscribe(&self) -> Subscription {
        self.inner.subscribe()
    }

    async fn login(&self, credentials: Credentials) -> Result<(), ChannelError> {
        self.inner.login(credentials).await
    }

    async fn logout(&self) -> Result<(), ChannelError> {
        self.inner.logout().await
    }
}

/// Profile fetcher whose calls block until the test releases them
///
/// Lets a test decide the order in which overlapping fetches resolve.
pub struct GatedFetcher<P> {
    profiles: HashMap<String, P>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl<P: Clone + Send + Sync> GatedFetcher<P> {
    pub fn new(profiles: impl IntoIterator<Item = (&'static str, P)>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|(k, p)| (k.to_string(), p)).collect(),
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn gate(&self, identity: &str) -> Arc<Semaphore> {
        self.gates
            .lock()
            .unwrap()
            .entry(identity.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(0)))
            .clone()
    }

    /// Let one pending (or future) fetch for `identity` complete
    pub fn release(&self, identity: &str) {
        self.gate(identity).add_permits(1);
    }
}

#[async_trait]
impl<P: Clone + Send + Sync> ProfileFetcher<P> for GatedFetcher<P> {
    async fn fetch(&self, identity: &IdentityKey) -> Result<Option<P>, FetchError> {
        let gate = self.gate(identity.as_str());
        let permit = gate.acquire().await.map_err(|e| FetchError::Network(e.to_string()))?;
        permit.forget();
        Ok(self.profiles.get(identity.as_str()).cloned())
    }
}

/// Notifier that records every notice
#[derive(Clone, Default)]
pub struct NoticeLog {
    notices: Arc<Mutex<Vec<SessionNotice>>>,
}

impl NoticeLog {
    pub fn notices(&self) -> Vec<SessionNotice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn recoveries(&self) -> Vec<sessiongate::RecoveryReason> {
        self.notices().iter().filter_map(SessionNotice::reason).collect()
    }
}

impl RecoveryNotifier for NoticeLog {
    fn notify(&self, notice: SessionNotice) {
        self.notices.lock().unwrap().push(notice);
    }
}
