//! In-memory providers
//!
//! Deterministic stand-ins for the hosted identity and data services. Each
//! one supports latency and failure injection so races can be replayed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::{
    AuthChange, ChannelError, Credentials, FetchError, IdentityChannel, IdentityEvent, ProfileFetcher, ResourceFetcher,
    Subscription,
};
use crate::domain::IdentityKey;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: IdentityKey,
}

#[derive(Default)]
struct ChannelInner {
    current: Option<IdentityKey>,
    accounts: HashMap<String, Account>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<IdentityEvent>>,
    next_subscriber: u64,
    current_failure: Option<String>,
}

/// Identity channel backed by an account table
pub struct MemoryIdentityChannel {
    scope: String,
    inner: Arc<Mutex<ChannelInner>>,
    login_delay: Duration,
    logout_delay: Duration,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl MemoryIdentityChannel {
    pub fn new(scope: impl Into<String>) -> Self {
        let scope = scope.into();
        debug!(%scope, "MemoryIdentityChannel::new: called");
        Self {
            scope,
            inner: Arc::new(Mutex::new(ChannelInner::default())),
            login_delay: Duration::ZERO,
            logout_delay: Duration::ZERO,
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    /// Register an account that `login` accepts
    pub fn with_account(self, email: &str, password: &str, identity: impl Into<IdentityKey>) -> Self {
        lock(&self.inner).accounts.insert(
            email.to_lowercase(),
            Account {
                password: password.to_string(),
                identity: identity.into(),
            },
        );
        self
    }

    /// Start with an existing session (as if restored from storage)
    pub fn with_current(self, identity: impl Into<IdentityKey>) -> Self {
        lock(&self.inner).current = Some(identity.into());
        self
    }

    /// Delay before a login is confirmed
    pub fn with_login_delay(mut self, delay: Duration) -> Self {
        self.login_delay = delay;
        self
    }

    /// Delay before a logout is confirmed
    pub fn with_logout_delay(mut self, delay: Duration) -> Self {
        self.logout_delay = delay;
        self
    }

    /// Make `current_identity` fail with the given message
    pub fn with_current_failure(self, message: &str) -> Self {
        lock(&self.inner).current_failure = Some(message.to_string());
        self
    }

    /// Set the current identity and push it to every subscriber
    pub fn emit(&self, change: AuthChange, identity: Option<IdentityKey>) {
        debug!(scope = %self.scope, %change, ?identity, "MemoryIdentityChannel::emit: called");
        let mut inner = lock(&self.inner);
        inner.current = identity.clone();
        broadcast(&mut inner, IdentityEvent::Changed { change, identity });
    }

    /// Push a provider failure to every subscriber
    pub fn fail(&self, message: &str) {
        debug!(scope = %self.scope, %message, "MemoryIdentityChannel::fail: called");
        let mut inner = lock(&self.inner);
        broadcast(
            &mut inner,
            IdentityEvent::Failed {
                message: message.to_string(),
            },
        );
    }

    /// End every live subscription, as a provider shutting down would
    pub fn close(&self) {
        debug!(scope = %self.scope, "MemoryIdentityChannel::close: called");
        lock(&self.inner).subscribers.clear();
    }

    /// Identity the provider believes is signed in
    pub fn current(&self) -> Option<IdentityKey> {
        lock(&self.inner).current.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

fn broadcast(inner: &mut ChannelInner, event: IdentityEvent) {
    inner.subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
}

#[async_trait]
impl IdentityChannel for MemoryIdentityChannel {
    fn scope(&self) -> &str {
        &self.scope
    }

    async fn current_identity(&self) -> Result<Option<IdentityKey>, ChannelError> {
        debug!(scope = %self.scope, "MemoryIdentityChannel::current_identity: called");
        let inner = lock(&self.inner);
        match &inner.current_failure {
            Some(message) => Err(ChannelError::Unavailable(message.clone())),
            None => Ok(inner.current.clone()),
        }
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner.subscribers.insert(id, tx);
            id
        };
        debug!(scope = %self.scope, id, "MemoryIdentityChannel::subscribe: registered");

        let inner = Arc::clone(&self.inner);
        Subscription::new(rx, move || {
            lock(&inner).subscribers.remove(&id);
        })
    }

    async fn login(&self, credentials: Credentials) -> Result<(), ChannelError> {
        debug!(scope = %self.scope, email = %credentials.email, "MemoryIdentityChannel::login: called");
        self.login_calls.fetch_add(1, Ordering::SeqCst);

        if !self.login_delay.is_zero() {
            tokio::time::sleep(self.login_delay).await;
        }

        let account = lock(&self.inner).accounts.get(&credentials.email.to_lowercase()).cloned();
        match account {
            Some(account) if account.password == credentials.password => {
                self.emit(AuthChange::SignedIn, Some(account.identity));
                Ok(())
            }
            _ => {
                debug!(scope = %self.scope, "MemoryIdentityChannel::login: rejected");
                Err(ChannelError::InvalidCredentials)
            }
        }
    }

    async fn logout(&self) -> Result<(), ChannelError> {
        debug!(scope = %self.scope, "MemoryIdentityChannel::logout: called");
        self.logout_calls.fetch_add(1, Ordering::SeqCst);

        if !self.logout_delay.is_zero() {
            tokio::time::sleep(self.logout_delay).await;
        }

        self.emit(AuthChange::SignedOut, None);
        Ok(())
    }
}

#[derive(Debug)]
struct StoreInner<P> {
    records: HashMap<IdentityKey, P>,
    failures: HashMap<IdentityKey, FetchError>,
    latency: HashMap<IdentityKey, Duration>,
    calls: Vec<IdentityKey>,
}

/// Profile table keyed by identity
pub struct MemoryProfileStore<P> {
    inner: Mutex<StoreInner<P>>,
}

impl<P: Clone + Send + Sync> MemoryProfileStore<P> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                records: HashMap::new(),
                failures: HashMap::new(),
                latency: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    pub fn insert(&self, identity: impl Into<IdentityKey>, profile: P) {
        lock(&self.inner).records.insert(identity.into(), profile);
    }

    /// Make every fetch for `identity` fail
    pub fn fail_with(&self, identity: impl Into<IdentityKey>, error: FetchError) {
        lock(&self.inner).failures.insert(identity.into(), error);
    }

    pub fn set_latency(&self, identity: impl Into<IdentityKey>, latency: Duration) {
        lock(&self.inner).latency.insert(identity.into(), latency);
    }

    /// Number of fetches issued so far
    pub fn fetch_count(&self) -> usize {
        lock(&self.inner).calls.len()
    }
}

impl<P: Clone + Send + Sync> Default for MemoryProfileStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Clone + Send + Sync> ProfileFetcher<P> for MemoryProfileStore<P> {
    async fn fetch(&self, identity: &IdentityKey) -> Result<Option<P>, FetchError> {
        debug!(%identity, "MemoryProfileStore::fetch: called");
        let latency = {
            let mut inner = lock(&self.inner);
            inner.calls.push(identity.clone());
            inner.latency.get(identity).copied().unwrap_or_default()
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let inner = lock(&self.inner);
        if let Some(error) = inner.failures.get(identity) {
            return Err(error.clone());
        }
        Ok(inner.records.get(identity).cloned())
    }
}

/// Dependent resource backed by per-identity JSON documents
pub struct MemoryResource {
    name: String,
    inner: Mutex<StoreInner<serde_json::Value>>,
}

impl MemoryResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(StoreInner {
                records: HashMap::new(),
                failures: HashMap::new(),
                latency: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    pub fn insert(&self, identity: impl Into<IdentityKey>, value: serde_json::Value) {
        lock(&self.inner).records.insert(identity.into(), value);
    }

    pub fn fail_with(&self, identity: impl Into<IdentityKey>, error: FetchError) {
        lock(&self.inner).failures.insert(identity.into(), error);
    }

    pub fn set_latency(&self, identity: impl Into<IdentityKey>, latency: Duration) {
        lock(&self.inner).latency.insert(identity.into(), latency);
    }

    pub fn fetch_count(&self) -> usize {
        lock(&self.inner).calls.len()
    }
}

#[async_trait]
impl ResourceFetcher for MemoryResource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, identity: &IdentityKey) -> Result<serde_json::Value, FetchError> {
        debug!(resource = %self.name, %identity, "MemoryResource::fetch: called");
        let latency = {
            let mut inner = lock(&self.inner);
            inner.calls.push(identity.clone());
            inner.latency.get(identity).copied().unwrap_or_default()
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let inner = lock(&self.inner);
        if let Some(error) = inner.failures.get(identity) {
            return Err(error.clone());
        }
        // A missing document is an empty list, not an error
        Ok(inner
            .records
            .get(identity)
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new())))
    }
}
