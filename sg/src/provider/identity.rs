//! Identity channel contract

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use super::ChannelError;
use crate::domain::IdentityKey;

/// Why the provider emitted an identity value
///
/// Informational only: the coordinator decides by comparing identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthChange {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for AuthChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InitialSession => "initial-session",
            Self::SignedIn => "signed-in",
            Self::SignedOut => "signed-out",
            Self::TokenRefreshed => "token-refreshed",
            Self::UserUpdated => "user-updated",
        };
        f.write_str(name)
    }
}

/// One notification from the identity channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// Current identity is now `identity` (may repeat, may be `None`)
    Changed {
        change: AuthChange,
        identity: Option<IdentityKey>,
    },
    /// The provider itself failed
    Failed { message: String },
}

/// Sign-in credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Live subscription to identity events
///
/// The unsubscribe hook runs exactly once: on [`Subscription::unsubscribe`]
/// or when the subscription is dropped.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<IdentityEvent>,
    on_unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<IdentityEvent>, on_unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            rx,
            on_unsubscribe: Some(Box::new(on_unsubscribe)),
        }
    }

    /// Next event in delivery order; `None` once the channel is gone
    pub async fn next(&mut self) -> Option<IdentityEvent> {
        self.rx.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(hook) = self.on_unsubscribe.take() {
            debug!("Subscription::release: unsubscribing");
            hook();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Push-based identity provider scoped to one audience (customer, admin)
#[async_trait]
pub trait IdentityChannel: Send + Sync {
    /// Scope name used in logs and notices
    fn scope(&self) -> &str;

    /// One-shot read of the current identity, used at startup
    async fn current_identity(&self) -> Result<Option<IdentityKey>, ChannelError>;

    /// Start receiving identity events
    fn subscribe(&self) -> Subscription;

    /// Sign in; the resulting identity arrives later as an event
    async fn login(&self, credentials: Credentials) -> Result<(), ChannelError>;

    /// Sign out; confirmation arrives later as an event
    async fn logout(&self) -> Result<(), ChannelError>;
}
