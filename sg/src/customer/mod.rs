//! Customer-facing session
//!
//! Any existing profile is accepted. The address book is a dependent
//! resource: readiness waits for it, but a failed load only raises a notice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::provider::{IdentityChannel, ProfileFetcher, ResourceFetcher};
use crate::session::{AcceptAll, ResourceState, SessionConfig, SessionCoordinator, SessionSnapshot};

/// Resource name the address book is registered under
pub const ADDRESSES: &str = "addresses";

/// Application profile of a signed-in customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: String,
    pub label: String,
    pub street: String,
    pub city: String,
    pub postcode: String,
    #[serde(default)]
    pub is_default: bool,
}

pub type CustomerCoordinator = SessionCoordinator<CustomerProfile, AcceptAll>;

/// Build the customer coordinator with the address book as a dependent resource
///
/// `addresses` must report [`ADDRESSES`] as its name.
pub fn customer_coordinator(
    config: SessionConfig,
    channel: Arc<dyn IdentityChannel>,
    profiles: Arc<dyn ProfileFetcher<CustomerProfile>>,
    addresses: Arc<dyn ResourceFetcher>,
) -> CustomerCoordinator {
    if addresses.name() != ADDRESSES {
        warn!(name = addresses.name(), "Address resource registered under an unexpected name");
    }
    SessionCoordinator::new(config, AcceptAll, channel, profiles).with_resource(addresses)
}

/// Decoded address book from a snapshot
///
/// Empty while loading, after a failed load, or when the stored document
/// does not decode.
pub fn addresses(snapshot: &SessionSnapshot<CustomerProfile>) -> Vec<Address> {
    match snapshot.resources.get(ADDRESSES) {
        Some(ResourceState::Loaded(value)) => match serde_json::from_value(value.clone()) {
            Ok(addresses) => addresses,
            Err(e) => {
                warn!(error = %e, "Address book did not decode");
                Vec::new()
            }
        },
        _ => Vec::new(),
    }
}

/// The customer's default address, falling back to the first one
pub fn default_address(snapshot: &SessionSnapshot<CustomerProfile>) -> Option<Address> {
    let mut addresses = addresses(snapshot);
    match addresses.iter().position(|a| a.is_default) {
        Some(index) => Some(addresses.swap_remove(index)),
        None => addresses.into_iter().next(),
    }
}
