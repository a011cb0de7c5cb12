//! Replays a scenario against in-memory providers

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::report::{ScenarioReport, StepReport};
use super::{FetchTarget, Scenario, Step, Variant};
use crate::admin::{AdminProfile, AuditEvent, AuditSink, MemoryAuditSink, RoleGate, TracingAuditSink, admin_coordinator};
use crate::config::Config;
use crate::customer::{ADDRESSES, CustomerProfile, customer_coordinator};
use crate::domain::IdentityKey;
use crate::notice::{NoticeBus, SessionNotice};
use crate::provider::{AuthChange, Credentials, FetchError, MemoryIdentityChannel, MemoryProfileStore, MemoryResource};
use crate::session::{SessionConfig, SessionHandle, SessionMetrics};

const DEFAULT_SETTLE_MS: u64 = 25;

/// Audit sink that keeps events for the report and also logs them
#[derive(Clone, Default)]
struct RecordingAuditSink {
    memory: MemoryAuditSink,
}

impl AuditSink for RecordingAuditSink {
    fn emit(&self, event: AuditEvent) {
        TracingAuditSink.emit(event.clone());
        self.memory.emit(event);
    }
}

/// In-memory providers a scenario drives
struct Fixtures<P> {
    channel: Arc<MemoryIdentityChannel>,
    profiles: Arc<MemoryProfileStore<P>>,
    addresses: Option<Arc<MemoryResource>>,
    settle: Duration,
}

/// Run a scenario and collect what each step produced
pub async fn run_scenario(scenario: &Scenario, config: &Config) -> Result<ScenarioReport> {
    info!(name = %scenario.name, variant = %scenario.variant, "run_scenario: called");

    let bus = NoticeBus::new(config.notices.capacity);
    let mut notices = bus.subscribe();
    let channel = Arc::new(build_channel(scenario));
    let settle = Duration::from_millis(scenario.settle_ms.unwrap_or(DEFAULT_SETTLE_MS));

    let (steps, metrics, audit) = match scenario.variant {
        Variant::Customer => {
            let profiles = Arc::new(profile_store::<CustomerProfile>(&scenario.profiles)?);
            let addresses = Arc::new(MemoryResource::new(ADDRESSES));
            for (identity, book) in &scenario.addresses {
                addresses.insert(identity.as_str(), book.clone());
            }

            let session = session_config(&config.customer, scenario);
            let handle = customer_coordinator(session, channel.clone(), profiles.clone(), addresses.clone())
                .with_notifier(Arc::new(bus.clone()))
                .spawn();

            let fixtures = Fixtures {
                channel,
                profiles,
                addresses: Some(addresses),
                settle,
            };
            let (steps, metrics) = replay(&scenario.steps, &handle, &fixtures, &mut notices).await?;
            (steps, metrics, Vec::new())
        }
        Variant::Admin => {
            let profiles = Arc::new(profile_store::<AdminProfile>(&scenario.profiles)?);
            let sink = RecordingAuditSink::default();
            let mut gate = RoleGate::new(channel_scope(scenario.variant), config.admin.allowed_roles.clone());
            if config.admin.audit {
                gate = gate.with_audit(Arc::new(sink.clone()));
            }

            let session = session_config(&config.admin.session, scenario);
            let handle = admin_coordinator(session, gate, channel.clone(), profiles.clone())
                .with_notifier(Arc::new(bus.clone()))
                .spawn();

            let fixtures = Fixtures {
                channel,
                profiles,
                addresses: None,
                settle,
            };
            let (steps, metrics) = replay(&scenario.steps, &handle, &fixtures, &mut notices).await?;
            (steps, metrics, sink.memory.events())
        }
    };

    Ok(ScenarioReport {
        name: scenario.name.clone(),
        variant: scenario.variant,
        steps,
        metrics,
        audit,
    })
}

fn channel_scope(variant: Variant) -> &'static str {
    match variant {
        Variant::Customer => "customer",
        Variant::Admin => "admin",
    }
}

fn build_channel(scenario: &Scenario) -> MemoryIdentityChannel {
    let mut channel = MemoryIdentityChannel::new(channel_scope(scenario.variant));
    for account in &scenario.accounts {
        channel = channel.with_account(&account.email, &account.password, account.identity.as_str());
    }
    if let Some(current) = &scenario.current {
        channel = channel.with_current(current.as_str());
    }
    channel
}

fn session_config(base: &SessionConfig, scenario: &Scenario) -> SessionConfig {
    let mut config = base.clone();
    if let Some(ms) = scenario.orphan_timeout_ms {
        config.orphan_timeout_ms = ms;
    }
    config
}

fn profile_store<P>(records: &BTreeMap<String, serde_json::Value>) -> Result<MemoryProfileStore<P>>
where
    P: DeserializeOwned + Clone + Send + Sync,
{
    let store = MemoryProfileStore::new();
    for (identity, record) in records {
        let profile: P =
            serde_json::from_value(record.clone()).context(format!("Invalid profile record for {}", identity))?;
        store.insert(identity.as_str(), profile);
    }
    Ok(store)
}

async fn replay<P>(
    steps: &[Step],
    handle: &SessionHandle<P>,
    fixtures: &Fixtures<P>,
    notices: &mut broadcast::Receiver<SessionNotice>,
) -> Result<(Vec<StepReport>, SessionMetrics)>
where
    P: Clone + Serialize + Send + Sync + 'static,
{
    let mut reports = Vec::with_capacity(steps.len() + 1);

    tokio::time::sleep(fixtures.settle).await;
    reports.push(observe(0, "start".to_string(), handle, notices, None)?);

    for (i, step) in steps.iter().enumerate() {
        debug!(index = i + 1, %step, "replay: applying step");
        let error = apply_step(step, handle, fixtures).await;
        tokio::time::sleep(fixtures.settle).await;
        reports.push(observe(i + 1, step.to_string(), handle, notices, error)?);
    }

    let metrics = handle.metrics().await.context("Coordinator stopped before the scenario finished")?;
    handle.shutdown().await.context("Failed to stop coordinator")?;
    Ok((reports, metrics))
}

/// Carry out one step; returns an error message for failed actions
async fn apply_step<P>(step: &Step, handle: &SessionHandle<P>, fixtures: &Fixtures<P>) -> Option<String>
where
    P: Clone + Send + Sync + 'static,
{
    match step {
        Step::Emit(identity) => {
            let identity = identity.as_deref().map(IdentityKey::from);
            let change = match (&identity, fixtures.channel.current()) {
                (None, _) => AuthChange::SignedOut,
                (Some(next), Some(current)) if *next == current => AuthChange::TokenRefreshed,
                (Some(_), _) => AuthChange::SignedIn,
            };
            fixtures.channel.emit(change, identity);
        }
        Step::Login { email, password } => {
            if let Err(e) = handle.login(Credentials::new(email.as_str(), password.as_str())).await {
                return Some(e.to_string());
            }
        }
        Step::Logout => {
            // Provider confirmation may be slow; local state is already cleared
            let handle = handle.clone();
            tokio::spawn(async move {
                if let Err(e) = handle.logout().await {
                    warn!(error = %e, "Scenario logout failed");
                }
            });
        }
        Step::ChannelError(message) => fixtures.channel.fail(message),
        Step::WaitMs(ms) => tokio::time::sleep(Duration::from_millis(*ms)).await,
        Step::Latency { target, identity, ms } => {
            let latency = Duration::from_millis(*ms);
            match target {
                FetchTarget::Profile => fixtures.profiles.set_latency(identity.as_str(), latency),
                FetchTarget::Addresses => match &fixtures.addresses {
                    Some(addresses) => addresses.set_latency(identity.as_str(), latency),
                    None => return Some("No address book in this variant".to_string()),
                },
            }
        }
        Step::FailFetch {
            target,
            identity,
            status,
            message,
        } => {
            let error = FetchError::Backend {
                status: *status,
                message: message.clone(),
            };
            match target {
                FetchTarget::Profile => fixtures.profiles.fail_with(identity.as_str(), error),
                FetchTarget::Addresses => match &fixtures.addresses {
                    Some(addresses) => addresses.fail_with(identity.as_str(), error),
                    None => return Some("No address book in this variant".to_string()),
                },
            }
        }
    }
    None
}

fn observe<P>(
    index: usize,
    step: String,
    handle: &SessionHandle<P>,
    notices: &mut broadcast::Receiver<SessionNotice>,
    error: Option<String>,
) -> Result<StepReport>
where
    P: Clone + Serialize,
{
    let snapshot = serde_json::to_value(handle.snapshot()).context("Failed to serialize snapshot")?;

    let mut received = Vec::new();
    loop {
        match notices.try_recv() {
            Ok(notice) => received.push(notice),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Notice buffer overflowed during scenario");
            }
            Err(_) => break,
        }
    }

    Ok(StepReport {
        index,
        step,
        snapshot,
        notices: received,
        error,
    })
}
