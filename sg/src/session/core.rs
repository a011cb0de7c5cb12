//! Main SessionCoordinator task implementation

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::handle::SessionHandle;
use super::machine::{Effect, SessionInput, SessionMachine};
use super::messages::{SessionError, SessionRequest};
use super::policy::AcceptancePolicy;
use super::snapshot::SessionSnapshot;
use crate::domain::Generation;
use crate::notice::{NullNotifier, RecoveryNotifier};
use crate::provider::{ChannelError, IdentityChannel, IdentityEvent, ProfileFetcher, ResourceFetcher, Subscription};

/// Reconciles an identity channel with profile lookups for one audience
///
/// All state lives in the [`SessionMachine`]; this task only feeds it inputs
/// in arrival order and carries out the effects it returns. Fetches and the
/// orphan timer run as spawned tasks that report back through the request
/// channel with the generation they were issued under.
pub struct SessionCoordinator<P, A> {
    machine: SessionMachine<P, A>,
    channel: Arc<dyn IdentityChannel>,
    fetcher: Arc<dyn ProfileFetcher<P>>,
    resources: Vec<Arc<dyn ResourceFetcher>>,
    notifier: Arc<dyn RecoveryNotifier>,
    tx: mpsc::Sender<SessionRequest<P>>,
    rx: mpsc::Receiver<SessionRequest<P>>,
    snapshot_tx: watch::Sender<SessionSnapshot<P>>,
    orphan_timer: Option<(Generation, AbortHandle)>,
}

impl<P, A> SessionCoordinator<P, A>
where
    P: Clone + PartialEq + Send + Sync + 'static,
    A: AcceptancePolicy<P>,
{
    /// Create a new coordinator for the channel's scope
    pub fn new(
        config: SessionConfig,
        policy: A,
        channel: Arc<dyn IdentityChannel>,
        fetcher: Arc<dyn ProfileFetcher<P>>,
    ) -> Self {
        debug!(scope = channel.scope(), ?config, "SessionCoordinator::new: called");
        let machine = SessionMachine::new(channel.scope(), policy, config.orphan_timeout());
        let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
        let (snapshot_tx, _) = watch::channel(machine.snapshot());
        Self {
            machine,
            channel,
            fetcher,
            resources: Vec::new(),
            notifier: Arc::new(NullNotifier),
            tx,
            rx,
            snapshot_tx,
            orphan_timer: None,
        }
    }

    /// Register a dependent resource loaded once the profile is accepted
    pub fn with_resource(mut self, resource: Arc<dyn ResourceFetcher>) -> Self {
        self.machine = self.machine.with_resource(resource.name());
        self.resources.push(resource);
        self
    }

    /// Set the notifier that receives recovery and fetch-failure notices
    pub fn with_notifier(mut self, notifier: Arc<dyn RecoveryNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Spawn the coordinator task and return a handle to it
    pub fn spawn(self) -> SessionHandle<P> {
        let handle = SessionHandle::new(
            self.machine.scope().to_string(),
            self.tx.clone(),
            self.snapshot_tx.subscribe(),
        );
        tokio::spawn(self.run());
        handle
    }

    /// Run the coordinator task
    ///
    /// This consumes the coordinator and runs until shutdown is requested.
    pub async fn run(mut self) {
        let scope = self.machine.scope().to_string();
        info!(%scope, "SessionCoordinator started");

        // Subscribe before the startup read so no event falls between them
        let subscription = self.channel.subscribe();
        let pump = tokio::spawn(forward_identity(self.channel.clone(), subscription, self.tx.clone()));

        while let Some(req) = self.rx.recv().await {
            match req {
                SessionRequest::IdentityChanged { identity } => {
                    self.step(SessionInput::Identity(identity));
                }

                SessionRequest::ChannelFailed { message } => {
                    self.step(SessionInput::ChannelFailed { message });
                }

                SessionRequest::ProfileFetched { generation, result } => {
                    self.step(SessionInput::ProfileLoaded { generation, result });
                }

                SessionRequest::ResourceFetched {
                    generation,
                    name,
                    result,
                } => {
                    self.step(SessionInput::ResourceLoaded {
                        generation,
                        name,
                        result,
                    });
                }

                SessionRequest::OrphanTimerFired { generation } => {
                    if matches!(self.orphan_timer, Some((armed, _)) if armed == generation) {
                        self.orphan_timer = None;
                    }
                    self.step(SessionInput::OrphanTimerFired { generation });
                }

                SessionRequest::Login { credentials, reply } => {
                    debug!(%scope, email = %credentials.email, "Login requested");
                    self.step(SessionInput::LoginStarted);
                    let generation = self.machine.generation();
                    let epoch = self.machine.login_epoch();

                    let channel = self.channel.clone();
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let result = channel.login(credentials).await;
                        if result.is_ok() {
                            // Applied before readiness is released, unless anything moved the generation
                            if let Ok(identity) = channel.current_identity().await {
                                let _ = tx.send(SessionRequest::LoginIdentity { generation, identity }).await;
                            }
                        }
                        let _ = tx.send(SessionRequest::LoginFinished { epoch, result, reply }).await;
                    });
                }

                SessionRequest::LoginIdentity { generation, identity } => {
                    self.step(SessionInput::LoginIdentity { generation, identity });
                }

                SessionRequest::LoginFinished { epoch, result, reply } => {
                    self.step(SessionInput::LoginFinished {
                        epoch,
                        succeeded: result.is_ok(),
                    });
                    if let Err(e) = &result {
                        warn!(%scope, error = %e, "Login failed");
                    }
                    let _ = reply.send(result.map_err(SessionError::Login));
                }

                SessionRequest::Logout { reply } => {
                    // Local state is cleared before the provider is asked
                    self.step(SessionInput::Logout);

                    let channel = self.channel.clone();
                    tokio::spawn(async move {
                        let result = channel.logout().await;
                        if let Err(e) = &result {
                            warn!(error = %e, "Provider logout failed");
                        }
                        let _ = reply.send(result.map_err(SessionError::Logout));
                    });
                }

                SessionRequest::GetMetrics { reply } => {
                    let _ = reply.send(self.machine.metrics());
                }

                SessionRequest::Shutdown => {
                    info!(%scope, "SessionCoordinator shutting down");
                    break;
                }
            }
        }

        pump.abort();
        if let Some((_, timer)) = self.orphan_timer.take() {
            timer.abort();
        }
        info!(%scope, "SessionCoordinator stopped");
    }

    /// Apply one input, execute its effects and publish the new snapshot
    fn step(&mut self, input: SessionInput<P>) {
        for effect in self.machine.apply(input) {
            self.execute(effect);
        }
        self.publish();
    }

    fn execute(&mut self, effect: Effect) {
        debug!(scope = self.machine.scope(), ?effect, "execute: called");
        match effect {
            Effect::FetchProfile { generation, identity } => {
                let fetcher = self.fetcher.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = fetcher.fetch(&identity).await;
                    let _ = tx.send(SessionRequest::ProfileFetched { generation, result }).await;
                });
            }

            Effect::FetchResources { generation, identity } => {
                let resources = self.resources.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let mut pending: FuturesUnordered<_> = resources
                        .iter()
                        .map(|resource| {
                            let identity = &identity;
                            async move { (resource.name().to_string(), resource.fetch(identity).await) }
                        })
                        .collect();

                    while let Some((name, result)) = pending.next().await {
                        if tx
                            .send(SessionRequest::ResourceFetched {
                                generation,
                                name,
                                result,
                            })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                });
            }

            Effect::ArmOrphanTimer { generation, delay } => {
                if let Some((previous, timer)) = self.orphan_timer.take() {
                    debug!(%previous, "Replacing armed orphan timer");
                    timer.abort();
                }
                let tx = self.tx.clone();
                let task: JoinHandle<()> = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(SessionRequest::OrphanTimerFired { generation }).await;
                });
                debug!(%generation, ?delay, "Orphan timer armed");
                self.orphan_timer = Some((generation, task.abort_handle()));
            }

            Effect::CancelOrphanTimer { generation } => {
                if let Some((armed, timer)) = self.orphan_timer.take() {
                    debug!(%generation, %armed, "Orphan timer cancelled");
                    timer.abort();
                }
            }

            Effect::Notify(notice) => {
                self.notifier.notify(notice);
            }

            Effect::SignOut => {
                let channel = self.channel.clone();
                tokio::spawn(async move {
                    if let Err(e) = channel.logout().await {
                        warn!(error = %e, "Forced provider logout failed");
                    }
                });
            }
        }
    }

    /// Publish the derived snapshot if it changed
    fn publish(&self) {
        let next = self.machine.snapshot();
        let changed = self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!(scope = self.machine.scope(), "Snapshot published");
        }
    }
}

/// Forward the startup identity and every subsequent channel event
async fn forward_identity<P>(
    channel: Arc<dyn IdentityChannel>,
    mut subscription: Subscription,
    tx: mpsc::Sender<SessionRequest<P>>,
) {
    let initial = match channel.current_identity().await {
        Ok(identity) => SessionRequest::IdentityChanged { identity },
        Err(e) => SessionRequest::ChannelFailed { message: e.to_string() },
    };
    if tx.send(initial).await.is_err() {
        return;
    }

    while let Some(event) = subscription.next().await {
        let req = match event {
            IdentityEvent::Changed { change, identity } => {
                debug!(scope = channel.scope(), %change, "Identity event");
                SessionRequest::IdentityChanged { identity }
            }
            IdentityEvent::Failed { message } => SessionRequest::ChannelFailed { message },
        };
        if tx.send(req).await.is_err() {
            return;
        }
    }

    // Shutdown aborts this task, so reaching here means the provider went away
    warn!(scope = channel.scope(), "Identity subscription ended");
    let _ = tx
        .send(SessionRequest::ChannelFailed {
            message: ChannelError::Closed.to_string(),
        })
        .await;
}
