//! Background task that owns the backend subscription.
//!
//! The task drives [`ConnectionMachine`] and performs the I/O each state
//! calls for: waiting out backoff, authenticating and subscribing, pumping
//! listener events into the [`FeedingStore`] while running health checks,
//! and tearing stale subscriptions down. Observers read the latest
//! [`ConnectionStatus`] from a watch channel and never wait on the task.
//!
//! Only one connection attempt exists at a time: an attempt runs inside the
//! task's own loop, and a manual refresh, shutdown or detected host
//! suspension that arrives mid-attempt drops the attempt's future before
//! anything else starts.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::backoff::BackoffPolicy;
use super::clock::{Clock, SleepGap};
use super::machine::{ConnectionMachine, Trigger};
use super::state::{ConnectionState, ConnectionStatus, Transition, TransitionCause};
use crate::backend::{Credentials, FeedBackend, ListenerSignal, ListenerSink, SessionSlot};
use crate::error::ConnectionError;
use crate::feeding::{FeedingRecord, FeedingStore};

const TRANSITION_BUFFER: usize = 64;

/// Timing knobs for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Longest silence (no event, no keepalive) tolerated while connected.
    pub heartbeat_timeout: Duration,
    /// How often sleep-gap and heartbeat checks run.
    pub health_check_interval: Duration,
    /// Wall-over-monotonic drift that counts as a host suspension.
    pub sleep_gap_threshold: Duration,
    /// Upper bound on one authenticate+subscribe attempt and on unsubscribe.
    pub connect_timeout: Duration,
    pub backoff: BackoffPolicy,
    /// Fixed seed for backoff jitter (None = random)
    pub jitter_seed: Option<u64>,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(90),
            health_check_interval: Duration::from_secs(5),
            sleep_gap_threshold: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
            jitter_seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Refresh,
    Shutdown,
}

/// Handle to the supervisor task.
///
/// Dropping every handle shuts the task down.
#[derive(Debug, Clone)]
pub struct ConnectionSupervisor<S> {
    status: watch::Receiver<ConnectionStatus>,
    transitions: broadcast::Sender<Transition>,
    commands: mpsc::UnboundedSender<Command>,
    session: SessionSlot<S>,
}

impl<S: Clone + Send + Sync + 'static> ConnectionSupervisor<S> {
    /// Spawn the supervisor on the current tokio runtime.
    pub fn spawn<B>(
        backend: Arc<B>,
        credentials: Credentials,
        store: Arc<FeedingStore>,
        settings: SupervisorSettings,
        clock: Arc<dyn Clock>,
    ) -> (Self, JoinHandle<()>)
    where
        B: FeedBackend<Session = S>,
    {
        let machine = ConnectionMachine::new(clock.sample().wall);
        let (status_tx, status_rx) = watch::channel(machine.status().clone());
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let session = SessionSlot::new();
        let rng = match settings.jitter_seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };

        let worker = Worker {
            backend,
            credentials,
            store,
            settings,
            clock,
            machine,
            status: status_tx,
            transitions: transitions.clone(),
            commands: commands_rx,
            session: session.clone(),
            rng,
        };
        let task = tokio::spawn(worker.run());

        let handle = Self {
            status: status_rx,
            transitions,
            commands: commands_tx,
            session,
        };
        (handle, task)
    }

    pub fn current_state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Every transition from now on. Slow receivers may lag and skip.
    pub fn transitions(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }

    /// Force a fresh connection attempt now, whatever the state.
    pub fn manual_refresh(&self) {
        if self.commands.send(Command::Refresh).is_err() {
            tracing::debug!("refresh requested after supervisor stopped");
        }
    }

    pub fn shutdown(&self) {
        if self.commands.send(Command::Shutdown).is_err() {
            tracing::debug!("shutdown requested after supervisor stopped");
        }
    }

    /// Session of the live subscription, for writers.
    pub fn session_slot(&self) -> SessionSlot<S> {
        self.session.clone()
    }
}

struct Live<B: FeedBackend> {
    subscription: B::Subscription,
    signals: mpsc::UnboundedReceiver<ListenerSignal>,
}

enum Attempt<B: FeedBackend> {
    Established { session: B::Session, live: Live<B> },
    Failed(ConnectionError),
    Interrupted(Trigger),
}

struct Worker<B: FeedBackend> {
    backend: Arc<B>,
    credentials: Credentials,
    store: Arc<FeedingStore>,
    settings: SupervisorSettings,
    clock: Arc<dyn Clock>,
    machine: ConnectionMachine,
    status: watch::Sender<ConnectionStatus>,
    transitions: broadcast::Sender<Transition>,
    commands: mpsc::UnboundedReceiver<Command>,
    session: SessionSlot<B::Session>,
    rng: Mcg128Xsl64,
}

impl<B: FeedBackend> Worker<B> {
    async fn run(mut self) {
        let mut live: Option<Live<B>> = None;
        self.fire(Trigger::Start);

        while !self.machine.is_shut_down() {
            let trigger = match self.machine.state() {
                ConnectionState::Disconnected => self.wait_backoff().await,
                ConnectionState::Connecting => match self.attempt().await {
                    Attempt::Established { session, live: established } => {
                        self.session.set(Some(session));
                        live = Some(established);
                        Trigger::Established
                    }
                    Attempt::Failed(err) => Trigger::AttemptFailed(err),
                    Attempt::Interrupted(trigger) => trigger,
                },
                ConnectionState::Connected => match live.as_mut() {
                    Some(current) => self.watch(&mut current.signals).await,
                    None => Trigger::Lost(ConnectionError::Transport(
                        "no live subscription".into(),
                    )),
                },
                ConnectionState::Reconnecting | ConnectionState::Suspended => {
                    self.teardown(live.take()).await;
                    Trigger::TornDown
                }
            };
            self.fire(trigger);
        }

        self.teardown(live.take()).await;
        tracing::info!("connection supervisor stopped");
    }

    fn fire(&mut self, trigger: Trigger) {
        let at = self.clock.sample().wall;
        let Some(transition) = self.machine.apply(trigger, at) else {
            return;
        };
        match &transition.cause {
            TransitionCause::Failure(err) => tracing::warn!(
                from = %transition.from,
                to = %transition.to,
                error = %err,
                failures = self.machine.failures(),
                "connection state changed"
            ),
            cause => tracing::info!(
                from = %transition.from,
                to = %transition.to,
                cause = ?cause,
                "connection state changed"
            ),
        }
        self.status.send_replace(self.machine.status().clone());
        // No subscribers is fine; the watch channel still has the state.
        let _ = self.transitions.send(transition);
    }

    async fn wait_backoff(&mut self) -> Trigger {
        let failures = self.machine.failures();
        let delay = self.settings.backoff.delay(failures, &mut self.rng);
        tracing::info!(
            ?delay,
            failures,
            "waiting before next connection attempt"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => Trigger::BackoffElapsed,
            command = self.commands.recv() => command_trigger(command),
        }
    }

    async fn attempt(&mut self) -> Attempt<B> {
        let backend = Arc::clone(&self.backend);
        let credentials = self.credentials.clone();
        let (sink, signals) = ListenerSink::channel();
        let connect = async move {
            let session = backend.authenticate(&credentials).await?;
            let subscription = backend.subscribe(&session, sink).await?;
            Ok::<_, ConnectionError>((session, subscription))
        };
        let limit = self.settings.connect_timeout;
        let connect = tokio::time::timeout(limit, connect);
        tokio::pin!(connect);

        // tokio time stands still while the host sleeps, so the attempt needs
        // its own gap check.
        let period = self.settings.health_check_interval;
        let mut health = tokio::time::interval_at(Instant::now() + period, period);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_check = self.clock.sample();

        loop {
            tokio::select! {
                result = &mut connect => {
                    return match result {
                        Ok(Ok((session, subscription))) => Attempt::Established {
                            session,
                            live: Live { subscription, signals },
                        },
                        Ok(Err(err)) => Attempt::Failed(err),
                        Err(_) => Attempt::Failed(ConnectionError::Transport(format!(
                            "connection attempt timed out after {}s",
                            limit.as_secs()
                        ))),
                    };
                }
                _ = health.tick() => {
                    let now = self.clock.sample();
                    if let Some(gap) =
                        SleepGap::between(last_check, now, self.settings.sleep_gap_threshold)
                    {
                        tracing::debug!("connection attempt spans a suspension, abandoning it");
                        return Attempt::Interrupted(Trigger::Lost(gap.into_error()));
                    }
                    last_check = now;
                }
                command = self.commands.recv() => {
                    tracing::debug!("connection attempt abandoned");
                    return Attempt::Interrupted(command_trigger(command));
                }
            }
        }
    }

    /// Pump listener signals and run health checks until the connection
    /// has to be left.
    async fn watch(&mut self, signals: &mut mpsc::UnboundedReceiver<ListenerSignal>) -> Trigger {
        let period = self.settings.health_check_interval;
        let mut health = tokio::time::interval_at(Instant::now() + period, period);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_check = self.clock.sample();
        let mut last_heard = last_check.monotonic;

        loop {
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(ListenerSignal::Entry(entry)) => {
                        last_heard = self.clock.sample().monotonic;
                        self.store.replace(FeedingRecord::remote(entry));
                    }
                    Some(ListenerSignal::Keepalive) => {
                        last_heard = self.clock.sample().monotonic;
                    }
                    Some(ListenerSignal::Error(err)) => return Trigger::Lost(err),
                    None => {
                        return Trigger::Lost(ConnectionError::Transport(
                            "listener stopped".into(),
                        ))
                    }
                },
                _ = health.tick() => {
                    let now = self.clock.sample();
                    // Suspension first: after a sleep the heartbeat is stale too,
                    // but the subscription must be treated as dead, not slow.
                    if let Some(gap) =
                        SleepGap::between(last_check, now, self.settings.sleep_gap_threshold)
                    {
                        return Trigger::Lost(gap.into_error());
                    }
                    last_check = now;

                    let silent = now.monotonic.saturating_sub(last_heard);
                    if silent > self.settings.heartbeat_timeout {
                        return Trigger::Lost(ConnectionError::Timeout {
                            silent_secs: silent.as_secs(),
                        });
                    }
                }
                command = self.commands.recv() => return command_trigger(command),
            }
        }
    }

    async fn teardown(&mut self, live: Option<Live<B>>) {
        self.session.set(None);
        let Some(live) = live else {
            return;
        };
        drop(live.signals);
        let unsubscribe = self.backend.unsubscribe(live.subscription);
        if tokio::time::timeout(self.settings.connect_timeout, unsubscribe)
            .await
            .is_err()
        {
            tracing::warn!("unsubscribe timed out, abandoning stale subscription");
        }
    }
}

fn command_trigger(command: Option<Command>) -> Trigger {
    match command {
        Some(Command::Refresh) => Trigger::ManualRefresh,
        Some(Command::Shutdown) | None => Trigger::Shutdown,
    }
}
