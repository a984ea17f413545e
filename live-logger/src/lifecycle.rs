//! Lifecycle controller
//!
//! `Connecting -> Running -> Draining -> Stopped`, nothing else. Startup
//! failures leave the state at `Connecting` and surface as errors; there is
//! no restart path.

use std::fmt;
use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use log::info;
use tokio::sync::{mpsc, watch};

use crate::config::SubscriberConfig;
use crate::connection::{ConnectionEvents, ConnectionManager, LoggingEvents};
use crate::error::{LifecycleError, SubscriberError};
use crate::log_file::LogFile;
use crate::sink::{MessageSink, SinkStats};
use crate::subscription::SubscriptionSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Connecting,
    Running,
    Draining,
    Stopped,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Connecting => "Connecting",
            LifecycleState::Running => "Running",
            LifecycleState::Draining => "Draining",
            LifecycleState::Stopped => "Stopped",
        }
    }

    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        matches!(
            (self, next),
            (LifecycleState::Connecting, LifecycleState::Running)
                | (LifecycleState::Running, LifecycleState::Draining)
                | (LifecycleState::Draining, LifecycleState::Stopped)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state, observable through a watch channel
#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Connecting);
        Self { state }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn transition(&self, next: LifecycleState) -> Result<(), LifecycleError> {
        let from = self.state();
        if !from.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition { from, to: next });
        }

        self.state.send_replace(next);
        info!("🔁 Lifecycle: {} -> {}", from, next);
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a completed run
#[derive(Debug)]
pub struct RunReport<W> {
    pub stats: SinkStats,
    pub console: W,
    /// Whether the event loop finished within the grace period
    pub clean_disconnect: bool,
}

pub struct LifecycleController {
    config: SubscriberConfig,
    subscriptions: SubscriptionSet,
    events: Arc<dyn ConnectionEvents>,
    lifecycle: Lifecycle,
}

impl LifecycleController {
    pub fn new(config: SubscriberConfig) -> Self {
        Self {
            config,
            subscriptions: SubscriptionSet::openf1(),
            events: Arc::new(LoggingEvents),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn with_subscriptions(mut self, subscriptions: SubscriptionSet) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn ConnectionEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.subscribe()
    }

    /// Run until `shutdown` completes, printing messages to stdout
    pub async fn run<F>(self, shutdown: F) -> Result<RunReport<io::Stdout>, SubscriberError>
    where
        F: Future<Output = ()>,
    {
        self.run_with_console(io::stdout(), shutdown).await
    }

    /// Run until `shutdown` completes, printing messages to `console`
    pub async fn run_with_console<W, F>(
        self,
        console: W,
        shutdown: F,
    ) -> Result<RunReport<W>, SubscriberError>
    where
        W: Write + Send + 'static,
        F: Future<Output = ()>,
    {
        let Self {
            config,
            subscriptions,
            events,
            lifecycle,
        } = self;

        let log = LogFile::open(&config.log_file)
            .await
            .map_err(|source| SubscriberError::LogFile {
                path: config.log_file.clone(),
                source,
            })?;
        info!("📝 Appending messages to {}", log.path().display());

        let mut connection = ConnectionManager::connect(&config, events).await?;

        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let sink = MessageSink::new(console, log, config.decode_topics.iter().copied());
        let consumer = tokio::spawn(sink.run(rx));

        connection.subscribe(&subscriptions, &tx).await?;
        let dispatch = connection.spawn_dispatch(tx);
        lifecycle.transition(LifecycleState::Running)?;

        shutdown.await;

        lifecycle.transition(LifecycleState::Draining)?;
        let started = Instant::now();
        let clean_disconnect = dispatch.shutdown(config.grace_period).await;

        // The dispatch task owned the last sender, so the sink sees the channel close
        let sink = consumer.await.map_err(SubscriberError::SinkTask)?;
        info!("✅ Drained in {:?}", started.elapsed());

        lifecycle.transition(LifecycleState::Stopped)?;

        let stats = sink.stats().clone();
        Ok(RunReport {
            stats,
            console: sink.into_console(),
            clean_disconnect,
        })
    }
}

/// Future resolving on SIGINT (Ctrl+C) or SIGTERM
///
/// The handlers are installed before this returns, so a signal arriving
/// while the controller is still connecting is not lost.
#[cfg(unix)]
pub fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => {
                info!("🛑 Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
            _ = sigterm.recv() => {
                info!("🛑 Received SIGTERM, initiating graceful shutdown...");
            }
        }
    })
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("🛑 Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => {
                log::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    })
}
