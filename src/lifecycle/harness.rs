//! The honeypot harness: owns the collaborators and drives the lifecycle.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::config::HoneypotConfig;
use crate::http::{Responder, ResponderSettings};
use crate::lifecycle::{shutdown, startup, Control, LifecycleEvent, LifecycleState};
use crate::net::{AcceptLoop, ConnectionTracker, ListenerError};
use crate::observability::metrics;
use crate::signatures::{load_snapshot, Scorer, SnapshotStore};
use crate::telemetry::TelemetrySink;
use crate::tunnel::TunnelManager;

/// Error type for the harness run loop.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Observes and controls a running harness from another task.
#[derive(Debug, Clone)]
pub struct HarnessHandle {
    control: Control,
    state: watch::Receiver<LifecycleState>,
    local_addr: Arc<OnceLock<SocketAddr>>,
}

impl HarnessHandle {
    pub fn control(&self) -> &Control {
        &self.control
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Address of the bound listener, once Starting has bound it.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Wait until the harness has reached at least `target`.
    /// Returns `false` if the harness went away first.
    pub async fn wait_for(&mut self, target: LifecycleState) -> bool {
        self.state.wait_for(|state| *state >= target).await.is_ok()
    }
}

/// Runs the honeypot with injected telemetry sink, tunnel manager and scorer.
pub struct Harness<S, T, C> {
    config: HoneypotConfig,
    sink: Arc<S>,
    tunnel: Arc<T>,
    scorer: Arc<C>,
    store: Arc<SnapshotStore>,
    control: Control,
    events: mpsc::UnboundedReceiver<LifecycleEvent>,
    state: watch::Sender<LifecycleState>,
    local_addr: Arc<OnceLock<SocketAddr>>,
}

impl<S, T, C> Harness<S, T, C>
where
    S: TelemetrySink,
    T: TunnelManager,
    C: Scorer,
{
    pub fn new(config: HoneypotConfig, sink: Arc<S>, tunnel: Arc<T>, scorer: Arc<C>) -> Self {
        let (control, events) = Control::channel();
        let (state, _) = watch::channel(LifecycleState::Unstarted);
        Self {
            config,
            sink,
            tunnel,
            scorer,
            store: Arc::new(SnapshotStore::default()),
            control,
            events,
            state,
            local_addr: Arc::new(OnceLock::new()),
        }
    }

    pub fn control(&self) -> Control {
        self.control.clone()
    }

    pub fn handle(&self) -> HarnessHandle {
        HarnessHandle {
            control: self.control.clone(),
            state: self.state.subscribe(),
            local_addr: Arc::clone(&self.local_addr),
        }
    }

    /// Start, serve until a shutdown event, then drain. Consumes the harness.
    pub async fn run(mut self) -> Result<(), HarnessError> {
        self.state.send_replace(LifecycleState::Starting);
        tracing::info!("Honeypot starting");

        let listener = {
            let starting = startup::start(&self.config, self.sink.as_ref(), self.tunnel.as_ref(), &self.store);
            tokio::pin!(starting);
            loop {
                tokio::select! {
                    listener = &mut starting => break Some(listener),
                    event = self.events.recv() => match event {
                        Some(LifecycleEvent::Reload) => {
                            tracing::debug!("Reload requested during startup, data is loaded by startup itself");
                        }
                        Some(LifecycleEvent::Shutdown) | None => {
                            tracing::info!("Shutdown requested during startup, aborting");
                            break None;
                        }
                    },
                }
            }
        };

        let tracker = ConnectionTracker::new();
        let Some(listener) = listener else {
            self.release(None, tracker).await;
            return Ok(());
        };

        let local_addr = listener.local_addr();
        // `run` consumes the harness, so the address is set at most once.
        let first_bind = self.local_addr.set(local_addr).is_ok();
        debug_assert!(first_bind, "listener address set twice");
        let responder = Arc::new(Responder::new(
            Arc::clone(&self.scorer),
            Arc::clone(&self.sink),
            ResponderSettings::from_config(&self.config.listener, &self.config.telemetry),
        ));
        let accept = match listener.spawn(responder, Arc::clone(&self.store), tracker.clone()) {
            Ok(accept) => accept,
            Err(e) => {
                self.release(None, tracker).await;
                return Err(e.into());
            }
        };

        self.state.send_replace(LifecycleState::Listening);
        tracing::info!(address = %local_addr, "Honeypot listening");
        self.serve_events().await;

        self.release(Some(accept), tracker).await;
        Ok(())
    }

    async fn serve_events(&mut self) {
        while let Some(event) = self.events.recv().await {
            match event {
                LifecycleEvent::Reload => self.reload(),
                LifecycleEvent::Shutdown => break,
            }
        }
    }

    fn reload(&self) {
        let snapshot = load_snapshot(&self.config.data);
        tracing::info!(
            signatures = snapshot.signatures.len(),
            responses = snapshot.responses.len(),
            customizations = snapshot.customizations.len(),
            "Data files reloaded"
        );
        self.store.replace(snapshot);
        metrics::record_reload();
    }

    async fn release(&self, accept: Option<AcceptLoop>, tracker: ConnectionTracker) {
        if !shutdown::begin_drain(&self.state) {
            return;
        }
        tracing::info!("Honeypot draining");

        shutdown::drain(
            accept,
            tracker,
            Duration::from_secs(self.config.listener.drain_timeout_secs),
            self.sink.as_ref(),
            self.tunnel.as_ref(),
        )
        .await;

        self.state.send_replace(LifecycleState::Stopped);
        tracing::info!("Honeypot stopped");
    }
}
