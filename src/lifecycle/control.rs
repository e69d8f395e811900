//! Lifecycle control channel.

use tokio::sync::mpsc;

/// Requests delivered to the harness loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Reload signatures, responses and customizations.
    Reload,
    /// Stop accepting, drain and exit.
    Shutdown,
}

/// Cloneable handle for sending lifecycle events.
///
/// Sending never blocks, so it is safe from signal tasks, watcher callbacks
/// and worker threads alike. Events sent after the harness has stopped are
/// silently discarded.
#[derive(Debug, Clone)]
pub struct Control {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
}

impl Control {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn reload(&self) {
        self.send(LifecycleEvent::Reload);
    }

    pub fn shutdown(&self) {
        self.send(LifecycleEvent::Shutdown);
    }

    fn send(&self, event: LifecycleEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!(?event, "Harness already stopped, ignoring event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_order() {
        let (control, mut rx) = Control::channel();
        control.reload();
        control.clone().shutdown();
        assert_eq!(rx.try_recv().unwrap(), LifecycleEvent::Reload);
        assert_eq!(rx.try_recv().unwrap(), LifecycleEvent::Shutdown);
    }

    #[test]
    fn sending_after_stop_is_harmless() {
        let (control, rx) = Control::channel();
        drop(rx);
        control.shutdown();
        control.shutdown();
    }
}
