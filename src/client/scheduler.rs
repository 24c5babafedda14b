use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::callbacks::SessionCallbacks;
use crate::client::outbox::Outbox;
use crate::directive::Directive;
use crate::error::TransportError;

/// Deferred directives. Every pending send can be cancelled at once.
///
/// Each send is stamped with the generation it was decided in. Invalidating
/// bumps the generation; a send whose stamp is stale is never spawned, and a
/// spawned one re-checks its stamp after sleeping. Deferred and immediate
/// sends pass through one gate, so a directive sent right after an
/// invalidation cannot be overtaken by a stale one.
pub(crate) struct Scheduler {
    outbox: Arc<Outbox>,
    callbacks: Arc<dyn SessionCallbacks>,
    generation: Arc<AtomicU64>,
    pending: Mutex<Vec<(u64, JoinHandle<()>)>>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Scheduler {
    pub(crate) fn new(outbox: Arc<Outbox>, callbacks: Arc<dyn SessionCallbacks>) -> Self {
        Self {
            outbox,
            callbacks,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(Vec::new()),
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Sends now, after any deferred send already past its stamp check.
    pub(crate) async fn send_now(&self, directive: &Directive) -> Result<(), TransportError> {
        let _gate = self.gate.lock().await;
        self.outbox.send(directive).await
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Marks every send decided so far as stale. Returns the new generation.
    pub(crate) fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn schedule(&self, directive: Directive, delay: Duration, generation: u64) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if self.outbox.is_closed() {
            return;
        }
        if generation != self.generation() {
            tracing::debug!("dropping {:?} decided before a cancel", directive);
            return;
        }
        tracing::debug!("scheduling {:?} in {:?}", directive, delay);
        let outbox = self.outbox.clone();
        let callbacks = self.callbacks.clone();
        let current = self.generation.clone();
        let gate = self.gate.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _gate = gate.lock().await;
            if outbox.is_closed() || current.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = outbox.send(&directive).await {
                tracing::error!("failed to send {:?}: {}", directive, e);
                callbacks.on_error(&e);
            }
        });
        pending.retain(|(_, h)| !h.is_finished());
        pending.push((generation, handle));
    }

    /// Aborts sends stamped before `generation`.
    pub(crate) fn cancel_before(&self, generation: u64) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let before = pending.len();
        pending.retain(|(stamp, handle)| {
            if *stamp < generation {
                handle.abort();
                false
            } else {
                true
            }
        });
        if pending.len() < before {
            tracing::debug!("cancelled {} pending directives", before - pending.len());
        }
    }

    pub(crate) fn cancel_all(&self) {
        let generation = self.invalidate();
        self.cancel_before(generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::NoopCallbacks;
    use crate::transport::ControlChannel;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    struct OpenChannel {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ControlChannel for OpenChannel {
        fn label(&self) -> &str {
            "oai-events"
        }

        fn is_open(&self) -> bool {
            true
        }

        async fn send(&self, text: String) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn close(&self) {}
    }

    fn scheduler() -> (Scheduler, Arc<OpenChannel>) {
        let channel = Arc::new(OpenChannel::default());
        let outbox = Arc::new(Outbox::new(channel.clone(), Arc::new(AtomicBool::new(false)), false));
        (Scheduler::new(outbox, Arc::new(NoopCallbacks)), channel)
    }

    const DELAY: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_send_after_delay() {
        let (scheduler, channel) = scheduler();
        scheduler.schedule(Directive::Continue, DELAY, scheduler.generation());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(channel.sent.lock().unwrap().is_empty());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_schedule_is_dropped() {
        let (scheduler, channel) = scheduler();
        let decided = scheduler.generation();
        let current = scheduler.invalidate();
        scheduler.cancel_before(current);
        scheduler.schedule(Directive::Continue, DELAY, decided);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_send_does_not_fire() {
        let (scheduler, channel) = scheduler();
        scheduler.schedule(Directive::Continue, DELAY, scheduler.generation());
        // Invalidated without the abort landing: the task sees the new generation.
        scheduler.invalidate();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_newer_sends() {
        let (scheduler, channel) = scheduler();
        scheduler.schedule(Directive::Continue, DELAY, scheduler.generation());
        let current = scheduler.invalidate();
        scheduler.schedule(Directive::FirstLine, DELAY, current);
        scheduler.cancel_before(current);
        tokio::time::sleep(Duration::from_secs(2)).await;

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains(crate::directive::FIRST_LINE_TEXT));
    }
}
