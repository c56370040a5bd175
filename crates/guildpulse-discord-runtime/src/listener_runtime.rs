//! Platform-neutral event handling shared by the gateway adapter.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use guildpulse_facts::{DeliveryReport, EventRouter, FactDispatcher, ListenerEvent};
use tokio::task::JoinHandle;

#[derive(Clone)]
/// Routes each inbound event to facts and hands them to the dispatcher.
pub struct ListenerRuntime {
    router: EventRouter,
    dispatcher: FactDispatcher,
}

impl ListenerRuntime {
    pub fn new(router: EventRouter, dispatcher: FactDispatcher) -> Self {
        Self { router, dispatcher }
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Routes `event` synchronously, then spawns delivery of its facts.
    ///
    /// A panic while routing is logged and the event dropped; the listener
    /// keeps processing later events.
    pub fn handle_event(
        &self,
        event: ListenerEvent,
        now: DateTime<Utc>,
    ) -> Option<JoinHandle<DeliveryReport>> {
        let routed = catch_unwind(AssertUnwindSafe(|| self.router.route(&event, now)));
        let facts = match routed {
            Ok(facts) => facts,
            Err(_) => {
                tracing::error!(event = event.as_str(), "event routing panicked; event dropped");
                return None;
            }
        };
        if facts.is_empty() {
            tracing::trace!(event = event.as_str(), "event produced no facts");
            return None;
        }
        tracing::debug!(
            event = event.as_str(),
            facts = facts.len(),
            sink = self.dispatcher.sink_name(),
            "dispatching facts"
        );
        self.dispatcher.spawn_delivery(facts)
    }

    /// Empties the voice table at shutdown and returns how many sessions were open.
    ///
    /// Orphaned sessions have no observed end, so no records are emitted.
    pub fn shutdown(&self) -> usize {
        let orphaned = self.router.tracker().drain_open_sessions();
        if !orphaned.is_empty() {
            tracing::info!(
                open_sessions = orphaned.len(),
                "discarding voice sessions still open at shutdown"
            );
        }
        orphaned.len()
    }
}
