//! Best-effort fan-out of facts to a `FactSink`.

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures_util::{future::join_all, FutureExt};
use tokio::task::JoinHandle;

use crate::fact_sink::FactSink;
use crate::facts::Fact;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct FactDispatcher {
    sink: Arc<dyn FactSink>,
}

impl FactDispatcher {
    pub fn new(sink: Arc<dyn FactSink>) -> Self {
        Self { sink }
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Attempts every fact once, concurrently. Failures and panics are logged
    /// and counted; they never prevent the remaining facts from being tried.
    pub async fn deliver_all(&self, facts: Vec<Fact>) -> DeliveryReport {
        let outcomes = join_all(facts.iter().map(|fact| self.deliver_one(fact))).await;
        let delivered = outcomes.iter().filter(|delivered| **delivered).count();
        DeliveryReport {
            attempted: outcomes.len(),
            delivered,
            failed: outcomes.len().saturating_sub(delivered),
        }
    }

    /// Fire-and-forget variant of `deliver_all`; returns `None` for no facts.
    pub fn spawn_delivery(&self, facts: Vec<Fact>) -> Option<JoinHandle<DeliveryReport>> {
        if facts.is_empty() {
            return None;
        }
        let dispatcher = self.clone();
        Some(tokio::spawn(
            async move { dispatcher.deliver_all(facts).await },
        ))
    }

    async fn deliver_one(&self, fact: &Fact) -> bool {
        match AssertUnwindSafe(self.sink.deliver(fact))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {
                tracing::debug!(
                    sink = self.sink.name(),
                    fact_type = fact.kind().as_str(),
                    guild_id = fact.guild_id(),
                    "fact delivered"
                );
                true
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    sink = self.sink.name(),
                    fact_type = fact.kind().as_str(),
                    guild_id = fact.guild_id(),
                    error = %format!("{error:#}"),
                    "fact delivery failed; dropping fact"
                );
                false
            }
            Err(_) => {
                tracing::error!(
                    sink = self.sink.name(),
                    fact_type = fact.kind().as_str(),
                    guild_id = fact.guild_id(),
                    "fact sink panicked during delivery; dropping fact"
                );
                false
            }
        }
    }
}
