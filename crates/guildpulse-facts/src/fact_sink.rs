use anyhow::Result;
use async_trait::async_trait;

use crate::facts::Fact;

#[async_trait]
/// Trait contract for `FactSink` behavior.
///
/// One call is one best-effort delivery attempt. Implementations must not
/// retry; the dispatcher logs a failure and drops the fact.
pub trait FactSink: Send + Sync {
    /// Short label used in delivery logs.
    fn name(&self) -> &'static str;

    async fn deliver(&self, fact: &Fact) -> Result<()>;
}
