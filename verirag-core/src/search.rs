use async_trait::async_trait;

use crate::VeriragError;

/// A search collaborator that turns a query into one content blob of ranked
/// snippets. Ranking and latency are up to the implementation.
#[async_trait]
pub trait SearchTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn search(&self, query: &str) -> Result<String, VeriragError>;
}
