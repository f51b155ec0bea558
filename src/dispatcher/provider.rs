use async_trait::async_trait;

use crate::{Result, workflow::node::AnalysisResult};

/// Produces the analytical result of one card type for one symbol.
///
/// Implementations own their I/O and timeouts. Any `Err` is recorded as a
/// failure of that single step; its `Display` text becomes the error message.
#[async_trait]
pub trait ResultProvider: Send + Sync {
    async fn resolve(
        &self,
        card_type: &str,
        symbol: &str,
    ) -> Result<AnalysisResult>;
}
