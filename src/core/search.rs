use crate::core::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One match returned by a symbol search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub identifier: String,
    pub display_name: String,
}

#[async_trait]
pub trait SymbolSearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>>;
}
