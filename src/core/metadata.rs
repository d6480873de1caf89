use crate::core::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Display details for a traded entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub display_name: String,
    pub logo_url: Option<String>,
}

/// What the presentation layer shows next to a symbol. Falls back to a
/// single-letter placeholder when metadata is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityIdentity {
    pub display_name: Option<String>,
    pub logo_url: Option<String>,
    pub placeholder: String,
}

impl EntityIdentity {
    pub fn placeholder_for(symbol: &str) -> Self {
        Self {
            display_name: None,
            logo_url: None,
            placeholder: placeholder_letter(symbol),
        }
    }

    pub fn from_metadata(symbol: &str, metadata: EntityMetadata) -> Self {
        Self {
            display_name: Some(metadata.display_name).filter(|name| !name.trim().is_empty()),
            logo_url: metadata.logo_url,
            placeholder: placeholder_letter(symbol),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.display_name.is_none() && self.logo_url.is_none()
    }
}

fn placeholder_letter(symbol: &str) -> String {
    symbol
        .trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch_metadata(&self, identifier: &str) -> Result<EntityMetadata>;
}
