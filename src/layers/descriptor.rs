//! The layer catalogue: read-only reference data fetched once per session.

use crate::core::geo::LatLngBounds;
use serde::{Deserialize, Serialize};

/// Stable backend-assigned layer identifier
pub type LayerId = u32;

/// One row of the layer catalogue. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub id: LayerId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Envelope of the layer's features, when the backend knows it
    #[serde(default)]
    pub bbox: Option<LatLngBounds>,
}

impl LayerDescriptor {
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            created_at: None,
            bbox: None,
        }
    }
}
