//! The backend contract the viewer core consumes.

use crate::{
    core::geo::TileCoord,
    layers::descriptor::{LayerDescriptor, LayerId},
    session::identity::{Identity, ViewState},
    Result,
};
use async_trait::async_trait;

/// Everything the core needs from the HTTP backend. Unauthenticated is a
/// normal outcome (`Ok(None)` from `resolve_identity`), not an error.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Resolves the current identity, or None when no session exists
    async fn resolve_identity(&self) -> Result<Option<Identity>>;

    /// Establishes a session. Rejected credentials surface as
    /// `Error::CredentialsRejected`.
    async fn login(&self, email: &str, password: &str) -> Result<()>;

    async fn logout(&self) -> Result<()>;

    /// The layer catalogue, in backend order
    async fn list_layers(&self) -> Result<Vec<LayerDescriptor>>;

    /// Best-effort view-state save; callers decide whether failure matters
    async fn persist_view_state(&self, state: &ViewState) -> Result<()>;

    /// Tile URL template with `{layer}`, `{z}`, `{x}`, `{y}` placeholders.
    /// The rendering surface fetches tiles autonomously from this.
    fn layer_tile_template(&self) -> String;

    /// Credential handed to the surface's request-transform hook, when the
    /// tile endpoint wants one. Cookie-session backends return None.
    fn bearer_token(&self) -> Option<String> {
        None
    }

    /// Expands the template for one concrete tile
    fn tile_url(&self, layer: LayerId, coord: TileCoord) -> String {
        self.layer_tile_template()
            .replace("{layer}", &layer.to_string())
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }
}
