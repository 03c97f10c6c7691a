//! HTTP implementation of the backend contract.
//!
//! Matches the viewer backend's wire protocol: cookie-session auth under
//! `/auth`, the layer catalogue at `/layers/`, vector tiles at
//! `/tiles/layer/{layer}/{z}/{x}/{y}.mvt`, and the per-user view-state blob
//! behind `PUT /auth/me/map-state`.

use crate::{
    backend::client::BackendClient,
    core::geo::{LatLng, LatLngBounds},
    layers::descriptor::{LayerDescriptor, LayerId},
    session::identity::{Identity, ViewState},
    Error, Result,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub struct HttpBackend {
    base: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mapcore/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .build()?;
        Ok(Self {
            base: api_base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Catalogue row as served: the bbox arrives as a GeoJSON geometry and is
/// reduced to its envelope here.
#[derive(Deserialize)]
struct LayerRow {
    id: LayerId,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    bbox: Option<serde_json::Value>,
}

impl From<LayerRow> for LayerDescriptor {
    fn from(row: LayerRow) -> Self {
        LayerDescriptor {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            bbox: row.bbox.as_ref().and_then(envelope_of_geojson),
        }
    }
}

/// Envelope of any GeoJSON geometry's coordinates, scanning nested
/// coordinate arrays for `[lng, lat]` pairs.
fn envelope_of_geojson(geometry: &serde_json::Value) -> Option<LatLngBounds> {
    fn visit(value: &serde_json::Value, bounds: &mut Option<LatLngBounds>) {
        let Some(items) = value.as_array() else {
            return;
        };
        let pair = (
            items.first().and_then(|v| v.as_f64()),
            items.get(1).and_then(|v| v.as_f64()),
        );
        if let (Some(lng), Some(lat)) = pair {
            let point = LatLng::new(lat, lng);
            match bounds {
                Some(b) => b.extend(&point),
                None => *bounds = Some(LatLngBounds::from_point(point)),
            }
            return;
        }
        for item in items {
            visit(item, bounds);
        }
    }

    let mut bounds = None;
    visit(geometry.get("coordinates")?, &mut bounds);
    bounds
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn resolve_identity(&self) -> Result<Option<Identity>> {
        let resp = self.client.get(self.url("/auth/me")).send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::Backend(format!(
                "identity fetch failed: {}",
                resp.status()
            )));
        }
        Ok(Some(resp.json().await?))
    }

    async fn login(&self, email: &str, password: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&Credentials { email, password })
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            let message = body.trim();
            return Err(Error::CredentialsRejected(if message.is_empty() {
                "bad credentials".to_string()
            } else {
                message.to_string()
            }));
        }
        if !resp.status().is_success() {
            return Err(Error::Backend(format!("login failed: {}", resp.status())));
        }
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let resp = self.client.post(self.url("/auth/logout")).send().await?;
        if !resp.status().is_success() {
            return Err(Error::Backend(format!("logout failed: {}", resp.status())));
        }
        Ok(())
    }

    async fn list_layers(&self) -> Result<Vec<LayerDescriptor>> {
        let resp = self.client.get(self.url("/layers/")).send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        if !resp.status().is_success() {
            return Err(Error::Backend(format!(
                "layer list failed: {}",
                resp.status()
            )));
        }
        let rows: Vec<LayerRow> = resp.json().await?;
        Ok(rows.into_iter().map(LayerDescriptor::from).collect())
    }

    async fn persist_view_state(&self, state: &ViewState) -> Result<()> {
        let resp = self
            .client
            .put(self.url("/auth/me/map-state"))
            .json(state)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Backend(format!(
                "view state save failed: {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn layer_tile_template(&self) -> String {
        format!("{}/tiles/layer/{{layer}}/{{z}}/{{x}}/{{y}}.mvt", self.base)
    }
}
