//! The logical layer state and its reconciliation against the surface.
//!
//! `LayerModel` owns which layers exist (the catalogue), which are enabled
//! and which are visible. Mutations go through the toggle operations, which
//! apply the corresponding surface changes through `LayerRenderAdapter`
//! before committing the new state; a surface failure leaves the model (and,
//! after rollback, the surface) exactly where it was.

use crate::{
    layers::{
        adapter::LayerRenderAdapter,
        descriptor::{LayerDescriptor, LayerId},
    },
    prelude::HashMap,
    render::surface::RenderSurface,
    Result,
};
use serde::{Deserialize, Serialize};

/// Enabled/visible flags for one layer.
/// `visible` is only meaningful while `enabled` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerVisibility {
    pub enabled: bool,
    pub visible: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        // Untouched layers start disabled but would show if enabled
        Self {
            enabled: false,
            visible: true,
        }
    }
}

#[derive(Default)]
pub struct LayerModel {
    /// Catalogue in backend order; read-only reference data
    descriptors: Vec<LayerDescriptor>,
    states: HashMap<LayerId, LayerVisibility>,
}

impl LayerModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the catalogue, fetched once per session
    pub fn seed(&mut self, descriptors: Vec<LayerDescriptor>) {
        self.descriptors = descriptors;
    }

    pub fn descriptors(&self) -> &[LayerDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, id: LayerId) -> Option<&LayerDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    pub fn is_known(&self, id: LayerId) -> bool {
        self.descriptor(id).is_some()
    }

    /// Current flags for a layer; untouched layers report the default
    pub fn state(&self, id: LayerId) -> LayerVisibility {
        self.states.get(&id).copied().unwrap_or_default()
    }

    /// Snapshot of every touched layer, for persistence
    pub fn snapshot(&self) -> HashMap<LayerId, LayerVisibility> {
        self.states.clone()
    }

    /// Flips `enabled`. Enabling instantiates render primitives with the
    /// current `visible` value; disabling tears them down. Unknown ids are
    /// no-ops; returns whether the model changed.
    pub fn toggle_enabled(
        &mut self,
        id: LayerId,
        adapter: &LayerRenderAdapter,
        surface: &mut dyn RenderSurface,
    ) -> Result<bool> {
        if !self.is_known(id) {
            log::debug!("toggle_enabled ignored for unknown layer {}", id);
            return Ok(false);
        }

        let current = self.state(id);
        let next = LayerVisibility {
            enabled: !current.enabled,
            ..current
        };

        if next.enabled {
            adapter.instantiate(surface, id, next.visible)?;
        } else {
            adapter.tear_down(surface, id)?;
        }
        self.states.insert(id, next);
        Ok(true)
    }

    /// Flips `visible`; only meaningful (and only accepted) while enabled.
    /// Updates the visibility flag of existing primitives, never re-creates
    /// them. Unknown or disabled ids are no-ops.
    pub fn toggle_visible(
        &mut self,
        id: LayerId,
        adapter: &LayerRenderAdapter,
        surface: &mut dyn RenderSurface,
    ) -> Result<bool> {
        if !self.is_known(id) {
            log::debug!("toggle_visible ignored for unknown layer {}", id);
            return Ok(false);
        }

        let current = self.state(id);
        if !current.enabled {
            return Ok(false);
        }
        let next = LayerVisibility {
            visible: !current.visible,
            ..current
        };

        adapter.set_visibility(surface, id, next.visible)?;
        self.states.insert(id, next);
        Ok(true)
    }

    /// Applies a persisted snapshot once, in catalogue order. Entries for
    /// layers the catalogue no longer lists are dropped.
    pub fn hydrate(
        &mut self,
        snapshot: &HashMap<LayerId, LayerVisibility>,
        adapter: &LayerRenderAdapter,
        surface: &mut dyn RenderSurface,
    ) -> Result<()> {
        for descriptor in &self.descriptors {
            let Some(state) = snapshot.get(&descriptor.id) else {
                continue;
            };
            if state.enabled {
                adapter.instantiate(surface, descriptor.id, state.visible)?;
            }
            self.states.insert(descriptor.id, *state);
        }
        Ok(())
    }

    /// Forgets catalogue and state; used at session teardown
    pub fn reset(&mut self) {
        self.descriptors.clear();
        self.states.clear();
    }
}
