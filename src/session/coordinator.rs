//! Session orchestration.
//!
//! `SessionCoordinator` owns the startup ordering problem: resolve identity,
//! mount the rendering surface, wait for style-load, hydrate model and camera
//! from persisted state, then open the gates for live changes. Phases are a
//! tagged union with exhaustive transitions, and every surface-originated
//! event carries the epoch of the mount that produced it, so events from a
//! previous identity's surface land in the void instead of in the new
//! session's state.

use crate::{
    backend::client::BackendClient,
    core::{
        config::MapConfig,
        geo::{LatLng, Point},
    },
    layers::{adapter::LayerRenderAdapter, descriptor::LayerId, model::LayerModel},
    measure::session::{MeasureMode, MeasurementSession},
    render::surface::{QueriedFeature, RenderSurface, StyleDescription},
    session::{
        identity::{CameraPose, Identity},
        recorder::ViewStateRecorder,
    },
    Error, Result,
};
use instant::Instant;

/// Lifecycle of the rendering surface within an authenticated session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStage {
    /// No surface requested yet
    Absent,
    /// Mount directive issued, waiting for style-load
    Mounting,
    /// Persisted state being applied, persistence gated off
    Hydrating,
    /// Fully interactive; changes flow to the recorder
    Ready,
}

/// Top-level session phase
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Identity not yet resolved
    Unknown,
    /// No session; the credential-entry flow applies
    Unauthenticated,
    Authenticated {
        identity: Identity,
        stage: SurfaceStage,
    },
}

/// Everything the host needs to mount the rendering surface
#[derive(Debug, Clone, PartialEq)]
pub struct MountDirective {
    /// Echo this epoch back with every event the surface emits
    pub epoch: u64,
    pub style: StyleDescription,
    pub camera: CameraPose,
    /// Credential for the tile request-transform hook, when the backend
    /// wants one
    pub bearer: Option<String>,
}

pub struct SessionCoordinator<B: BackendClient> {
    backend: B,
    config: MapConfig,
    phase: SessionPhase,
    /// Bumped on every authentication and teardown; scopes surface events
    epoch: u64,
    surface: Option<Box<dyn RenderSurface>>,
    layers: LayerModel,
    adapter: LayerRenderAdapter,
    recorder: ViewStateRecorder,
    measure: MeasurementSession,
    selected_layer: Option<LayerId>,
}

impl<B: BackendClient> SessionCoordinator<B> {
    pub fn new(backend: B, config: MapConfig) -> Self {
        let adapter = LayerRenderAdapter::new(backend.layer_tile_template());
        let recorder = ViewStateRecorder::new(config.save_debounce);
        Self {
            backend,
            config,
            phase: SessionPhase::Unknown,
            epoch: 0,
            surface: None,
            layers: LayerModel::new(),
            adapter,
            recorder,
            measure: MeasurementSession::new(),
            selected_layer: None,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn stage(&self) -> Option<SurfaceStage> {
        match &self.phase {
            SessionPhase::Authenticated { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.phase, SessionPhase::Authenticated { .. })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.phase {
            SessionPhase::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn layers(&self) -> &LayerModel {
        &self.layers
    }

    pub fn measurement(&self) -> &MeasurementSession {
        &self.measure
    }

    pub fn selected_layer(&self) -> Option<LayerId> {
        self.selected_layer
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn surface(&self) -> Option<&dyn RenderSurface> {
        self.surface.as_deref()
    }

    fn set_stage(&mut self, next: SurfaceStage) {
        if let SessionPhase::Authenticated { stage, .. } = &mut self.phase {
            *stage = next;
        }
    }

    fn enter_authenticated(&mut self, identity: Identity) {
        self.epoch += 1;
        log::debug!("session epoch {} for user {}", self.epoch, identity.id);
        self.phase = SessionPhase::Authenticated {
            identity,
            stage: SurfaceStage::Absent,
        };
    }

    /// Resolves the stored session once at startup. Unauthenticated is a
    /// normal outcome; transport failures surface to the caller.
    pub async fn start(&mut self) -> Result<()> {
        if self.phase != SessionPhase::Unknown {
            return Ok(());
        }
        match self.backend.resolve_identity().await? {
            Some(identity) => self.enter_authenticated(identity),
            None => self.phase = SessionPhase::Unauthenticated,
        }
        Ok(())
    }

    /// Fresh login. Rejected credentials propagate as
    /// `Error::CredentialsRejected` and leave the session state untouched.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        if self.is_authenticated() {
            return Ok(());
        }
        self.backend.login(email, password).await?;
        let identity = self
            .backend
            .resolve_identity()
            .await?
            .ok_or(Error::Unauthorized)?;
        self.enter_authenticated(identity);
        Ok(())
    }

    /// Asks the host to mount the rendering surface. Issued exactly once per
    /// authenticated session: while a mount is pending (or done) this
    /// returns None, which is what guards against duplicate surface creation
    /// on re-render.
    pub fn mount_request(&mut self) -> Option<MountDirective> {
        let epoch = self.epoch;
        let bearer = self.backend.bearer_token();
        let SessionPhase::Authenticated { identity, stage } = &mut self.phase else {
            return None;
        };
        if *stage != SurfaceStage::Absent {
            return None;
        }
        *stage = SurfaceStage::Mounting;

        let camera = identity
            .map_state
            .as_ref()
            .and_then(|s| s.camera())
            .unwrap_or(self.config.default_camera);

        Some(MountDirective {
            epoch,
            style: self.config.base_style.clone(),
            camera,
            bearer,
        })
    }

    /// Hands over the mounted surface. Stale epochs are discarded, which
    /// keeps a slow mount from a previous identity out of this session.
    pub fn attach_surface(&mut self, epoch: u64, surface: Box<dyn RenderSurface>) {
        if epoch != self.epoch {
            log::debug!("discarding surface from stale epoch {}", epoch);
            return;
        }
        if self.stage() != Some(SurfaceStage::Mounting) {
            log::debug!("unexpected surface attach outside mounting stage");
            return;
        }
        self.surface = Some(surface);
    }

    /// Style-loaded signal: hydrate. Fetches the layer catalogue (once per
    /// session), applies the persisted camera (a bounds fit wins over an
    /// explicit pose) and the persisted layer snapshot. A catalogue fetch
    /// failure reverts to Mounting and surfaces the error; the host's next
    /// natural re-render may call this again.
    pub async fn handle_style_loaded(&mut self, epoch: u64) -> Result<()> {
        if epoch != self.epoch {
            return Ok(());
        }
        if self.stage() != Some(SurfaceStage::Mounting) {
            return Ok(());
        }
        if self.surface.is_none() {
            return Err(Error::Session(
                "style loaded with no surface attached".to_string(),
            ));
        }

        self.set_stage(SurfaceStage::Hydrating);
        log::debug!("hydrating session {}", self.epoch);

        let descriptors = match self.backend.list_layers().await {
            Ok(d) => d,
            Err(e) => {
                if epoch == self.epoch {
                    self.set_stage(SurfaceStage::Mounting);
                }
                return Err(e);
            }
        };
        if epoch != self.epoch {
            // The session changed underneath the fetch; this catalogue
            // belongs to a dead identity.
            return Ok(());
        }

        self.layers.seed(descriptors);

        let persisted = self
            .identity()
            .and_then(|i| i.map_state.clone())
            .unwrap_or_default();

        let Some(surface) = self.surface.as_deref_mut() else {
            return Err(Error::Session("surface lost during hydration".to_string()));
        };

        if let Some(bounds) = &persisted.bounds {
            surface.fit_bounds(bounds);
        } else if let Some(camera) = persisted.camera() {
            surface.jump_to(&camera);
        }

        self.measure.install(surface)?;
        self.layers.hydrate(&persisted.layers, &self.adapter, surface)?;
        Ok(())
    }

    /// Render-idle signal after hydration: the session is now interactive.
    /// Primes the recorder with the hydrated state and lifts its suspension,
    /// so the first user change persists a complete snapshot and nothing
    /// that happened during hydration is re-saved.
    pub fn handle_render_idle(&mut self, epoch: u64) {
        if epoch != self.epoch {
            return;
        }
        if self.stage() != Some(SurfaceStage::Hydrating) {
            return;
        }
        self.set_stage(SurfaceStage::Ready);

        let camera = self
            .identity()
            .and_then(|i| i.map_state.as_ref())
            .and_then(|s| s.camera());
        self.recorder.prime(camera, self.layers.snapshot());
        self.recorder.resume();
        log::debug!("session {} ready", self.epoch);
    }

    /// End of a pan/rotate/pitch gesture. The recorder ignores this while
    /// suspended, which is exactly the hydration guard.
    pub fn handle_camera_settled(&mut self, epoch: u64, pose: CameraPose, now: Instant) {
        if epoch != self.epoch {
            return;
        }
        if !self.is_authenticated() {
            return;
        }
        self.recorder.note_camera_settled(pose, now);
    }

    /// User toggled a layer's enabled flag. No-op before the style is ready
    /// and for unknown ids; committed changes feed the recorder.
    pub fn toggle_layer_enabled(&mut self, id: LayerId, now: Instant) -> Result<()> {
        if !matches!(
            self.stage(),
            Some(SurfaceStage::Hydrating | SurfaceStage::Ready)
        ) {
            return Ok(());
        }
        let Some(surface) = self.surface.as_deref_mut() else {
            return Ok(());
        };
        let changed = self.layers.toggle_enabled(id, &self.adapter, surface)?;
        if changed {
            self.recorder.note_layers_changed(self.layers.snapshot(), now);
        }
        Ok(())
    }

    /// User toggled a layer's visible flag; only meaningful while enabled
    pub fn toggle_layer_visible(&mut self, id: LayerId, now: Instant) -> Result<()> {
        if !matches!(
            self.stage(),
            Some(SurfaceStage::Hydrating | SurfaceStage::Ready)
        ) {
            return Ok(());
        }
        let Some(surface) = self.surface.as_deref_mut() else {
            return Ok(());
        };
        let changed = self.layers.toggle_visible(id, &self.adapter, surface)?;
        if changed {
            self.recorder.note_layers_changed(self.layers.snapshot(), now);
        }
        Ok(())
    }

    /// Marks a layer as the target for attribute inspection clicks
    pub fn select_layer(&mut self, id: Option<LayerId>) {
        self.selected_layer = id.filter(|i| self.layers.is_known(*i));
    }

    /// A click on the map. While a measurement tool is capturing, the click
    /// adds a vertex; otherwise, with a layer selected, it queries that
    /// layer's rendered features for inspection.
    pub fn handle_map_click(
        &mut self,
        epoch: u64,
        location: LatLng,
        screen: Point,
    ) -> Result<Vec<QueriedFeature>> {
        if epoch != self.epoch {
            return Ok(Vec::new());
        }
        if self.stage() != Some(SurfaceStage::Ready) {
            return Ok(Vec::new());
        }
        let Some(surface) = self.surface.as_deref_mut() else {
            return Ok(Vec::new());
        };

        if self.measure.is_capturing() {
            self.measure.add_point(location, surface)?;
            return Ok(Vec::new());
        }

        if let Some(id) = self.selected_layer {
            let primitives = LayerRenderAdapter::primitive_ids(id);
            return Ok(surface.query_features(screen, &primitives));
        }
        Ok(Vec::new())
    }

    /// Arms a measurement tool; always a hard reset of any prior drawing
    pub fn set_measure_tool(&mut self, mode: MeasureMode) -> Result<()> {
        if self.stage() != Some(SurfaceStage::Ready) {
            return Ok(());
        }
        let Some(surface) = self.surface.as_deref_mut() else {
            return Ok(());
        };
        self.measure.start(mode, surface)
    }

    pub fn finish_measurement(&mut self) -> Result<()> {
        let Some(surface) = self.surface.as_deref_mut() else {
            return Ok(());
        };
        self.measure.finish(surface)
    }

    pub fn clear_measurement(&mut self) -> Result<()> {
        let Some(surface) = self.surface.as_deref_mut() else {
            return Ok(());
        };
        self.measure.clear(surface)
    }

    /// Pumps the debounce. When a quiet period has elapsed, submits the
    /// assembled snapshot. Persistence failures are logged and swallowed:
    /// losing the most recent autosave is acceptable, crashing is not.
    pub async fn tick(&mut self, now: Instant) {
        let Some(view) = self.recorder.tick(now) else {
            return;
        };
        if !self.is_authenticated() {
            return;
        }
        log::debug!("persisting view state");
        if let Err(e) = self.backend.persist_view_state(&view).await {
            log::warn!("view state save failed: {}", e);
        }
    }

    /// Explicit logout: best-effort backend call, then full teardown
    pub async fn logout(&mut self) {
        if !self.is_authenticated() {
            return;
        }
        if let Err(e) = self.backend.logout().await {
            log::warn!("backend logout failed: {}", e);
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        self.epoch += 1;
        self.surface = None;
        self.layers.reset();
        self.measure = MeasurementSession::new();
        self.recorder.reset();
        self.selected_layer = None;
        self.phase = SessionPhase::Unauthenticated;
        log::debug!("session torn down");
    }
}
