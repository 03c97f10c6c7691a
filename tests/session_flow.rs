//! End-to-end session tests: a mock backend plus the recording surface,
//! driven through the same event sequence a real host would produce.

use async_trait::async_trait;
use mapcore::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

const PASSWORD: &str = "hunter2";

struct MockBackend {
    /// Identity handed out by resolve_identity; set by a successful login
    identity: Mutex<Option<Identity>>,
    /// Identity installed when login succeeds
    login_identity: Identity,
    layers: Vec<LayerDescriptor>,
    saves: Arc<Mutex<Vec<ViewState>>>,
    fail_layer_list: AtomicBool,
    logout_count: Arc<Mutex<u32>>,
}

impl MockBackend {
    fn base_identity() -> Identity {
        Identity {
            id: 42,
            email: Some("user@example.org".to_string()),
            username: None,
            map_state: None,
        }
    }

    fn catalogue() -> Vec<LayerDescriptor> {
        vec![
            LayerDescriptor::new(1, "Forests"),
            LayerDescriptor::new(2, "Cadastre"),
        ]
    }

    /// Backend with a resumable session already in place
    fn authenticated(map_state: Option<ViewState>) -> Self {
        let identity = Identity {
            map_state,
            ..Self::base_identity()
        };
        Self {
            identity: Mutex::new(Some(identity.clone())),
            login_identity: identity,
            layers: Self::catalogue(),
            saves: Arc::new(Mutex::new(Vec::new())),
            fail_layer_list: AtomicBool::new(false),
            logout_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Backend with no session; login with PASSWORD establishes one
    fn anonymous() -> Self {
        Self {
            identity: Mutex::new(None),
            login_identity: Self::base_identity(),
            layers: Self::catalogue(),
            saves: Arc::new(Mutex::new(Vec::new())),
            fail_layer_list: AtomicBool::new(false),
            logout_count: Arc::new(Mutex::new(0)),
        }
    }

    fn saves_handle(&self) -> Arc<Mutex<Vec<ViewState>>> {
        self.saves.clone()
    }

    fn logout_handle(&self) -> Arc<Mutex<u32>> {
        self.logout_count.clone()
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn resolve_identity(&self) -> Result<Option<Identity>> {
        Ok(self.identity.lock().unwrap().clone())
    }

    async fn login(&self, _email: &str, password: &str) -> Result<()> {
        if password != PASSWORD {
            return Err(Error::CredentialsRejected("bad creds".to_string()));
        }
        *self.identity.lock().unwrap() = Some(self.login_identity.clone());
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        *self.logout_count.lock().unwrap() += 1;
        *self.identity.lock().unwrap() = None;
        Ok(())
    }

    async fn list_layers(&self) -> Result<Vec<LayerDescriptor>> {
        if self.fail_layer_list.load(Ordering::SeqCst) {
            return Err(Error::Backend("layer list unavailable".to_string()));
        }
        Ok(self.layers.clone())
    }

    async fn persist_view_state(&self, state: &ViewState) -> Result<()> {
        self.saves.lock().unwrap().push(state.clone());
        Ok(())
    }

    fn layer_tile_template(&self) -> String {
        "http://backend.test/tiles/layer/{layer}/{z}/{x}/{y}.mvt".to_string()
    }
}

fn persisted_state() -> ViewState {
    let mut layers = HashMap::default();
    layers.insert(
        1,
        LayerVisibility {
            enabled: true,
            visible: false,
        },
    );
    ViewState {
        center: Some(LatLng::new(46.2276, 2.2137)),
        zoom: Some(9.0),
        bearing: Some(0.0),
        pitch: Some(0.0),
        bounds: None,
        layers,
    }
}

/// Drives a fresh coordinator through resume, mount, hydrate, ready
async fn ready_session(backend: MockBackend) -> (SessionCoordinator<MockBackend>, u64) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut session = SessionCoordinator::new(backend, MapConfig::default());
    session.start().await.unwrap();
    let directive = session.mount_request().expect("mount directive");
    session.attach_surface(
        directive.epoch,
        Box::new(RecordingSurface::with_style(&directive.style)),
    );
    session.handle_style_loaded(directive.epoch).await.unwrap();
    session.handle_render_idle(directive.epoch);
    assert_eq!(session.stage(), Some(SurfaceStage::Ready));
    (session, directive.epoch)
}

fn recording<'a>(session: &'a SessionCoordinator<MockBackend>) -> &'a RecordingSurface {
    session
        .surface()
        .expect("surface attached")
        .as_any()
        .downcast_ref::<RecordingSurface>()
        .expect("recording surface")
}

#[tokio::test]
async fn resumed_session_hydrates_persisted_state() {
    let (session, _) = ready_session(MockBackend::authenticated(Some(persisted_state()))).await;

    let surface = recording(&session);
    assert!(surface.has_source("src-1"));
    assert_eq!(surface.is_visible("lyr-1-fill"), Some(false));
    assert!(!surface.has_source("src-2"));

    // Explicit pose applied, no bounds fit requested
    let jump = surface.last_jump().expect("camera applied");
    assert_eq!(jump.zoom, 9.0);
    assert_eq!(surface.last_fit(), None);

    assert_eq!(
        session.layers().state(1),
        LayerVisibility {
            enabled: true,
            visible: false
        }
    );
}

#[tokio::test]
async fn bounds_fit_takes_precedence_over_pose() {
    let state = ViewState {
        bounds: Some(LatLngBounds::from_coords(45.0, 1.0, 47.0, 3.0)),
        ..persisted_state()
    };
    let (session, _) = ready_session(MockBackend::authenticated(Some(state))).await;

    let surface = recording(&session);
    assert!(surface.last_fit().is_some());
    assert_eq!(surface.last_jump(), None);
}

#[tokio::test]
async fn mount_request_is_single_shot() {
    let backend = MockBackend::authenticated(None);
    let mut session = SessionCoordinator::new(backend, MapConfig::default());
    session.start().await.unwrap();

    assert!(session.mount_request().is_some());
    assert!(session.mount_request().is_none());
    assert_eq!(session.stage(), Some(SurfaceStage::Mounting));
}

#[tokio::test]
async fn unauthenticated_start_presents_login() {
    let backend = MockBackend::anonymous();
    let mut session = SessionCoordinator::new(backend, MapConfig::default());
    session.start().await.unwrap();

    assert_eq!(session.phase(), &SessionPhase::Unauthenticated);
    assert!(session.mount_request().is_none());
}

#[tokio::test]
async fn rejected_credentials_leave_state_untouched() {
    let backend = MockBackend::anonymous();
    let mut session = SessionCoordinator::new(backend, MapConfig::default());
    session.start().await.unwrap();

    let err = session.login("user@example.org", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::CredentialsRejected(_)));
    assert_eq!(session.phase(), &SessionPhase::Unauthenticated);

    session.login("user@example.org", PASSWORD).await.unwrap();
    assert!(session.is_authenticated());
    assert!(session.mount_request().is_some());
}

#[tokio::test]
async fn no_persistence_during_hydration() {
    let backend = MockBackend::authenticated(Some(persisted_state()));
    let saves = backend.saves_handle();

    let mut session = SessionCoordinator::new(backend, MapConfig::default());
    session.start().await.unwrap();
    let directive = session.mount_request().unwrap();
    session.attach_surface(
        directive.epoch,
        Box::new(RecordingSurface::with_style(&directive.style)),
    );
    session.handle_style_loaded(directive.epoch).await.unwrap();

    // Camera and layer events injected while still hydrating
    let t0 = Instant::now();
    session.handle_camera_settled(
        directive.epoch,
        CameraPose::new(LatLng::new(44.0, 3.0), 11.0),
        t0,
    );
    session.toggle_layer_enabled(2, t0).unwrap();
    session.tick(t0 + Duration::from_secs(30)).await;

    session.handle_render_idle(directive.epoch);
    session.tick(t0 + Duration::from_secs(60)).await;

    assert!(saves.lock().unwrap().is_empty());
}

#[tokio::test]
async fn burst_of_camera_settles_persists_once_with_last_state() {
    let backend = MockBackend::authenticated(None);
    let saves = backend.saves_handle();
    let (mut session, epoch) = ready_session(backend).await;

    let t0 = Instant::now();
    for (i, zoom) in [10.0, 11.0, 12.0].iter().enumerate() {
        session.handle_camera_settled(
            epoch,
            CameraPose::new(LatLng::new(46.0, 2.0), *zoom),
            t0 + Duration::from_millis(i as u64 * 100),
        );
    }

    // Quiet period not yet over relative to the last event
    session.tick(t0 + Duration::from_millis(1100)).await;
    assert!(saves.lock().unwrap().is_empty());

    session.tick(t0 + Duration::from_millis(1300)).await;
    {
        let saved = saves.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].zoom, Some(12.0));
    }

    // Nothing further without a new qualifying event
    session.tick(t0 + Duration::from_secs(10)).await;
    assert_eq!(saves.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn layer_toggles_persist_the_final_snapshot() {
    let backend = MockBackend::authenticated(None);
    let saves = backend.saves_handle();
    let (mut session, _) = ready_session(backend).await;

    let t0 = Instant::now();
    session.toggle_layer_enabled(1, t0).unwrap();
    session
        .toggle_layer_visible(1, t0 + Duration::from_millis(100))
        .unwrap();

    session.tick(t0 + Duration::from_secs(2)).await;

    let saved = saves.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(
        saved[0].layers.get(&1),
        Some(&LayerVisibility {
            enabled: true,
            visible: false
        })
    );
}

#[tokio::test]
async fn toggle_on_then_off_leaves_zero_primitives() {
    let (mut session, _) = ready_session(MockBackend::authenticated(None)).await;

    let t0 = Instant::now();
    session.toggle_layer_enabled(1, t0).unwrap();
    session.toggle_layer_enabled(1, t0).unwrap();

    let surface = recording(&session);
    assert!(!surface.has_source("src-1"));
    for id in LayerRenderAdapter::primitive_ids(1) {
        assert!(!surface.has_layer_primitive(&id));
    }
}

#[tokio::test]
async fn unknown_layer_toggle_schedules_no_save() {
    let backend = MockBackend::authenticated(None);
    let saves = backend.saves_handle();
    let (mut session, _) = ready_session(backend).await;

    let t0 = Instant::now();
    session.toggle_layer_enabled(99, t0).unwrap();
    session.toggle_layer_visible(99, t0).unwrap();
    session.tick(t0 + Duration::from_secs(5)).await;

    assert!(saves.lock().unwrap().is_empty());
}

#[tokio::test]
async fn measurement_clicks_and_reset_semantics() {
    let (mut session, epoch) = ready_session(MockBackend::authenticated(None)).await;

    session.set_measure_tool(MeasureMode::Area).unwrap();
    for p in [
        LatLng::new(0.0, 0.0),
        LatLng::new(0.01, 0.0),
        LatLng::new(0.01, 0.01),
        LatLng::new(0.0, 0.01),
    ] {
        session
            .handle_map_click(epoch, p, Point::new(0.0, 0.0))
            .unwrap();
    }
    assert_eq!(session.measurement().points().len(), 4);
    assert!(session.measurement().current_area() > 1.0e6);

    // Switching tools is a hard reset, never additive
    session.set_measure_tool(MeasureMode::Length).unwrap();
    assert_eq!(session.measurement().points().len(), 0);

    session
        .handle_map_click(epoch, LatLng::new(48.0, 2.0), Point::new(0.0, 0.0))
        .unwrap();
    session
        .handle_map_click(epoch, LatLng::new(48.1, 2.0), Point::new(0.0, 0.0))
        .unwrap();
    let length = session.measurement().current_length();
    assert!((length - 11_119.0).abs() / 11_119.0 < 0.01);

    session.finish_measurement().unwrap();
    session
        .handle_map_click(epoch, LatLng::new(48.2, 2.0), Point::new(0.0, 0.0))
        .unwrap();
    assert_eq!(session.measurement().points().len(), 2);
}

#[tokio::test]
async fn click_inspects_selected_layer_when_not_measuring() {
    let backend = MockBackend::authenticated(None);
    let mut session = SessionCoordinator::new(backend, MapConfig::default());
    session.start().await.unwrap();
    let directive = session.mount_request().unwrap();

    let mut surface = RecordingSurface::with_style(&directive.style);
    let mut props = serde_json::Map::new();
    props.insert("species".to_string(), serde_json::json!("oak"));
    surface.stage_feature("lyr-1-fill", props);

    session.attach_surface(directive.epoch, Box::new(surface));
    session.handle_style_loaded(directive.epoch).await.unwrap();
    session.handle_render_idle(directive.epoch);

    let t0 = Instant::now();
    session.toggle_layer_enabled(1, t0).unwrap();
    session.select_layer(Some(1));

    let hits = session
        .handle_map_click(directive.epoch, LatLng::new(46.0, 2.0), Point::new(5.0, 5.0))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].properties["species"], serde_json::json!("oak"));

    // Selecting an unknown layer clears the selection
    session.select_layer(Some(99));
    assert_eq!(session.selected_layer(), None);
}

#[tokio::test]
async fn layer_list_failure_surfaces_and_allows_retry() {
    let backend = MockBackend::authenticated(None);
    backend.fail_layer_list.store(true, Ordering::SeqCst);

    let mut session = SessionCoordinator::new(backend, MapConfig::default());
    session.start().await.unwrap();
    let directive = session.mount_request().unwrap();
    session.attach_surface(
        directive.epoch,
        Box::new(RecordingSurface::with_style(&directive.style)),
    );

    let err = session.handle_style_loaded(directive.epoch).await.unwrap_err();
    assert!(matches!(err, Error::Backend(_)));
    assert_eq!(session.stage(), Some(SurfaceStage::Mounting));

    session
        .backend()
        .fail_layer_list
        .store(false, Ordering::SeqCst);
    session.handle_style_loaded(directive.epoch).await.unwrap();
    assert_eq!(session.stage(), Some(SurfaceStage::Hydrating));
}

#[tokio::test]
async fn logout_tears_down_and_cancels_pending_save() {
    let backend = MockBackend::authenticated(None);
    let saves = backend.saves_handle();
    let logouts = backend.logout_handle();
    let (mut session, epoch) = ready_session(backend).await;

    let t0 = Instant::now();
    session.toggle_layer_enabled(1, t0).unwrap();

    session.logout().await;
    assert_eq!(session.phase(), &SessionPhase::Unauthenticated);
    assert!(session.surface().is_none());
    assert_eq!(*logouts.lock().unwrap(), 1);

    // The pending debounce died with the session
    session.tick(t0 + Duration::from_secs(30)).await;
    assert!(saves.lock().unwrap().is_empty());

    // Events from the dead surface are discarded by their stale epoch
    session.handle_camera_settled(epoch, CameraPose::default(), t0);
    session.handle_render_idle(epoch);
    session.handle_style_loaded(epoch).await.unwrap();
    assert_eq!(session.phase(), &SessionPhase::Unauthenticated);
}

#[tokio::test]
async fn relogin_starts_a_fresh_epoch_and_session() {
    let (mut session, first_epoch) = ready_session(MockBackend::authenticated(None)).await;
    session.logout().await;

    session.login("user@example.org", PASSWORD).await.unwrap();
    let directive = session.mount_request().expect("new mount after relogin");
    assert!(directive.epoch > first_epoch);

    session.attach_surface(
        directive.epoch,
        Box::new(RecordingSurface::with_style(&directive.style)),
    );
    session.handle_style_loaded(directive.epoch).await.unwrap();
    session.handle_render_idle(directive.epoch);
    assert_eq!(session.stage(), Some(SurfaceStage::Ready));
}

#[tokio::test]
async fn stale_surface_attach_is_discarded() {
    let backend = MockBackend::authenticated(None);
    let mut session = SessionCoordinator::new(backend, MapConfig::default());
    session.start().await.unwrap();
    let directive = session.mount_request().unwrap();

    session.attach_surface(
        directive.epoch + 1,
        Box::new(RecordingSurface::with_style(&directive.style)),
    );
    assert!(session.surface().is_none());
}
