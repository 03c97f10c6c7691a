//! Debounced view-state persistence.
//!
//! The debounce window is explicit state (a deadline field restarted by each
//! qualifying event) rather than a timer callback, so ordering guarantees
//! are deterministic and teardown is a plain reset. The owning coordinator
//! pumps `tick(now)` and submits whatever snapshot falls out.

use crate::{
    layers::{descriptor::LayerId, model::LayerVisibility},
    prelude::HashMap,
    session::identity::{CameraPose, ViewState},
};
use instant::Instant;
use std::time::Duration;

pub struct ViewStateRecorder {
    window: Duration,
    /// Expiry of the current quiet period; None while nothing is pending
    deadline: Option<Instant>,
    /// Last settled camera pose, if any was observed this session
    camera: Option<CameraPose>,
    layers: HashMap<LayerId, LayerVisibility>,
    /// While suspended (startup, hydration) events are ignored entirely
    suspended: bool,
}

impl ViewStateRecorder {
    /// Starts suspended; the coordinator resumes it once hydration settles
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            camera: None,
            layers: HashMap::default(),
            suspended: true,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// True when a save is scheduled and waiting out its quiet period
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Ignore events and drop any pending save (hydration guard)
    pub fn suspend(&mut self) {
        self.suspended = true;
        self.deadline = None;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Seeds the hydrated state without scheduling a save, so the first
    /// user-driven change persists a complete snapshot.
    pub fn prime(
        &mut self,
        camera: Option<CameraPose>,
        layers: HashMap<LayerId, LayerVisibility>,
    ) {
        self.camera = camera;
        self.layers = layers;
    }

    /// A pan/rotate/pitch gesture ended
    pub fn note_camera_settled(&mut self, pose: CameraPose, now: Instant) {
        if self.suspended {
            return;
        }
        self.camera = Some(pose);
        self.restart(now);
    }

    /// The layer enabled/visible state changed
    pub fn note_layers_changed(
        &mut self,
        layers: HashMap<LayerId, LayerVisibility>,
        now: Instant,
    ) {
        if self.suspended {
            return;
        }
        self.layers = layers;
        self.restart(now);
    }

    fn restart(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// Emits at most one snapshot per quiet period: the state as of the last
    /// qualifying event before the window expired.
    pub fn tick(&mut self, now: Instant) -> Option<ViewState> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(self.assemble())
            }
            _ => None,
        }
    }

    fn assemble(&self) -> ViewState {
        ViewState {
            center: self.camera.map(|c| c.center),
            zoom: self.camera.map(|c| c.zoom),
            bearing: self.camera.map(|c| c.bearing),
            pitch: self.camera.map(|c| c.pitch),
            bounds: None,
            layers: self.layers.clone(),
        }
    }

    /// Back to the freshly-constructed, suspended state; used at teardown
    pub fn reset(&mut self) {
        *self = Self::new(self.window);
    }
}
