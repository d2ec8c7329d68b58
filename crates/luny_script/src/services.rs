//! Host engine services consumed by scripts.
//!
//! The host injects these into every [`ExecutionContext`](crate::ExecutionContext)
//! instead of exposing them as globals, so tests can substitute fakes.

use std::cell::Cell;

/// Frame and heartbeat clocks of the host engine.
pub trait TimeService {
    /// Monotonic count of rendered frames.
    fn frame_count(&self) -> u64;

    /// Monotonic count of fixed-step heartbeats.
    fn heartbeat_count(&self) -> u64;

    /// Duration of the current frame, in seconds.
    fn delta_time(&self) -> f64;

    /// Time since the host started, in seconds.
    fn elapsed_seconds(&self) -> f64;
}

/// Scene management of the host engine.
pub trait SceneService {
    /// Name of the currently loaded scene.
    fn active_scene(&self) -> String;

    /// Ask the host to reload the active scene at the end of the tick.
    fn request_reload(&self);
}

/// A [`TimeService`] advanced explicitly by its owner.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    /// Frames rendered so far.
    pub frame: u64,
    /// Heartbeats stepped so far.
    pub heartbeat: u64,
    /// Delta time of the most recent frame.
    pub delta: f64,
    /// Accumulated frame time.
    pub elapsed: f64,
}

impl ManualClock {
    /// Create a clock at frame 0, heartbeat 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame lasting `dt` seconds.
    pub fn advance_frame(&mut self, dt: f64) {
        self.frame += 1;
        self.delta = dt;
        self.elapsed += dt;
    }

    /// Step the heartbeat counter once.
    pub fn advance_heartbeat(&mut self) {
        self.heartbeat += 1;
    }
}

impl TimeService for ManualClock {
    fn frame_count(&self) -> u64 {
        self.frame
    }

    fn heartbeat_count(&self) -> u64 {
        self.heartbeat
    }

    fn delta_time(&self) -> f64 {
        self.delta
    }

    fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }
}

/// A [`SceneService`] with a fixed scene name that records reload requests.
#[derive(Debug, Default)]
pub struct StaticScene {
    name: String,
    reloads: Cell<u32>,
}

impl StaticScene {
    /// Create a scene service reporting `name` as the active scene.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reloads: Cell::new(0),
        }
    }

    /// Number of reloads requested since the last [`take_reloads`](Self::take_reloads).
    #[must_use]
    pub fn pending_reloads(&self) -> u32 {
        self.reloads.get()
    }

    /// Returns and clears the pending reload count.
    pub fn take_reloads(&self) -> u32 {
        self.reloads.replace(0)
    }
}

impl SceneService for StaticScene {
    fn active_scene(&self) -> String {
        self.name.clone()
    }

    fn request_reload(&self) {
        self.reloads.set(self.reloads.get() + 1);
    }
}
