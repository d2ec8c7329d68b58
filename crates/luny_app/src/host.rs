//! Host tick loop.
//!
//! Drives every scripted object the way an engine would:
//!
//! 1. Advance the frame clock by the frame delta.
//! 2. Step as many fixed heartbeats as the accumulated time allows.
//! 3. Run one frame update per object.
//! 4. Apply scene reloads requested during the frame.
//!
//! A script that fails is logged and disabled; the other objects keep ticking.

use std::time::{Duration, Instant};

use anyhow::ensure;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use luny_script::{
    ExecutionTrace, ManualClock, ObjectAllocator, ObjectHandle, ScriptConfig, ScriptError,
    ScriptInstance, StaticScene,
};

/// Configuration for the host loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Fixed heartbeats per second.
    pub heartbeat_rate: f64,
    /// Target frames per second.
    pub frame_rate: f64,
    /// Number of frames to run (0 = unlimited).
    pub max_frames: u64,
    /// Sleep between frames to hold the frame rate.
    pub realtime: bool,
    /// Name reported by the scene service.
    pub scene: String,
    /// Configuration handed to every script.
    pub script: ScriptConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            heartbeat_rate: 50.0,
            frame_rate: 60.0,
            max_frames: 300,
            realtime: false,
            scene: "Main".to_string(),
            script: ScriptConfig::default(),
        }
    }
}

impl HostConfig {
    /// Reject rates the loop cannot run with.
    ///
    /// # Errors
    ///
    /// Fails unless both rates are finite and positive.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.heartbeat_rate.is_finite() && self.heartbeat_rate > 0.0,
            "heartbeat_rate must be a positive number of Hz, got {}",
            self.heartbeat_rate
        );
        ensure!(
            self.frame_rate.is_finite() && self.frame_rate > 0.0,
            "frame_rate must be a positive number of Hz, got {}",
            self.frame_rate
        );
        Ok(())
    }
}

/// The host's objects, clocks and scene.
#[derive(Debug)]
pub struct Host {
    config: HostConfig,
    clock: ManualClock,
    scene: StaticScene,
    allocator: ObjectAllocator,
    /// Live scripts, in spawn order.
    scripts: IndexMap<ObjectHandle, ScriptInstance>,
    /// Frame time not yet consumed by heartbeats.
    heartbeat_debt: f64,
    /// Number of script failures isolated so far.
    failures: u64,
}

impl Host {
    /// Create a host with no objects.
    ///
    /// # Errors
    ///
    /// Returns the [`HostConfig::validate`] error for unusable rates.
    pub fn new(config: HostConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let scene = StaticScene::new(config.scene.clone());
        Ok(Self {
            config,
            clock: ManualClock::new(),
            scene,
            allocator: ObjectAllocator::new(),
            scripts: IndexMap::new(),
            heartbeat_debt: 0.0,
            failures: 0,
        })
    }

    /// The host clock.
    #[must_use]
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Number of script failures isolated so far.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Look up a live script.
    #[cfg_attr(not(test), allow(dead_code))]
    #[must_use]
    pub fn script(&self, object: ObjectHandle) -> Option<&ScriptInstance> {
        self.scripts.get(&object)
    }

    /// Number of live objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.scripts.len()
    }

    /// Create an object, let `build` attach its script, then run the
    /// created and enable notifications.
    ///
    /// # Errors
    ///
    /// Returns a construction error from `build`; the object is not kept.
    pub fn spawn<F>(&mut self, build: F) -> Result<ObjectHandle, ScriptError>
    where
        F: FnOnce(&mut ScriptInstance) -> Result<(), ScriptError>,
    {
        let object = self.allocator.allocate();
        let mut script = ScriptInstance::new(object, self.config.script.clone());
        if let Err(err) = build(&mut script) {
            self.allocator.release(object);
            return Err(err);
        }

        let started = script
            .created(&self.clock, &self.scene)
            .and_then(|()| script.enable(&self.clock, &self.scene));
        isolate(&mut script, started, &mut self.failures, &self.clock, &self.scene);

        info!(%object, instance = %script.id(), "spawned object");
        self.scripts.insert(object, script);
        Ok(object)
    }

    /// Destroy an object and drop its script.
    ///
    /// Returns `false` if the object does not exist.
    pub fn despawn(&mut self, object: ObjectHandle) -> bool {
        let Some(mut script) = self.scripts.shift_remove(&object) else {
            return false;
        };
        if let Err(err) = script.destroy(&self.clock, &self.scene) {
            self.failures += 1;
            error!(%object, %err, "script failed during destroy");
        }
        self.allocator.release(object);
        info!(%object, live = self.allocator.live(), "despawned object");
        true
    }

    /// Run one frame of `dt` seconds.
    pub fn frame(&mut self, dt: f64) {
        self.clock.advance_frame(dt);
        self.heartbeat_debt += dt;

        let step = 1.0 / self.config.heartbeat_rate;
        while self.heartbeat_debt >= step {
            self.heartbeat_debt -= step;
            self.clock.advance_heartbeat();
            for script in self.scripts.values_mut() {
                let result = script.heartbeat(&self.clock, &self.scene);
                isolate(script, result, &mut self.failures, &self.clock, &self.scene);
            }
        }

        for script in self.scripts.values_mut() {
            let result = script.frame_update(&self.clock, &self.scene);
            isolate(script, result, &mut self.failures, &self.clock, &self.scene);
        }

        if self.scene.take_reloads() > 0 {
            self.reload_scene();
        }
    }

    /// Notify every object that the scene reloads.
    fn reload_scene(&mut self) {
        info!(scene = %self.config.scene, frame = self.clock.frame, "reloading scene");
        for script in self.scripts.values_mut() {
            let result = script
                .scene_unloaded(&self.clock, &self.scene)
                .and_then(|()| script.scene_loaded(&self.clock, &self.scene));
            isolate(script, result, &mut self.failures, &self.clock, &self.scene);
        }
    }

    /// Run the loop for the configured number of frames, or indefinitely.
    pub fn run(&mut self) {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        let dt = frame_duration.as_secs_f64();

        info!(
            frame_rate = self.config.frame_rate,
            heartbeat_rate = self.config.heartbeat_rate,
            max_frames = self.config.max_frames,
            objects = self.scripts.len(),
            "starting host loop"
        );

        let mut frames = 0u64;
        loop {
            let start = Instant::now();
            self.frame(dt);

            frames += 1;
            if self.config.max_frames > 0 && frames >= self.config.max_frames {
                info!(
                    frames,
                    heartbeats = self.clock.heartbeat,
                    failures = self.failures,
                    "host loop complete"
                );
                break;
            }

            if self.config.realtime {
                let elapsed = start.elapsed();
                if elapsed < frame_duration {
                    std::thread::sleep(frame_duration - elapsed);
                } else {
                    warn!(
                        frame = self.clock.frame,
                        elapsed_ms = elapsed.as_millis() as u64,
                        budget_ms = frame_duration.as_millis() as u64,
                        "frame exceeded time budget"
                    );
                }
            }
        }
    }

    /// Destroy every object, in spawn order.
    pub fn shutdown(&mut self) {
        let objects: Vec<ObjectHandle> = self.scripts.keys().copied().collect();
        for object in objects {
            self.despawn(object);
        }
    }

    /// Collect the buffered traces of every live script.
    pub fn take_traces(&mut self) -> Vec<ExecutionTrace> {
        self.scripts
            .values_mut()
            .flat_map(ScriptInstance::take_traces)
            .collect()
    }
}

/// Log a failed callback and disable the offending object.
fn isolate(
    script: &mut ScriptInstance,
    result: Result<(), ScriptError>,
    failures: &mut u64,
    clock: &ManualClock,
    scene: &StaticScene,
) {
    let Err(err) = result else {
        return;
    };
    *failures += 1;
    error!(object = %script.object(), %err, "script failed; disabling object");
    if let Err(err) = script.disable(clock, scene) {
        debug!(object = %script.object(), %err, "disable handlers failed too");
    }
}

#[cfg(test)]
mod tests {
    use luny_script::{CoroutineOptions, ExecutionContext, FnBlock, LifecycleEvent, Runnable};

    use super::*;

    fn config() -> HostConfig {
        HostConfig {
            heartbeat_rate: 4.0,
            frame_rate: 8.0,
            max_frames: 8,
            ..HostConfig::default()
        }
    }

    fn bump(name: &'static str) -> Runnable {
        Runnable::single(FnBlock::new("Bump", move |ctx: &mut ExecutionContext<'_>| {
            ctx.variables.increment(name, 1.0)?;
            Ok(())
        }))
    }

    #[test]
    fn test_fixed_step_heartbeats() {
        let mut host = Host::new(config()).unwrap();
        let object = host
            .spawn(|script| {
                script.on(LifecycleEvent::Heartbeat, bump("beats"));
                script.on(LifecycleEvent::FrameUpdate, bump("frames"));
                Ok(())
            })
            .unwrap();
        host.run();

        assert_eq!(host.clock().frame, 8);
        assert_eq!(host.clock().heartbeat, 4);
        let vars = host.script(object).unwrap().variables();
        assert_eq!(vars.get_number("beats"), Ok(4.0));
        assert_eq!(vars.get_number("frames"), Ok(8.0));
    }

    #[test]
    fn test_failing_object_is_disabled_others_continue() {
        let mut host = Host::new(config()).unwrap();
        let bad = host
            .spawn(|script| {
                script.on(
                    LifecycleEvent::FrameUpdate,
                    Runnable::single(FnBlock::new("Explode", |_: &mut ExecutionContext<'_>| {
                        Err(ScriptError::execution("Explode", "kaboom"))
                    })),
                );
                Ok(())
            })
            .unwrap();
        let good = host
            .spawn(|script| {
                script.on(LifecycleEvent::FrameUpdate, bump("frames"));
                Ok(())
            })
            .unwrap();

        host.run();
        assert_eq!(host.failures(), 1);
        assert!(!host.script(bad).unwrap().is_enabled());
        assert_eq!(
            host.script(good).unwrap().variables().get_number("frames"),
            Ok(8.0)
        );
    }

    #[test]
    fn test_construction_error_rejects_spawn() {
        let mut host = Host::new(config()).unwrap();
        let err = host
            .spawn(|script| {
                script
                    .coroutines_mut()
                    .register(CoroutineOptions::counter("c", 1))?;
                script
                    .coroutines_mut()
                    .register(CoroutineOptions::counter("c", 2))?;
                Ok(())
            })
            .unwrap_err();
        assert!(err.is_construction_error());
        assert_eq!(host.object_count(), 0);
        assert_eq!(host.allocator.live(), 0);
    }

    #[test]
    fn test_scene_reload_notifies_scripts() {
        let mut host = Host::new(config()).unwrap();
        let object = host
            .spawn(|script| {
                script.on(
                    LifecycleEvent::FrameUpdate,
                    Runnable::single(FnBlock::new("Reload", |ctx: &mut ExecutionContext<'_>| {
                        ctx.scene.request_reload();
                        Ok(())
                    })),
                );
                script.on(LifecycleEvent::SceneUnloaded, bump("unloaded"));
                script.on(LifecycleEvent::SceneLoaded, bump("loaded"));
                Ok(())
            })
            .unwrap();
        host.frame(0.125);
        let vars = host.script(object).unwrap().variables();
        assert_eq!(vars.get_number("unloaded"), Ok(1.0));
        assert_eq!(vars.get_number("loaded"), Ok(1.0));
    }

    #[test]
    fn test_despawn_runs_destroy() {
        let mut host = Host::new(config()).unwrap();
        let object = host
            .spawn(|script| {
                script.on(LifecycleEvent::Destroyed, bump("gone"));
                Ok(())
            })
            .unwrap();
        assert!(host.despawn(object));
        assert!(!host.despawn(object));
        assert_eq!(host.object_count(), 0);
        assert_eq!(host.allocator.live(), 0);
        assert_eq!(host.allocator.issued(), 1);
    }

    #[test]
    fn test_config_from_json_overrides_defaults() {
        let config: HostConfig =
            serde_json::from_str(r#"{ "frame_rate": 30, "script": { "trace_enabled": true } }"#)
                .unwrap();
        assert!((config.frame_rate - 30.0).abs() < f64::EPSILON);
        assert!((config.heartbeat_rate - 50.0).abs() < f64::EPSILON);
        assert!(config.script.trace_enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_rejects_unusable_rates() {
        for json in [
            r#"{ "heartbeat_rate": -1 }"#,
            r#"{ "heartbeat_rate": 0 }"#,
            r#"{ "frame_rate": 0 }"#,
            r#"{ "frame_rate": -30 }"#,
        ] {
            let config: HostConfig = serde_json::from_str(json).unwrap();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("must be a positive number"), "{json}: {err}");
            assert!(Host::new(config).is_err());
        }
    }
}
