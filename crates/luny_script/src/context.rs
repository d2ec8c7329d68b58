//! Per-call execution context passed to every block.

use crate::object::ObjectHandle;
use crate::services::{SceneService, TimeService};
use crate::trace::DebugHook;
use crate::variables::Variables;

/// Context handed by reference to each block on each call.
///
/// Built fresh by the host (or a [`ScriptInstance`](crate::ScriptInstance))
/// for every lifecycle callback or tick, and dropped when it returns.
pub struct ExecutionContext<'a> {
    /// The object the running script belongs to.
    pub object: ObjectHandle,
    /// Iteration index of the innermost running loop.
    pub loop_count: u64,
    /// Elapsed time made available to blocks, in seconds.
    pub elapsed: Option<f64>,
    /// Host clocks.
    pub time: &'a dyn TimeService,
    /// Host scene management.
    pub scene: &'a dyn SceneService,
    /// Variables of the running script.
    pub variables: &'a mut Variables,
    /// Receives one trace per executed block when present.
    pub hook: Option<&'a mut dyn DebugHook>,
    /// Set once the propagating error has been traced by the sequence it
    /// failed in.
    pub(crate) failure_traced: bool,
}

impl<'a> ExecutionContext<'a> {
    /// Create a context for one callback.
    #[must_use]
    pub fn new(
        object: ObjectHandle,
        time: &'a dyn TimeService,
        scene: &'a dyn SceneService,
        variables: &'a mut Variables,
    ) -> Self {
        Self {
            object,
            loop_count: 0,
            elapsed: None,
            time,
            scene,
            variables,
            hook: None,
            failure_traced: false,
        }
    }

    /// Set the elapsed-time value.
    #[must_use]
    pub fn with_elapsed(mut self, seconds: f64) -> Self {
        self.elapsed = Some(seconds);
        self
    }

    /// Attach a debug hook.
    #[must_use]
    pub fn with_hook(mut self, hook: &'a mut dyn DebugHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Current frame counter of the host.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.time.frame_count()
    }

    /// Current heartbeat counter of the host.
    #[must_use]
    pub fn heartbeat(&self) -> u64 {
        self.time.heartbeat_count()
    }

    /// Duration of the current frame, in seconds.
    #[must_use]
    pub fn delta_time(&self) -> f64 {
        self.time.delta_time()
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("object", &self.object)
            .field("loop_count", &self.loop_count)
            .field("elapsed", &self.elapsed)
            .field("frame", &self.time.frame_count())
            .field("heartbeat", &self.time.heartbeat_count())
            .field("hooked", &self.hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ManualClock, StaticScene};

    #[test]
    fn test_context_creation() {
        let mut clock = ManualClock::new();
        clock.advance_frame(0.016);
        let scene = StaticScene::new("main");
        let mut vars = Variables::new();
        let ctx = ExecutionContext::new(ObjectHandle::from_raw(3), &clock, &scene, &mut vars)
            .with_elapsed(0.016);
        assert_eq!(ctx.object.id(), 3);
        assert_eq!(ctx.loop_count, 0);
        assert_eq!(ctx.frame(), 1);
        assert_eq!(ctx.heartbeat(), 0);
        assert!((ctx.delta_time() - 0.016).abs() < f64::EPSILON);
        assert_eq!(ctx.elapsed, Some(0.016));
        assert!(ctx.hook.is_none());
    }

    #[test]
    fn test_blocks_see_variables_through_context() {
        let clock = ManualClock::new();
        let scene = StaticScene::new("main");
        let mut vars = Variables::new();
        {
            let mut ctx =
                ExecutionContext::new(ObjectHandle::from_raw(1), &clock, &scene, &mut vars);
            ctx.variables.set("touched", true);
        }
        assert_eq!(vars.get_bool("touched"), Ok(true));
    }
}
