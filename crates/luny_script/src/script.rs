//! Script instances: one script attached to one object.
//!
//! A [`ScriptInstance`] maps host lifecycle notifications onto the runnables
//! registered for them and owns the object's [`CoroutineRunner`]. The host
//! calls one method per notification and passes its services in:
//!
//! 1. [`created`](ScriptInstance::created) once after the object exists.
//! 2. [`enable`](ScriptInstance::enable) / [`disable`](ScriptInstance::disable)
//!    as the object toggles. The first enable also runs the `Ready` runnables.
//! 3. [`heartbeat`](ScriptInstance::heartbeat) per fixed step and
//!    [`frame_update`](ScriptInstance::frame_update) per frame while enabled.
//! 4. [`destroy`](ScriptInstance::destroy) once, which also tears down every
//!    coroutine.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::config::ScriptConfig;
use crate::context::ExecutionContext;
use crate::error::ScriptError;
use crate::object::ObjectHandle;
use crate::runnable::Runnable;
use crate::scheduler::CoroutineRunner;
use crate::services::{SceneService, TimeService};
use crate::trace::{DebugHook, ExecutionTrace, TraceBuffer};
use crate::variables::Variables;

/// Host notifications a script can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The object was created.
    Created,
    /// The object was enabled for the first time.
    Ready,
    /// The object was enabled.
    Enabled,
    /// The object was disabled.
    Disabled,
    /// The object is being destroyed.
    Destroyed,
    /// A fixed-step heartbeat.
    Heartbeat,
    /// A rendered frame, before coroutines.
    FrameUpdate,
    /// A rendered frame, after coroutines.
    LateFrameUpdate,
    /// A scene finished loading.
    SceneLoaded,
    /// A scene is about to unload.
    SceneUnloaded,
}

/// A script bound to one object.
pub struct ScriptInstance {
    id: Uuid,
    object: ObjectHandle,
    config: ScriptConfig,
    handlers: HashMap<LifecycleEvent, Vec<Runnable>>,
    coroutines: CoroutineRunner,
    variables: Variables,
    hook: Option<Box<dyn DebugHook>>,
    traces: Option<TraceBuffer>,
    enabled: bool,
    ready: bool,
    destroyed: bool,
}

impl ScriptInstance {
    /// Create a disabled script for `object`.
    #[must_use]
    pub fn new(object: ObjectHandle, config: ScriptConfig) -> Self {
        let traces = config
            .trace_enabled
            .then(|| TraceBuffer::new(config.trace_capacity));
        Self {
            id: Uuid::new_v4(),
            object,
            config,
            handlers: HashMap::new(),
            coroutines: CoroutineRunner::new(),
            variables: Variables::new(),
            hook: None,
            traces,
            enabled: false,
            ready: false,
            destroyed: false,
        }
    }

    /// Route traces to `hook` instead of the built-in buffer.
    #[must_use]
    pub fn with_hook(mut self, hook: Box<dyn DebugHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Unique identity of this instance.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The object this script is attached to.
    #[must_use]
    pub fn object(&self) -> ObjectHandle {
        self.object
    }

    /// The configuration the script was built with.
    #[must_use]
    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// Run `runnable` on every `event`, after those registered earlier.
    pub fn on(&mut self, event: LifecycleEvent, runnable: Runnable) -> &mut Self {
        self.handlers.entry(event).or_default().push(runnable);
        self
    }

    /// Number of runnables registered for `event`.
    #[must_use]
    pub fn handler_count(&self, event: LifecycleEvent) -> usize {
        self.handlers.get(&event).map_or(0, Vec::len)
    }

    /// The script's coroutines.
    #[must_use]
    pub fn coroutines(&self) -> &CoroutineRunner {
        &self.coroutines
    }

    /// The script's coroutines, for registration and control.
    pub fn coroutines_mut(&mut self) -> &mut CoroutineRunner {
        &mut self.coroutines
    }

    /// The script's variables.
    #[must_use]
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// The script's variables, for seeding before the first callback.
    pub fn variables_mut(&mut self) -> &mut Variables {
        &mut self.variables
    }

    /// Whether ticks currently reach this script.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.destroyed
    }

    /// Whether [`destroy`](Self::destroy) has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Remove and return the buffered traces. Empty unless tracing is enabled.
    pub fn take_traces(&mut self) -> Vec<ExecutionTrace> {
        self.traces.as_mut().map(TraceBuffer::drain).unwrap_or_default()
    }

    /// The object was created.
    ///
    /// # Errors
    ///
    /// Propagates the first block error.
    pub fn created(
        &mut self,
        time: &dyn TimeService,
        scene: &dyn SceneService,
    ) -> Result<(), ScriptError> {
        self.dispatch(LifecycleEvent::Created, time, scene)
    }

    /// Enable the object. The first call also runs the `Ready` runnables.
    ///
    /// # Errors
    ///
    /// Propagates the first block error.
    pub fn enable(
        &mut self,
        time: &dyn TimeService,
        scene: &dyn SceneService,
    ) -> Result<(), ScriptError> {
        if self.destroyed || self.enabled {
            return Ok(());
        }
        self.enabled = true;
        debug!(object = %self.object, instance = %self.id, "script enabled");
        self.dispatch(LifecycleEvent::Enabled, time, scene)?;
        if !self.ready {
            self.ready = true;
            self.dispatch(LifecycleEvent::Ready, time, scene)?;
        }
        Ok(())
    }

    /// Disable the object. Ticks are ignored until it is enabled again.
    ///
    /// # Errors
    ///
    /// Propagates the first block error.
    pub fn disable(
        &mut self,
        time: &dyn TimeService,
        scene: &dyn SceneService,
    ) -> Result<(), ScriptError> {
        if self.destroyed || !self.enabled {
            return Ok(());
        }
        self.enabled = false;
        debug!(object = %self.object, instance = %self.id, "script disabled");
        self.dispatch(LifecycleEvent::Disabled, time, scene)
    }

    /// One fixed-step heartbeat: `Heartbeat` runnables, then coroutines.
    ///
    /// # Errors
    ///
    /// Propagates the first block error.
    pub fn heartbeat(
        &mut self,
        time: &dyn TimeService,
        scene: &dyn SceneService,
    ) -> Result<(), ScriptError> {
        if !self.is_enabled() {
            return Ok(());
        }
        let mut ctx = context(
            self.object,
            time,
            scene,
            &mut self.variables,
            &mut self.hook,
            &mut self.traces,
        );
        run_handlers(&self.handlers, LifecycleEvent::Heartbeat, &mut ctx)?;
        self.coroutines.on_heartbeat(&mut ctx)
    }

    /// One frame: `FrameUpdate` runnables, coroutines, then
    /// `LateFrameUpdate` runnables.
    ///
    /// # Errors
    ///
    /// Propagates the first block error.
    pub fn frame_update(
        &mut self,
        time: &dyn TimeService,
        scene: &dyn SceneService,
    ) -> Result<(), ScriptError> {
        if !self.is_enabled() {
            return Ok(());
        }
        let mut ctx = context(
            self.object,
            time,
            scene,
            &mut self.variables,
            &mut self.hook,
            &mut self.traces,
        );
        run_handlers(&self.handlers, LifecycleEvent::FrameUpdate, &mut ctx)?;
        self.coroutines.on_frame_update(&mut ctx)?;
        run_handlers(&self.handlers, LifecycleEvent::LateFrameUpdate, &mut ctx)
    }

    /// A scene finished loading.
    ///
    /// # Errors
    ///
    /// Propagates the first block error.
    pub fn scene_loaded(
        &mut self,
        time: &dyn TimeService,
        scene: &dyn SceneService,
    ) -> Result<(), ScriptError> {
        self.dispatch(LifecycleEvent::SceneLoaded, time, scene)
    }

    /// A scene is about to unload.
    ///
    /// # Errors
    ///
    /// Propagates the first block error.
    pub fn scene_unloaded(
        &mut self,
        time: &dyn TimeService,
        scene: &dyn SceneService,
    ) -> Result<(), ScriptError> {
        self.dispatch(LifecycleEvent::SceneUnloaded, time, scene)
    }

    /// Destroy the object.
    ///
    /// Runs `Disabled` (if enabled) and `Destroyed` runnables, then tears down
    /// every coroutine. Each stage runs even if an earlier one failed. Later
    /// calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any stage.
    pub fn destroy(
        &mut self,
        time: &dyn TimeService,
        scene: &dyn SceneService,
    ) -> Result<(), ScriptError> {
        if self.destroyed {
            return Ok(());
        }
        let was_enabled = self.enabled;
        self.enabled = false;
        self.destroyed = true;
        debug!(object = %self.object, instance = %self.id, "script destroyed");

        let mut ctx = context(
            self.object,
            time,
            scene,
            &mut self.variables,
            &mut self.hook,
            &mut self.traces,
        );
        let disabled = if was_enabled {
            run_handlers(&self.handlers, LifecycleEvent::Disabled, &mut ctx)
        } else {
            Ok(())
        };
        let destroyed = run_handlers(&self.handlers, LifecycleEvent::Destroyed, &mut ctx);
        let teardown = self.coroutines.on_object_destroyed(&mut ctx);
        disabled.and(destroyed).and(teardown)
    }

    fn dispatch(
        &mut self,
        event: LifecycleEvent,
        time: &dyn TimeService,
        scene: &dyn SceneService,
    ) -> Result<(), ScriptError> {
        if self.destroyed {
            return Ok(());
        }
        let mut ctx = context(
            self.object,
            time,
            scene,
            &mut self.variables,
            &mut self.hook,
            &mut self.traces,
        );
        run_handlers(&self.handlers, event, &mut ctx)
    }
}

impl std::fmt::Debug for ScriptInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptInstance")
            .field("id", &self.id)
            .field("object", &self.object)
            .field("coroutines", &self.coroutines.len())
            .field("enabled", &self.enabled)
            .field("ready", &self.ready)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

fn context<'a>(
    object: ObjectHandle,
    time: &'a dyn TimeService,
    scene: &'a dyn SceneService,
    variables: &'a mut Variables,
    hook: &'a mut Option<Box<dyn DebugHook>>,
    traces: &'a mut Option<TraceBuffer>,
) -> ExecutionContext<'a> {
    let mut ctx =
        ExecutionContext::new(object, time, scene, variables).with_elapsed(time.elapsed_seconds());
    ctx.hook = match (hook, traces) {
        (Some(hook), _) => Some(&mut **hook as &mut dyn DebugHook),
        (None, Some(traces)) => Some(traces as &mut dyn DebugHook),
        (None, None) => None,
    };
    ctx
}

fn run_handlers(
    handlers: &HashMap<LifecycleEvent, Vec<Runnable>>,
    event: LifecycleEvent,
    ctx: &mut ExecutionContext<'_>,
) -> Result<(), ScriptError> {
    handlers
        .get(&event)
        .into_iter()
        .flatten()
        .try_for_each(|runnable| runnable.execute(ctx))
}
