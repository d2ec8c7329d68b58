//! Demo blocks and scripts.
//!
//! The blocks here are the engine-facing side of a script: they log, touch
//! variables, ask for scene reloads or fail on purpose. The scripts combine
//! them with lifecycle handlers and coroutines.

use tracing::info;

use luny_script::{
    Block, CoroutineOptions, ExecutionContext, LifecycleEvent, Repeat, Runnable, ScriptError,
    ScriptInstance, Value, debug_only, slot,
};

/// Logs a message for the running object.
#[derive(Debug, Clone)]
pub struct LogBlock {
    message: String,
}

impl LogBlock {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Block for LogBlock {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        info!(
            object = %ctx.object,
            frame = ctx.frame(),
            heartbeat = ctx.heartbeat(),
            loop_count = ctx.loop_count,
            "{}",
            self.message
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("LogBlock({:?})", self.message)
    }
}

/// Assigns a variable.
#[derive(Debug, Clone)]
pub struct SetVariable {
    name: String,
    value: Value,
}

impl SetVariable {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Block for SetVariable {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        ctx.variables.set(self.name.clone(), self.value.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("SetVariable({} = {:?})", self.name, self.value)
    }
}

/// Adds to a number variable.
#[derive(Debug, Clone)]
pub struct Increment {
    name: String,
    by: f64,
}

impl Increment {
    pub fn new(name: impl Into<String>, by: f64) -> Self {
        Self {
            name: name.into(),
            by,
        }
    }
}

impl Block for Increment {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        ctx.variables.increment(&self.name, self.by)?;
        Ok(())
    }
}

/// Asks the host to reload the active scene.
#[derive(Debug, Clone, Copy)]
pub struct ReloadScene;

impl Block for ReloadScene {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        info!(object = %ctx.object, scene = %ctx.scene.active_scene(), "scene reload requested");
        ctx.scene.request_reload();
        Ok(())
    }
}

/// Always fails.
#[derive(Debug, Clone)]
pub struct Explode {
    reason: String,
}

impl Explode {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Block for Explode {
    fn execute(&self, _ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        Err(ScriptError::execution(self.type_name(), self.reason.clone()))
    }
}

/// The demo scripts, assigned round-robin to spawned objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoScript {
    /// Counts heartbeats and reports every second of frame time.
    Spinner,
    /// Fails after two seconds of heartbeats and gets disabled.
    Bomb,
    /// Reloads the scene once after three seconds.
    Loader,
}

impl DemoScript {
    /// The script for the `index`-th spawned object.
    #[must_use]
    pub fn for_index(index: usize) -> Self {
        match index % 3 {
            0 => Self::Spinner,
            1 => Self::Bomb,
            _ => Self::Loader,
        }
    }

    /// Attach this script's handlers and coroutines.
    ///
    /// # Errors
    ///
    /// Returns a construction error if a sequence or coroutine is invalid.
    pub fn build(self, script: &mut ScriptInstance) -> Result<(), ScriptError> {
        let name = format!("{self:?}");
        script.on(
            LifecycleEvent::Ready,
            Runnable::new(vec![
                slot(LogBlock::new(format!("{name} ready"))),
                slot(SetVariable::new("kind", name.as_str())),
                debug_only(LogBlock::new(format!("{name} built with debug blocks"))),
            ])?,
        );
        script.on(
            LifecycleEvent::Destroyed,
            Runnable::single(LogBlock::new(format!("{name} destroyed"))),
        );

        match self {
            Self::Spinner => {
                script
                    .on(LifecycleEvent::Heartbeat, Runnable::single(Increment::new("spins", 1.0)))
                    .coroutines_mut()
                    .register(
                        CoroutineOptions::timer("every-second", 1.0)
                            .on_elapsed(Runnable::single(LogBlock::new("one second passed"))),
                    )?;
                let guard = script.config().loop_guard("triple-log");
                script.coroutines_mut().register(
                    CoroutineOptions::counter("sliced", 1_000_000)
                        .time_sliced(0, 90)
                        .on_frame_update(Runnable::single(Repeat::new(
                            3,
                            Runnable::single(LogBlock::new("sliced frame tick")),
                            guard,
                        ))),
                )?;
            }
            Self::Bomb => {
                script.coroutines_mut().register(
                    CoroutineOptions::counter("fuse", 100)
                        .once()
                        .on_elapsed(Runnable::new(vec![
                            slot(LogBlock::new("fuse burnt down")),
                            slot(Explode::new("the bomb went off")),
                            slot(LogBlock::new("never logged")),
                        ])?)
                        .on_destroyed(Runnable::single(LogBlock::new("fuse defused"))),
                )?;
            }
            Self::Loader => {
                script.on(
                    LifecycleEvent::SceneLoaded,
                    Runnable::single(Increment::new("loads", 1.0)),
                );
                script.coroutines_mut().register(
                    CoroutineOptions::timer("reload", 3.0)
                        .once()
                        .on_elapsed(Runnable::single(ReloadScene)),
                )?;
            }
        }
        Ok(())
    }
}
