//! Coroutine runner: owns and advances the coroutines of one script.
//!
//! Coroutines are keyed by name and visited in registration order on every
//! tick. Heartbeats and frame updates are separate entry points: counter
//! coroutines only advance on [`CoroutineRunner::on_heartbeat`], timer
//! coroutines only on [`CoroutineRunner::on_frame_update`].

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::context::ExecutionContext;
use crate::coroutine::{Coroutine, CoroutineOptions};
use crate::error::ScriptError;

/// The set of active coroutines of one script instance.
#[derive(Debug, Default)]
pub struct CoroutineRunner {
    /// Coroutines keyed by name, in registration order.
    coroutines: IndexMap<String, Coroutine>,
}

impl CoroutineRunner {
    /// Create an empty runner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            coroutines: IndexMap::new(),
        }
    }

    /// Build and store a coroutine.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::DuplicateCoroutine`] if the name is taken (the
    /// existing coroutine is left untouched), or
    /// [`ScriptError::InvalidCoroutine`] if the options fail validation.
    pub fn register(&mut self, options: CoroutineOptions) -> Result<&mut Coroutine, ScriptError> {
        if self.coroutines.contains_key(&options.name) {
            return Err(ScriptError::DuplicateCoroutine { name: options.name });
        }
        let coroutine = Coroutine::new(options)?;
        debug!(
            coroutine = coroutine.name(),
            driver = ?coroutine.driver(),
            "registered coroutine"
        );
        let entry = self
            .coroutines
            .entry(coroutine.name().to_string())
            .or_insert(coroutine);
        Ok(entry)
    }

    /// Look up a coroutine by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Coroutine> {
        self.coroutines.get(name)
    }

    /// Look up a coroutine by name for pausing, resuming or stopping.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Coroutine> {
        self.coroutines.get_mut(name)
    }

    /// Returns `true` if a coroutine with this name is registered.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.coroutines.contains_key(name)
    }

    /// Remove a coroutine without running its teardown sequence.
    ///
    /// The remaining coroutines keep their relative order.
    pub fn remove(&mut self, name: &str) -> Option<Coroutine> {
        let removed = self.coroutines.shift_remove(name);
        if removed.is_some() {
            debug!(coroutine = name, "removed coroutine");
        }
        removed
    }

    /// Number of registered coroutines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coroutines.len()
    }

    /// Returns `true` if no coroutine is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coroutines.is_empty()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.coroutines.keys().map(String::as_str)
    }

    /// Drive every open coroutine by one heartbeat.
    ///
    /// # Errors
    ///
    /// Propagates the first block error. Coroutines after the failing one are
    /// not visited this tick.
    pub fn on_heartbeat(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        for coroutine in self.coroutines.values_mut() {
            if !coroutine.should_process() {
                continue;
            }
            if coroutine.run_heartbeat(ctx)? {
                trace!(coroutine = coroutine.name(), heartbeat = ctx.heartbeat(), "elapsed");
            }
        }
        Ok(())
    }

    /// Drive every open coroutine by one frame.
    ///
    /// # Errors
    ///
    /// Propagates the first block error. Coroutines after the failing one are
    /// not visited this tick.
    pub fn on_frame_update(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        for coroutine in self.coroutines.values_mut() {
            if !coroutine.should_process() {
                continue;
            }
            if coroutine.run_frame_update(ctx)? {
                trace!(coroutine = coroutine.name(), frame = ctx.frame(), "elapsed");
            }
        }
        Ok(())
    }

    /// Notify every coroutine of the owning object's destruction, then drop
    /// them all.
    ///
    /// A failing teardown sequence does not stop the others or the clear.
    ///
    /// # Errors
    ///
    /// Returns the first teardown error after the table has been cleared.
    pub fn on_object_destroyed(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        let mut first_error = None;
        for coroutine in self.coroutines.values_mut() {
            if let Err(err) = coroutine.on_object_destroyed(ctx) {
                warn!(coroutine = coroutine.name(), %err, "coroutine teardown failed");
                first_error.get_or_insert(err);
            }
        }
        debug!(object = %ctx.object, count = self.coroutines.len(), "cleared coroutines");
        self.coroutines.clear();
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
