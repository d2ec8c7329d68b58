//! # luny_script
//!
//! Execution and coroutine-scheduling core for scripted game objects.
//!
//! Scripts are trees of small [`Block`]s grouped into [`Runnable`] sequences.
//! The host drives them through a [`ScriptInstance`] per object: lifecycle
//! notifications run the runnables registered for them, and two independent
//! clocks (fixed-step heartbeats and variable-rate frames) advance the
//! object's coroutines through its [`CoroutineRunner`].
//!
//! This crate provides:
//!
//! - [`context`]: the per-call [`ExecutionContext`].
//! - [`block`] / [`runnable`]: executable units and sequences.
//! - [`blocks`]: branching, bounded loops and debug-only elision.
//! - [`coroutine`] / [`scheduler`]: counter and timer coroutines.
//! - [`script`]: lifecycle dispatch for one object.
//! - [`trace`]: execution traces for debug hooks.
//! - [`services`]: host clocks and scene services, injected.
//! - [`variables`]: per-script values.
//! - [`config`] / [`error`]: configuration and the error taxonomy.
//!
//! ## Usage
//!
//! ```rust
//! use luny_script::{
//!     CoroutineOptions, ExecutionContext, FnBlock, ManualClock, ObjectHandle, Runnable,
//!     ScriptConfig, ScriptInstance, StaticScene,
//! };
//!
//! let mut script = ScriptInstance::new(ObjectHandle::from_raw(1), ScriptConfig::default());
//! script
//!     .coroutines_mut()
//!     .register(CoroutineOptions::counter("tick5", 5).on_elapsed(Runnable::single(
//!         FnBlock::new("Count", |ctx: &mut ExecutionContext<'_>| {
//!             ctx.variables.increment("fired", 1.0)?;
//!             Ok(())
//!         }),
//!     )))
//!     .unwrap();
//!
//! let mut clock = ManualClock::new();
//! let scene = StaticScene::new("main");
//! script.enable(&clock, &scene).unwrap();
//! for _ in 0..5 {
//!     clock.advance_heartbeat();
//!     script.heartbeat(&clock, &scene).unwrap();
//! }
//! assert_eq!(script.variables().get_number("fired"), Ok(1.0));
//! ```

pub mod block;
pub mod blocks;
pub mod config;
pub mod context;
pub mod coroutine;
pub mod error;
pub mod object;
pub mod runnable;
pub mod scheduler;
pub mod script;
pub mod services;
pub mod trace;
pub mod variables;

pub use block::{Block, BlockSlot, FnBlock, slot};
pub use blocks::{Condition, If, LoopGuard, Repeat, RepeatWhile, debug_only};
pub use config::ScriptConfig;
pub use context::ExecutionContext;
pub use coroutine::{
    Coroutine, CoroutineDriver, CoroutineOptions, CoroutineState, ElapsePolicy, TimeSlice,
};
pub use error::{ScriptError, VariableError};
pub use object::{ObjectAllocator, ObjectHandle};
pub use runnable::{Runnable, RunnableId};
pub use scheduler::CoroutineRunner;
pub use script::{LifecycleEvent, ScriptInstance};
pub use services::{ManualClock, SceneService, StaticScene, TimeService};
pub use trace::{DebugHook, ExecutionTrace, TraceBuffer};
pub use variables::{Value, Variables};
