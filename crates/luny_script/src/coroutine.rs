//! Coroutines: named, independently scheduled units of repeated execution.
//!
//! A coroutine is driven by exactly one clock:
//!
//! - [`CoroutineDriver::Counter`] advances once per heartbeat (fixed step).
//! - [`CoroutineDriver::Timer`] accumulates frame delta time.
//!
//! Both kinds may carry per-tick sequences (`on_heartbeat`, `on_frame_update`)
//! that run on every tick permitted by the optional [`TimeSlice`], whatever the
//! driver, and an `on_elapsed` sequence that runs when the driver reaches its
//! threshold.

use tracing::warn;

use crate::context::ExecutionContext;
use crate::error::ScriptError;
use crate::runnable::Runnable;

/// The clock a coroutine accumulates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoroutineDriver {
    /// Elapses after this many heartbeats.
    Counter {
        /// Heartbeats per elapse, at least 1.
        heartbeats: u64,
    },
    /// Elapses after this much frame time.
    Timer {
        /// Seconds per elapse, positive and finite.
        seconds: f64,
    },
}

impl CoroutineDriver {
    /// Returns `true` for heartbeat-driven coroutines.
    #[must_use]
    pub fn is_counter(&self) -> bool {
        matches!(self, Self::Counter { .. })
    }

    /// Returns `true` for frame-time-driven coroutines.
    #[must_use]
    pub fn is_timer(&self) -> bool {
        matches!(self, Self::Timer { .. })
    }
}

/// Slack when comparing accumulated frame time against a timer duration.
///
/// Summing frame deltas loses precision (ten 0.1 s frames add up to just
/// under 1.0 s).
const TIMER_EPSILON: f64 = 1e-9;

/// What happens after a coroutine elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElapsePolicy {
    /// Reset the accumulator and keep running.
    #[default]
    Repeat,
    /// Finish after the first elapse.
    Once,
}

/// Restricts tick sequences to every `interval`-th tick, starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlice {
    /// First tick (modulo `interval`) on which the sequence runs.
    pub offset: u64,
    /// Distance between runs, at least 1.
    pub interval: u64,
}

impl TimeSlice {
    /// Create a slice.
    #[must_use]
    pub const fn new(offset: u64, interval: u64) -> Self {
        Self { offset, interval }
    }

    /// Returns `true` if `(tick - offset) mod interval == 0`.
    #[must_use]
    pub fn permits(&self, tick: u64) -> bool {
        if self.interval == 0 {
            return false;
        }
        // Congruence form; avoids underflow when tick < offset.
        tick % self.interval == self.offset % self.interval
    }
}

/// Lifecycle state of a coroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoroutineState {
    /// Ticks are processed.
    Running,
    /// Ticks are skipped until resumed.
    Paused,
    /// Stopped, completed a one-shot elapse, or torn down.
    Finished,
}

/// Everything needed to register a coroutine.
#[derive(Debug)]
pub struct CoroutineOptions {
    /// Name, unique per scheduler.
    pub name: String,
    /// Driver kind and threshold.
    pub driver: CoroutineDriver,
    /// Optional time-slicing of the tick sequences.
    pub time_slice: Option<TimeSlice>,
    /// Behavior after an elapse.
    pub policy: ElapsePolicy,
    /// Runs on permitted heartbeats.
    pub on_heartbeat: Option<Runnable>,
    /// Runs on permitted frame updates.
    pub on_frame_update: Option<Runnable>,
    /// Runs each time the driver reaches its threshold.
    pub on_elapsed: Option<Runnable>,
    /// Runs once when the owning object is destroyed.
    pub on_destroyed: Option<Runnable>,
}

impl CoroutineOptions {
    fn with_driver(name: impl Into<String>, driver: CoroutineDriver) -> Self {
        Self {
            name: name.into(),
            driver,
            time_slice: None,
            policy: ElapsePolicy::Repeat,
            on_heartbeat: None,
            on_frame_update: None,
            on_elapsed: None,
            on_destroyed: None,
        }
    }

    /// A coroutine elapsing every `heartbeats` heartbeats.
    #[must_use]
    pub fn counter(name: impl Into<String>, heartbeats: u64) -> Self {
        Self::with_driver(name, CoroutineDriver::Counter { heartbeats })
    }

    /// A coroutine elapsing every `seconds` of frame time.
    #[must_use]
    pub fn timer(name: impl Into<String>, seconds: f64) -> Self {
        Self::with_driver(name, CoroutineDriver::Timer { seconds })
    }

    /// Only run tick sequences when `(tick - offset) mod interval == 0`.
    #[must_use]
    pub fn time_sliced(mut self, offset: u64, interval: u64) -> Self {
        self.time_slice = Some(TimeSlice::new(offset, interval));
        self
    }

    /// Finish after the first elapse.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.policy = ElapsePolicy::Once;
        self
    }

    /// Set the heartbeat tick sequence.
    #[must_use]
    pub fn on_heartbeat(mut self, runnable: Runnable) -> Self {
        self.on_heartbeat = Some(runnable);
        self
    }

    /// Set the frame tick sequence.
    #[must_use]
    pub fn on_frame_update(mut self, runnable: Runnable) -> Self {
        self.on_frame_update = Some(runnable);
        self
    }

    /// Set the elapsed sequence.
    #[must_use]
    pub fn on_elapsed(mut self, runnable: Runnable) -> Self {
        self.on_elapsed = Some(runnable);
        self
    }

    /// Set the teardown sequence.
    #[must_use]
    pub fn on_destroyed(mut self, runnable: Runnable) -> Self {
        self.on_destroyed = Some(runnable);
        self
    }

    fn validate(&self) -> Result<(), ScriptError> {
        let reason = if self.name.is_empty() {
            Some("name must not be empty")
        } else {
            match self.driver {
                CoroutineDriver::Counter { heartbeats: 0 } => {
                    Some("counter threshold must be at least 1 heartbeat")
                }
                CoroutineDriver::Timer { seconds } if !(seconds.is_finite() && seconds > 0.0) => {
                    Some("timer duration must be a positive number of seconds")
                }
                _ => match self.time_slice {
                    Some(TimeSlice { interval: 0, .. }) => {
                        Some("time slice interval must be at least 1")
                    }
                    _ => None,
                },
            }
        };
        match reason {
            Some(reason) => Err(ScriptError::InvalidCoroutine {
                name: self.name.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// A registered coroutine. Owned by its [`CoroutineRunner`](crate::CoroutineRunner).
#[derive(Debug)]
pub struct Coroutine {
    name: String,
    driver: CoroutineDriver,
    time_slice: Option<TimeSlice>,
    policy: ElapsePolicy,
    state: CoroutineState,
    heartbeats: u64,
    timer_seconds: f64,
    elapsed_count: u64,
    destroyed: bool,
    on_heartbeat: Option<Runnable>,
    on_frame_update: Option<Runnable>,
    on_elapsed: Option<Runnable>,
    on_destroyed: Option<Runnable>,
}

impl Coroutine {
    /// Build a coroutine from validated options.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::InvalidCoroutine`] for an empty name, a zero
    /// counter threshold, a non-positive timer duration or a zero slice
    /// interval.
    pub fn new(options: CoroutineOptions) -> Result<Self, ScriptError> {
        options.validate()?;
        Ok(Self {
            name: options.name,
            driver: options.driver,
            time_slice: options.time_slice,
            policy: options.policy,
            state: CoroutineState::Running,
            heartbeats: 0,
            timer_seconds: 0.0,
            elapsed_count: 0,
            destroyed: false,
            on_heartbeat: options.on_heartbeat,
            on_frame_update: options.on_frame_update,
            on_elapsed: options.on_elapsed,
            on_destroyed: options.on_destroyed,
        })
    }

    /// The coroutine's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The coroutine's driver.
    #[must_use]
    pub fn driver(&self) -> CoroutineDriver {
        self.driver
    }

    /// The elapse policy.
    #[must_use]
    pub fn policy(&self) -> ElapsePolicy {
        self.policy
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> CoroutineState {
        self.state
    }

    /// Heartbeats accumulated since the last elapse (counter driver only).
    #[must_use]
    pub fn heartbeats(&self) -> u64 {
        self.heartbeats
    }

    /// Frame time accumulated since the last elapse (timer driver only).
    #[must_use]
    pub fn timer_seconds(&self) -> f64 {
        self.timer_seconds
    }

    /// How many times the driver has elapsed.
    #[must_use]
    pub fn elapsed_count(&self) -> u64 {
        self.elapsed_count
    }

    /// The processing gate. Closed while paused or finished.
    #[must_use]
    pub fn should_process(&self) -> bool {
        self.state == CoroutineState::Running
    }

    /// Stop processing ticks until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if self.state == CoroutineState::Running {
            self.state = CoroutineState::Paused;
        }
    }

    /// Continue after [`pause`](Self::pause). Accumulators are kept.
    pub fn resume(&mut self) {
        if self.state == CoroutineState::Paused {
            self.state = CoroutineState::Running;
        }
    }

    /// Finish the coroutine. It stays registered until removed.
    pub fn stop(&mut self) {
        self.state = CoroutineState::Finished;
    }

    /// Clear the accumulators and run again. No effect after teardown.
    pub fn restart(&mut self) {
        if self.destroyed {
            return;
        }
        self.heartbeats = 0;
        self.timer_seconds = 0.0;
        self.state = CoroutineState::Running;
    }

    /// Whether the tick sequences run on `tick`.
    #[must_use]
    pub fn should_run_tick_blocks(&self, tick: u64) -> bool {
        self.time_slice.is_none_or(|slice| slice.permits(tick))
    }

    /// Advance the counter by one heartbeat.
    ///
    /// Returns `true` when the threshold is reached. Timer coroutines ignore
    /// the call and keep their state.
    pub fn process_heartbeat(&mut self) -> bool {
        let CoroutineDriver::Counter { heartbeats } = self.driver else {
            warn!(coroutine = %self.name, "heartbeat ignored by timer coroutine");
            return false;
        };
        self.heartbeats += 1;
        if self.heartbeats < heartbeats {
            return false;
        }
        self.heartbeats = 0;
        self.on_elapse();
        true
    }

    /// Advance the timer by `delta` seconds of frame time.
    ///
    /// Returns `true` when the duration is reached. Counter coroutines ignore
    /// the call and keep their state.
    pub fn process_frame_update(&mut self, delta: f64) -> bool {
        let CoroutineDriver::Timer { seconds } = self.driver else {
            warn!(coroutine = %self.name, "frame update ignored by counter coroutine");
            return false;
        };
        self.timer_seconds += delta.max(0.0);
        if self.timer_seconds + TIMER_EPSILON < seconds {
            return false;
        }
        // Repeating timers carry the overshoot into the next period.
        let remainder = self.timer_seconds - seconds;
        self.timer_seconds = if remainder > TIMER_EPSILON {
            remainder
        } else {
            0.0
        };
        self.on_elapse();
        if self.policy == ElapsePolicy::Once {
            self.timer_seconds = 0.0;
        }
        true
    }

    fn on_elapse(&mut self) {
        self.elapsed_count += 1;
        if self.policy == ElapsePolicy::Once {
            self.state = CoroutineState::Finished;
        }
    }

    /// Process one heartbeat: the heartbeat sequence (if the slice permits),
    /// then the counter and, on elapse, the elapsed sequence.
    ///
    /// Returns whether the coroutine elapsed.
    ///
    /// # Errors
    ///
    /// Propagates the first block error; later steps of this tick are skipped.
    pub fn run_heartbeat(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<bool, ScriptError> {
        if !self.should_process() {
            return Ok(false);
        }
        if let Some(sequence) = &self.on_heartbeat
            && self.should_run_tick_blocks(ctx.heartbeat())
        {
            sequence.execute(ctx)?;
        }
        if self.driver.is_counter() && self.process_heartbeat() {
            if let Some(sequence) = &self.on_elapsed {
                sequence.execute(ctx)?;
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Process one frame: the frame sequence (if the slice permits), then the
    /// timer and, on elapse, the elapsed sequence.
    ///
    /// Returns whether the coroutine elapsed.
    ///
    /// # Errors
    ///
    /// Propagates the first block error; later steps of this tick are skipped.
    pub fn run_frame_update(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<bool, ScriptError> {
        if !self.should_process() {
            return Ok(false);
        }
        if let Some(sequence) = &self.on_frame_update
            && self.should_run_tick_blocks(ctx.frame())
        {
            sequence.execute(ctx)?;
        }
        if self.driver.is_timer() && self.process_frame_update(ctx.delta_time()) {
            if let Some(sequence) = &self.on_elapsed {
                sequence.execute(ctx)?;
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Teardown notification from the owning object.
    ///
    /// Runs the teardown sequence once and finishes the coroutine. Later
    /// calls do nothing.
    ///
    /// # Errors
    ///
    /// Propagates an error from the teardown sequence.
    pub fn on_object_destroyed(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<(), ScriptError> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;
        self.state = CoroutineState::Finished;
        match &self.on_destroyed {
            Some(sequence) => sequence.execute(ctx),
            None => Ok(()),
        }
    }
}
