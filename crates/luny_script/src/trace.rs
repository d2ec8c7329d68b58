//! Execution traces for debug hooks.
//!
//! When an [`ExecutionContext`](crate::ExecutionContext) carries a
//! [`DebugHook`], every child block run by a [`Runnable`](crate::Runnable)
//! produces one [`ExecutionTrace`]. The core keeps nothing; retaining traces is
//! the hook's business ([`TraceBuffer`] is the stock one).

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use crate::runnable::RunnableId;

/// A snapshot of one block execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionTrace {
    /// Host frame counter when the block ran.
    pub frame: u64,
    /// Host elapsed time when the block ran, in seconds.
    pub elapsed_seconds: f64,
    /// The runnable that executed the block.
    pub runnable_id: RunnableId,
    /// Stable type tag of the block.
    pub block_type: &'static str,
    /// Human-readable block description.
    pub description: String,
    /// The error message, if the block failed.
    pub error: Option<String>,
}

impl ExecutionTrace {
    /// Returns `true` if the traced block failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for ExecutionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Frame {:08}] [{:.3} s] Runnable#{} {}",
            self.frame, self.elapsed_seconds, self.runnable_id, self.block_type
        )?;
        if let Some(error) = &self.error {
            write!(f, " [ERROR: {error}]")?;
        }
        Ok(())
    }
}

/// Receives one [`ExecutionTrace`] per executed block.
pub trait DebugHook {
    /// Called after a block returned, successfully or not.
    fn on_trace(&mut self, trace: ExecutionTrace);
}

impl<F: FnMut(ExecutionTrace)> DebugHook for F {
    fn on_trace(&mut self, trace: ExecutionTrace) {
        self(trace);
    }
}

/// A bounded buffer keeping the most recent traces.
#[derive(Debug, Clone)]
pub struct TraceBuffer {
    capacity: usize,
    traces: VecDeque<ExecutionTrace>,
}

impl TraceBuffer {
    /// Create a buffer holding at most `capacity` traces (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            traces: VecDeque::with_capacity(capacity),
        }
    }

    /// Number of buffered traces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionTrace> {
        self.traces.iter()
    }

    /// Remove and return all buffered traces, oldest first.
    pub fn drain(&mut self) -> Vec<ExecutionTrace> {
        self.traces.drain(..).collect()
    }
}

impl DebugHook for TraceBuffer {
    fn on_trace(&mut self, trace: ExecutionTrace) {
        if self.traces.len() == self.capacity {
            self.traces.pop_front();
        }
        self.traces.push_back(trace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(error: Option<&str>) -> ExecutionTrace {
        ExecutionTrace {
            frame: 42,
            elapsed_seconds: 1.5,
            runnable_id: RunnableId(7),
            block_type: "LogBlock",
            description: "LogBlock(\"hi\")".to_string(),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_display_format() {
        assert_eq!(
            sample(None).to_string(),
            "[Frame 00000042] [1.500 s] Runnable#7 LogBlock"
        );
    }

    #[test]
    fn test_display_format_with_error() {
        let trace = sample(Some("boom"));
        assert!(trace.is_error());
        assert_eq!(
            trace.to_string(),
            "[Frame 00000042] [1.500 s] Runnable#7 LogBlock [ERROR: boom]"
        );
    }

    #[test]
    fn test_buffer_drops_oldest() {
        let mut buffer = TraceBuffer::new(2);
        for frame in 0..3 {
            let mut trace = sample(None);
            trace.frame = frame;
            buffer.on_trace(trace);
        }
        let frames: Vec<u64> = buffer.iter().map(|t| t.frame).collect();
        assert_eq!(frames, vec![1, 2]);
        assert_eq!(buffer.drain().len(), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_closure_hook() {
        let mut seen = Vec::new();
        {
            let mut hook = |t: ExecutionTrace| seen.push(t.frame);
            hook.on_trace(sample(None));
        }
        assert_eq!(seen, vec![42]);
    }

    #[test]
    fn test_trace_serializes() {
        let json = serde_json::to_value(sample(Some("x"))).unwrap();
        assert_eq!(json["runnable_id"], 7);
        assert_eq!(json["error"], "x");
    }
}
