//! Runnables: ordered, immutable block sequences.
//!
//! A [`Runnable`] is built once while a script is assembled and then executed
//! any number of times. It is itself a [`Block`], so sequences nest.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::block::{Block, BlockSlot};
use crate::context::ExecutionContext;
use crate::error::ScriptError;
use crate::trace::ExecutionTrace;

static NEXT_RUNNABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Runnable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunnableId(pub u64);

impl RunnableId {
    fn next() -> Self {
        Self(NEXT_RUNNABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RunnableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered sequence of child blocks.
pub struct Runnable {
    id: RunnableId,
    blocks: Vec<BlockSlot>,
}

impl Runnable {
    /// Build a sequence from its children.
    ///
    /// `None` children are kept in place and skipped at execution.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::EmptySequence`] if `blocks` is empty.
    pub fn new(blocks: Vec<BlockSlot>) -> Result<Self, ScriptError> {
        if blocks.is_empty() {
            return Err(ScriptError::EmptySequence);
        }
        Ok(Self {
            id: RunnableId::next(),
            blocks,
        })
    }

    /// Build a sequence from a single block.
    pub fn single(block: impl Block + 'static) -> Self {
        Self {
            id: RunnableId::next(),
            blocks: vec![Some(Box::new(block))],
        }
    }

    /// Returns the runnable's identity.
    #[must_use]
    pub fn id(&self) -> RunnableId {
        self.id
    }

    /// Number of child slots, including skipped ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the sequence has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Run every present child in order.
    ///
    /// Stops at the first failing child and returns its error untouched.
    /// A failure is traced once, by the innermost sequence it passes
    /// through; enclosing sequences do not trace it again.
    ///
    /// # Errors
    ///
    /// Returns whatever the first failing child returned.
    pub fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        ctx.failure_traced = false;
        for block in self.blocks.iter().flatten() {
            let result = block.execute(ctx);
            if result.is_ok() {
                ctx.failure_traced = false;
            } else if ctx.failure_traced {
                return result;
            }
            if let Some(hook) = ctx.hook.as_deref_mut() {
                ctx.failure_traced = result.is_err();
                hook.on_trace(ExecutionTrace {
                    frame: ctx.time.frame_count(),
                    elapsed_seconds: ctx.time.elapsed_seconds(),
                    runnable_id: self.id,
                    block_type: block.type_name(),
                    description: block.describe(),
                    error: result.as_ref().err().map(ToString::to_string),
                });
            }
            result?;
        }
        Ok(())
    }
}

impl Block for Runnable {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        Runnable::execute(self, ctx)
    }

    fn type_name(&self) -> &'static str {
        "Runnable"
    }

    fn describe(&self) -> String {
        format!("Runnable#{} ({} blocks)", self.id, self.blocks.len())
    }
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<&str> = self
            .blocks
            .iter()
            .map(|b| b.as_ref().map_or("<skipped>", |b| b.type_name()))
            .collect();
        f.debug_struct("Runnable")
            .field("id", &self.id)
            .field("blocks", &types)
            .finish()
    }
}
