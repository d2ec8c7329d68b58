//! The [`Block`] trait: the atomic executable unit of a script.
//!
//! Concrete blocks (logging, spawning, scene reloads, ...) live outside this
//! crate. They only need to implement [`Block::execute`]; the identity methods
//! have defaults derived from the Rust type name.

use crate::context::ExecutionContext;
use crate::error::ScriptError;

/// An executable script step.
pub trait Block {
    /// Run the block against the current context.
    ///
    /// # Errors
    ///
    /// Any error aborts the enclosing sequence and travels to the host
    /// unchanged.
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError>;

    /// Stable type tag, used in traces.
    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Human-readable description, used in traces.
    fn describe(&self) -> String {
        self.type_name().to_string()
    }
}

/// A child slot of a sequence. `None` is skipped when the sequence runs.
pub type BlockSlot = Option<Box<dyn Block>>;

/// Box a block into a sequence slot.
pub fn slot(block: impl Block + 'static) -> BlockSlot {
    Some(Box::new(block))
}

/// Strips the module path and generic arguments from a Rust type name.
#[must_use]
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A block backed by a closure.
pub struct FnBlock<F> {
    name: &'static str,
    f: F,
}

impl<F> FnBlock<F>
where
    F: Fn(&mut ExecutionContext<'_>) -> Result<(), ScriptError>,
{
    /// Wrap `f` as a block reported under `name`.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> Block for FnBlock<F>
where
    F: Fn(&mut ExecutionContext<'_>) -> Result<(), ScriptError>,
{
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        (self.f)(ctx)
    }

    fn type_name(&self) -> &'static str {
        self.name
    }
}
