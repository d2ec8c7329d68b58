//! Control-flow blocks: branching, bounded loops and debug-only elision.

use crate::block::{Block, BlockSlot, slot};
use crate::context::ExecutionContext;
use crate::error::ScriptError;
use crate::runnable::Runnable;

/// A predicate evaluated against the running context.
pub type Condition = Box<dyn Fn(&ExecutionContext<'_>) -> Result<bool, ScriptError>>;

/// Keep `block` only when the `debug-blocks` feature is enabled.
///
/// The returned slot is `None` otherwise, and sequences skip it.
pub fn debug_only(block: impl Block + 'static) -> BlockSlot {
    if cfg!(feature = "debug-blocks") {
        slot(block)
    } else {
        None
    }
}

/// Iteration ceiling for a named loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopGuard {
    name: String,
    limit: u64,
}

impl LoopGuard {
    /// A guard allowing at most `limit` iterations.
    #[must_use]
    pub fn new(name: impl Into<String>, limit: u64) -> Self {
        Self {
            name: name.into(),
            limit,
        }
    }

    /// The loop name reported on failure.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured ceiling.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Check that zero-based `iteration` may run.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::MaxIterationsExceeded`] once `iteration`
    /// reaches the limit.
    pub fn check(&self, iteration: u64) -> Result<(), ScriptError> {
        if iteration >= self.limit {
            return Err(ScriptError::MaxIterationsExceeded {
                loop_name: self.name.clone(),
                limit: self.limit,
            });
        }
        Ok(())
    }
}

/// Runs `then` or `otherwise` depending on a condition.
pub struct If {
    condition: Condition,
    then: Runnable,
    otherwise: Option<Runnable>,
}

impl If {
    /// Branch on `condition`.
    pub fn new(
        condition: impl Fn(&ExecutionContext<'_>) -> Result<bool, ScriptError> + 'static,
        then: Runnable,
    ) -> Self {
        Self {
            condition: Box::new(condition),
            then,
            otherwise: None,
        }
    }

    /// Run `runnable` when the condition is false.
    #[must_use]
    pub fn otherwise(mut self, runnable: Runnable) -> Self {
        self.otherwise = Some(runnable);
        self
    }
}

impl Block for If {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        if (self.condition)(ctx)? {
            self.then.execute(ctx)
        } else if let Some(otherwise) = &self.otherwise {
            otherwise.execute(ctx)
        } else {
            Ok(())
        }
    }
}

/// Runs its body a fixed number of times.
///
/// The context's loop counter holds the zero-based iteration while the body
/// runs and is restored afterwards.
pub struct Repeat {
    count: u64,
    body: Runnable,
    guard: LoopGuard,
}

impl Repeat {
    /// Repeat `body` `count` times under `guard`.
    #[must_use]
    pub fn new(count: u64, body: Runnable, guard: LoopGuard) -> Self {
        Self { count, body, guard }
    }
}

impl Block for Repeat {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        let outer = ctx.loop_count;
        let result = (0..self.count).try_for_each(|iteration| {
            self.guard.check(iteration)?;
            ctx.loop_count = iteration;
            self.body.execute(ctx)
        });
        ctx.loop_count = outer;
        result
    }

    fn describe(&self) -> String {
        format!("Repeat '{}' x{}", self.guard.name(), self.count)
    }
}

/// Runs its body while a condition holds.
pub struct RepeatWhile {
    condition: Condition,
    body: Runnable,
    guard: LoopGuard,
}

impl RepeatWhile {
    /// Repeat `body` while `condition` is true, under `guard`.
    pub fn new(
        condition: impl Fn(&ExecutionContext<'_>) -> Result<bool, ScriptError> + 'static,
        body: Runnable,
        guard: LoopGuard,
    ) -> Self {
        Self {
            condition: Box::new(condition),
            body,
            guard,
        }
    }
}

impl Block for RepeatWhile {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ScriptError> {
        let outer = ctx.loop_count;
        let mut iteration = 0;
        let result = loop {
            match (self.condition)(ctx) {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(err) => break Err(err),
            }
            if let Err(err) = self.guard.check(iteration) {
                break Err(err);
            }
            ctx.loop_count = iteration;
            if let Err(err) = self.body.execute(ctx) {
                break Err(err);
            }
            iteration += 1;
        };
        ctx.loop_count = outer;
        result
    }

    fn describe(&self) -> String {
        format!("RepeatWhile '{}'", self.guard.name())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::block::FnBlock;
    use crate::object::ObjectHandle;
    use crate::services::{ManualClock, StaticScene};
    use crate::variables::Variables;

    fn run(block: &dyn Block, vars: &mut Variables) -> Result<(), ScriptError> {
        let clock = ManualClock::new();
        let scene = StaticScene::new("main");
        let mut ctx = ExecutionContext::new(ObjectHandle::from_raw(1), &clock, &scene, vars);
        block.execute(&mut ctx)
    }

    fn bump(var: &'static str) -> Runnable {
        Runnable::single(FnBlock::new("Bump", move |ctx: &mut ExecutionContext<'_>| {
            ctx.variables.increment(var, 1.0)?;
            Ok(())
        }))
    }

    #[test]
    fn test_if_branches() {
        let block = If::new(
            |ctx: &ExecutionContext<'_>| Ok(ctx.variables.get_bool("go")?),
            bump("yes"),
        )
        .otherwise(bump("no"));

        let mut vars = Variables::new();
        vars.set("go", true);
        run(&block, &mut vars).unwrap();
        vars.set("go", false);
        run(&block, &mut vars).unwrap();
        assert_eq!(vars.get_number("yes"), Ok(1.0));
        assert_eq!(vars.get_number("no"), Ok(1.0));
    }

    #[test]
    fn test_if_condition_error_propagates() {
        let block = If::new(
            |ctx: &ExecutionContext<'_>| Ok(ctx.variables.get_bool("missing")?),
            bump("yes"),
        );
        let mut vars = Variables::new();
        let err = run(&block, &mut vars).unwrap_err();
        assert!(matches!(err, ScriptError::Variable(_)));
    }

    #[test]
    fn test_repeat_sets_loop_counter() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let body = Runnable::single(FnBlock::new("Seen", move |ctx: &mut ExecutionContext<'_>| {
            log.borrow_mut().push(ctx.loop_count);
            Ok(())
        }));
        let block = Repeat::new(3, body, LoopGuard::new("triple", 10));
        let mut vars = Variables::new();
        run(&block, &mut vars).unwrap();
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_repeat_over_limit_fails_with_name_and_limit() {
        let block = Repeat::new(100, bump("n"), LoopGuard::new("spin", 5));
        let mut vars = Variables::new();
        let err = run(&block, &mut vars).unwrap_err();
        assert_eq!(
            err,
            ScriptError::MaxIterationsExceeded {
                loop_name: "spin".to_string(),
                limit: 5
            }
        );
        assert!(err.to_string().contains("spin"));
        assert!(err.to_string().contains('5'));
        assert_eq!(vars.get_number("n"), Ok(5.0));
    }

    #[test]
    fn test_repeat_while_stops_on_condition() {
        let block = RepeatWhile::new(
            |ctx: &ExecutionContext<'_>| {
                Ok(!ctx.variables.contains("n") || ctx.variables.get_number("n")? < 4.0)
            },
            bump("n"),
            LoopGuard::new("until-four", 100),
        );
        let mut vars = Variables::new();
        run(&block, &mut vars).unwrap();
        assert_eq!(vars.get_number("n"), Ok(4.0));
    }

    #[test]
    fn test_repeat_while_runaway_is_guarded() {
        let block = RepeatWhile::new(
            |_: &ExecutionContext<'_>| Ok(true),
            bump("n"),
            LoopGuard::new("forever", 50),
        );
        let mut vars = Variables::new();
        let err = run(&block, &mut vars).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::MaxIterationsExceeded { limit: 50, .. }
        ));
    }

    #[test]
    fn test_debug_only_follows_feature() {
        let slot = debug_only(FnBlock::new("Dbg", |_: &mut ExecutionContext<'_>| Ok(())));
        assert_eq!(slot.is_some(), cfg!(feature = "debug-blocks"));
    }
}
