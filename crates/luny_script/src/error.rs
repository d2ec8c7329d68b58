//! Script error types.
//!
//! Construction errors ([`ScriptError::EmptySequence`],
//! [`ScriptError::DuplicateCoroutine`], [`ScriptError::InvalidCoroutine`]) are
//! raised while a script is being built. Everything else is raised while a
//! script runs and travels up unchanged through runnables and the scheduler to
//! the host.

/// Errors raised while building or executing a script.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    /// A runnable was built without any child blocks.
    #[error("a runnable requires at least one block")]
    EmptySequence,

    /// A coroutine with this name is already registered on the scheduler.
    #[error("duplicate coroutine name: {name}")]
    DuplicateCoroutine {
        /// The clashing name.
        name: String,
    },

    /// Coroutine options failed validation at registration.
    #[error("invalid coroutine '{name}': {reason}")]
    InvalidCoroutine {
        /// The coroutine name as given in the options.
        name: String,
        /// What was wrong with the options.
        reason: String,
    },

    /// A loop ran past its configured iteration ceiling.
    #[error("loop '{loop_name}' exceeded the maximum of {limit} iterations")]
    MaxIterationsExceeded {
        /// Name of the looping block.
        loop_name: String,
        /// The configured ceiling.
        limit: u64,
    },

    /// Invalid variable access or coercion.
    #[error(transparent)]
    Variable(#[from] VariableError),

    /// A concrete block failed while executing.
    #[error("{block} failed: {message}")]
    Execution {
        /// Type tag of the failing block.
        block: String,
        /// Human-readable failure reason.
        message: String,
    },
}

impl ScriptError {
    /// Shorthand for [`ScriptError::Execution`].
    #[must_use]
    pub fn execution(block: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            block: block.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for errors raised while building a script rather than
    /// while running it.
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::EmptySequence | Self::DuplicateCoroutine { .. } | Self::InvalidCoroutine { .. }
        )
    }
}

/// Errors raised by the variable layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VariableError {
    /// The variable has never been assigned.
    #[error("variable '{name}' is not defined")]
    Undefined {
        /// Variable name.
        name: String,
    },

    /// The variable holds a value of another kind.
    #[error("variable '{name}' is {found}, expected {expected}")]
    TypeMismatch {
        /// Variable name.
        name: String,
        /// The kind the caller asked for.
        expected: &'static str,
        /// The kind actually stored.
        found: &'static str,
    },
}
