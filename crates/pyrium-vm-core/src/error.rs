//! VM error types

use thiserror::Error;

/// Failure reported by the host behind a [`World`](crate::World) call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The host does not provide this capability
    #[error("Unsupported capability: {0}")]
    Unsupported(&'static str),

    /// A referenced object does not exist on the host
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other host-side failure
    #[error("Host error: {0}")]
    Host(String),
}

impl CapabilityError {
    /// Create a host error
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

/// Result type for capability calls
pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// Execution faults. Each one aborts only the invocation that raised it.
#[derive(Debug, Error)]
pub enum VmError {
    /// `ASSERT` evaluated its condition to false
    #[error("AssertionFailed: '{condition}' at instruction {index}")]
    AssertionFailed {
        /// Condition text as stored in the pool
        condition: String,
        /// Instruction index within the function
        index: usize,
    },

    /// `MATH_DIV` with a zero divisor
    #[error("DivisionByZero: register '{register}' at instruction {index}")]
    DivisionByZero {
        /// Register being divided
        register: String,
        /// Instruction index within the function
        index: usize,
    },

    /// Function requested by the host is not in the module
    #[error("MissingFunction: '{0}'")]
    MissingFunction(String),

    /// World call failed
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),
}

impl VmError {
    /// Create an assertion failure
    pub fn assertion(condition: impl Into<String>, index: usize) -> Self {
        Self::AssertionFailed {
            condition: condition.into(),
            index,
        }
    }

    /// Create a division by zero fault
    pub fn division_by_zero(register: impl Into<String>, index: usize) -> Self {
        Self::DivisionByZero {
            register: register.into(),
            index,
        }
    }

    /// Whether the fault came from the host rather than the mod's own code
    pub fn is_capability(&self) -> bool {
        matches!(self, Self::Capability(_))
    }
}

/// Result type for VM operations
pub type VmResult<T> = std::result::Result<T, VmError>;
