//! Lamina Error Types
//!
//! Defines all error conditions produced by the Lamina core.
//! Internal-consistency failures mark broken invariants; everything else is a
//! caller error that can be reported and recovered from.

use crate::keys::DispatchKey;
use crate::level::Level;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LaminaError {
    // Internal-consistency failures
    #[error("internal: cannot wrap an undefined value")]
    UndefinedValue,

    #[error("internal: wrapping at level {outer} over a wrapper at level {inner}; levels must strictly increase")]
    LevelNotIncreasing { inner: Level, outer: Level },

    #[error("internal: dead-wrapper fallback reached by `{op}` without any dead wrapper")]
    NoDeadWrapper { op: &'static str },

    #[error("internal: not yet implemented: {0}")]
    NotImplemented(&'static str),

    #[error("internal: can't {0} for WrappedValue")]
    LayoutMutation(&'static str),

    #[error("internal: wrapped values have no storage")]
    StorageAccess,

    #[error("internal: value carries the wrapper key but is not a wrapper")]
    MissingWrapperKey,

    // Operator errors
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    #[error("`{op}` expected {expected}")]
    TypeMismatch { op: &'static str, expected: &'static str },

    #[error("`{op}` takes {expected} arguments, got {actual}")]
    ArityMismatch { op: &'static str, expected: usize, actual: usize },

    #[error("no kernel for `{op}` at {key:?}")]
    NoKernel { op: &'static str, key: Option<DispatchKey> },

    #[error("shape {0:?} has too many elements")]
    ShapeOverflow(Vec<usize>),

    #[error("batch dim {dim} out of range for rank {rank}")]
    BatchDimOutOfRange { dim: usize, rank: usize },

    #[error("invalid operator: 0x{0:02X}")]
    InvalidOperator(u8),

    #[error("invalid dispatch key: 0x{0:02X}")]
    InvalidKey(u8),

    // Operand stack
    #[error("operand stack overflow")]
    OperandOverflow,

    #[error("operand stack underflow")]
    OperandUnderflow,

    // Layers
    #[error("level {0} is not active")]
    LevelNotActive(Level),

    #[error("layer stack is full ({0} levels)")]
    LevelLimit(usize),

    #[error("layer stack is empty")]
    NoActiveLevel,
}

impl LaminaError {
    /// True for invariant violations. Hosts should not continue past these.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            LaminaError::UndefinedValue
                | LaminaError::LevelNotIncreasing { .. }
                | LaminaError::NoDeadWrapper { .. }
                | LaminaError::NotImplemented(_)
                | LaminaError::LayoutMutation(_)
                | LaminaError::StorageAccess
                | LaminaError::MissingWrapperKey
        )
    }
}

pub type LaminaResult<T> = Result<T, LaminaError>;
