//! Runtime Value Representation
//!
//! Values form a recursive stack mirroring the transform stack: a wrapper or a
//! batched proxy holds exactly one inner value, which may itself be a proxy of
//! a lower level, down to a plain tensor.

pub mod batched;
pub mod wrapper;

use std::fmt;

use crate::keys::{DispatchKey, KeySet};
use crate::tensor::{self, Device, Dims, Tensor};

pub use batched::BatchedValue;
pub use wrapper::{Liveness, WrappedValue};

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence of a value
    Undefined,

    /// Unwrapped tensor
    Plain(Tensor),

    /// Level-tagged proxy used by differentiation layers
    Wrapped(WrappedValue),

    /// Level-tagged proxy used by vectorization layers
    Batched(BatchedValue),
}

impl Value {
    pub fn is_defined(&self) -> bool {
        !matches!(self, Value::Undefined)
    }

    pub fn key_set(&self) -> KeySet {
        match self {
            Value::Undefined => KeySet::EMPTY,
            Value::Plain(t) => t.key_set(),
            Value::Wrapped(w) => w.key_set(),
            Value::Batched(b) => b.key_set(),
        }
    }

    /// Whether the value carries the wrapper key.
    pub fn is_wrapper(&self) -> bool {
        self.key_set().has(DispatchKey::GradWrapper)
    }

    pub fn as_wrapper(&self) -> Option<&WrappedValue> {
        match self {
            Value::Wrapped(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_wrapper_mut(&mut self) -> Option<&mut WrappedValue> {
        match self {
            Value::Wrapped(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_batched(&self) -> Option<&BatchedValue> {
        match self {
            Value::Batched(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_plain(&self) -> Option<&Tensor> {
        match self {
            Value::Plain(t) => Some(t),
            _ => None,
        }
    }

    /// Logical shape as seen by operators at this value's level.
    pub fn shape(&self) -> Dims {
        match self {
            Value::Undefined => Dims::new(),
            Value::Plain(t) => t.shape().iter().copied().collect(),
            Value::Wrapped(w) => w.sizes().iter().copied().collect(),
            Value::Batched(b) => b.logical_shape(),
        }
    }

    pub fn strides(&self) -> Dims {
        match self {
            Value::Undefined => Dims::new(),
            Value::Plain(t) => t.strides().iter().copied().collect(),
            Value::Wrapped(w) => w.strides().iter().copied().collect(),
            Value::Batched(b) => b.logical_strides(),
        }
    }

    /// Element count of the logical shape.
    pub fn numel(&self) -> usize {
        match self {
            Value::Undefined => 0,
            Value::Plain(t) => t.numel(),
            Value::Wrapped(w) => w.numel(),
            Value::Batched(b) => b.logical_shape().iter().product(),
        }
    }

    pub fn is_contiguous(&self) -> bool {
        match self {
            Value::Undefined => true,
            Value::Plain(t) => t.is_contiguous(),
            Value::Wrapped(w) => w.is_contiguous(),
            Value::Batched(b) => tensor::is_contiguous_layout(&b.logical_shape(), &b.logical_strides()),
        }
    }

    pub fn storage_offset(&self) -> usize {
        match self {
            Value::Undefined => 0,
            Value::Plain(t) => t.storage_offset(),
            Value::Wrapped(w) => w.storage_offset(),
            Value::Batched(b) => b.value().storage_offset(),
        }
    }

    pub fn device(&self) -> Option<Device> {
        match self {
            Value::Undefined => None,
            Value::Plain(t) => Some(t.device()),
            Value::Wrapped(w) => w.device(),
            Value::Batched(b) => b.value().device(),
        }
    }

    /// Innermost plain tensor, looking through every proxy.
    pub fn innermost(&self) -> Option<&Tensor> {
        match self {
            Value::Undefined => None,
            Value::Plain(t) => Some(t),
            Value::Wrapped(w) => w.value().innermost(),
            Value::Batched(b) => b.value().innermost(),
        }
    }
}

impl From<Tensor> for Value {
    fn from(t: Tensor) -> Self {
        Value::Plain(t)
    }
}

impl From<WrappedValue> for Value {
    fn from(w: WrappedValue) -> Self {
        Value::Wrapped(w)
    }
}

impl From<BatchedValue> for Value {
    fn from(b: BatchedValue) -> Self {
        Value::Batched(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::diagnostics::dump_value(self, f)
    }
}
