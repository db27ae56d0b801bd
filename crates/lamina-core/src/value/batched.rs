//! Batched proxy
//!
//! Sibling proxy kind produced by vectorization layers. Only its structure
//! lives here; batching rules belong to the vectorization transform.

use crate::error::{LaminaError, LaminaResult};
use crate::keys::{DispatchKey, KeySet, PROPAGATE_TO_WRAPPER};
use crate::level::Level;
use crate::tensor::Dims;

use super::Value;

#[derive(Debug, Clone)]
pub struct BatchedValue {
    value: Box<Value>,
    level: Level,
    bdim: usize,
    keys: KeySet,
}

impl BatchedValue {
    /// Batch `value` along `bdim` for `level`.
    pub fn new(value: Value, level: Level, bdim: usize) -> LaminaResult<Self> {
        if !value.is_defined() {
            return Err(LaminaError::UndefinedValue);
        }
        let rank = value.shape().len();
        if bdim >= rank {
            return Err(LaminaError::BatchDimOutOfRange { dim: bdim, rank });
        }
        let keys = value
            .key_set()
            .intersection(PROPAGATE_TO_WRAPPER)
            .add(DispatchKey::Batched);
        Ok(BatchedValue { value: Box::new(value), level, bdim, keys })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        *self.value
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn bdim(&self) -> usize {
        self.bdim
    }

    pub fn key_set(&self) -> KeySet {
        self.keys
    }

    /// Per-example shape: the inner shape without the batch dimension.
    pub fn logical_shape(&self) -> Dims {
        let mut shape = self.value.shape();
        shape.remove(self.bdim);
        shape
    }

    pub fn logical_strides(&self) -> Dims {
        let mut strides = self.value.strides();
        strides.remove(self.bdim);
        strides
    }
}
