//! Operand Stack
//!
//! Boxed calling convention: callers push arguments, the selected kernel
//! reads the top `arity` entries, and on success replaces them with a single
//! output. A kernel that fails leaves its arguments in place.

use crate::error::{LaminaError, LaminaResult};
use crate::value::Value;

#[derive(Debug)]
pub struct OperandStack {
    values: Vec<Value>,
    max_size: usize,
}

impl OperandStack {
    /// Create new stack with maximum size
    pub fn new(max_size: usize) -> Self {
        OperandStack {
            values: Vec::with_capacity(max_size.min(16)),
            max_size,
        }
    }

    /// Push value onto stack
    pub fn push(&mut self, value: Value) -> LaminaResult<()> {
        if self.values.len() >= self.max_size {
            return Err(LaminaError::OperandOverflow);
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop value from stack
    pub fn pop(&mut self) -> LaminaResult<Value> {
        self.values.pop().ok_or(LaminaError::OperandUnderflow)
    }

    /// Top `n` entries, oldest first
    pub fn args(&self, n: usize) -> LaminaResult<&[Value]> {
        let start = self.values.len().checked_sub(n).ok_or(LaminaError::OperandUnderflow)?;
        Ok(&self.values[start..])
    }

    /// Top `n` entries, oldest first, for in-place rewriting
    pub fn args_mut(&mut self, n: usize) -> LaminaResult<&mut [Value]> {
        let start = self.values.len().checked_sub(n).ok_or(LaminaError::OperandUnderflow)?;
        Ok(&mut self.values[start..])
    }

    /// Replace the top `n` entries with `output`
    pub fn replace_args(&mut self, n: usize, output: Value) -> LaminaResult<()> {
        let start = self.values.len().checked_sub(n).ok_or(LaminaError::OperandUnderflow)?;
        self.values.truncate(start);
        self.values.push(output);
        Ok(())
    }

    /// Room left before overflow
    pub fn remaining(&self) -> usize {
        self.max_size.saturating_sub(self.values.len())
    }

    /// Get current stack size
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
