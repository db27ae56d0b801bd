//! Dispatch Table
//!
//! Explicit registry of kernels keyed by (dispatch key, operator) plus
//! per-key fallbacks. Keys with neither fall through to lower keys.
//! Built as a plain value and handed to a `Dispatcher`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::LaminaResult;
use crate::keys::DispatchKey;

use super::dispatcher::{CallContext, Dispatcher};
use super::operator::Operator;
use super::stack::OperandStack;

/// Boxed kernel: reads its arguments from the top of the stack and, on
/// success, replaces them with one output.
pub type Kernel = Arc<dyn Fn(&Dispatcher, &CallContext, &mut OperandStack) -> LaminaResult<()> + Send + Sync>;

#[derive(Default, Clone)]
pub struct DispatchTable {
    kernels: HashMap<(DispatchKey, Operator), Kernel>,
    fallbacks: HashMap<DispatchKey, Kernel>,
}

impl DispatchTable {
    /// Empty table: every key falls through
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend kernels plus the wrapper handlers.
    pub fn with_defaults() -> Self {
        let mut table = DispatchTable::new();
        super::kernels::register_backend_kernels(&mut table);
        super::fallback::register_wrapper_handlers(&mut table);
        table
    }

    /// Register a kernel for one operator at `key`, replacing any previous one.
    pub fn register_kernel<F>(&mut self, key: DispatchKey, op: Operator, kernel: F)
    where
        F: Fn(&Dispatcher, &CallContext, &mut OperandStack) -> LaminaResult<()> + Send + Sync + 'static,
    {
        self.kernels.insert((key, op), Arc::new(kernel));
    }

    /// Register the handler for every operator at `key` without its own kernel.
    pub fn register_fallback<F>(&mut self, key: DispatchKey, fallback: F)
    where
        F: Fn(&Dispatcher, &CallContext, &mut OperandStack) -> LaminaResult<()> + Send + Sync + 'static,
    {
        self.fallbacks.insert(key, Arc::new(fallback));
    }

    pub fn remove_kernel(&mut self, key: DispatchKey, op: Operator) {
        self.kernels.remove(&(key, op));
    }

    /// Handler for `op` at `key`: the specific kernel, else the key's fallback.
    pub fn lookup(&self, key: DispatchKey, op: Operator) -> Option<&Kernel> {
        self.kernels.get(&(key, op)).or_else(|| self.fallbacks.get(&key))
    }

    pub fn has_kernel(&self, key: DispatchKey, op: Operator) -> bool {
        self.kernels.contains_key(&(key, op))
    }

    pub fn has_fallback(&self, key: DispatchKey) -> bool {
        self.fallbacks.contains_key(&key)
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kernels: Vec<_> = self.kernels.keys().copied().collect();
        kernels.sort_by_key(|(key, op)| (*key, *op as u8));
        let mut fallbacks: Vec<_> = self.fallbacks.keys().copied().collect();
        fallbacks.sort();
        f.debug_struct("DispatchTable")
            .field("kernels", &kernels)
            .field("fallbacks", &fallbacks)
            .finish()
    }
}
