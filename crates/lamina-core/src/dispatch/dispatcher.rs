//! Dispatcher
//!
//! Resolves each operator call to one handler: the highest-priority key in
//! the arguments' key sets (adjusted by the call's local keys) that has a
//! kernel or a fallback registered. Handlers may redispatch by calling
//! `call_boxed` again on the same stack.

use log::{trace, warn};
use parking_lot::Mutex;

use crate::config::LaminaConfig;
use crate::error::{LaminaError, LaminaResult};
use crate::keys::{DispatchKey, KeySet};
use crate::level::Level;
use crate::value::Value;

use super::operator::Operator;
use super::stack::OperandStack;
use super::table::DispatchTable;

/// Keys forced on or off for one call, on top of the arguments' own keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalKeys {
    pub included: KeySet,
    pub excluded: KeySet,
}

impl LocalKeys {
    #[must_use]
    pub fn include(self, key: DispatchKey) -> Self {
        LocalKeys { included: self.included.add(key), ..self }
    }

    #[must_use]
    pub fn exclude(self, key: DispatchKey) -> Self {
        LocalKeys { excluded: self.excluded.add(key), ..self }
    }
}

/// What a handler knows about the call that selected it.
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    pub op: Operator,
    /// Key the handler was selected at
    pub key: DispatchKey,
    pub local: LocalKeys,
}

impl CallContext {
    /// Local keys that skip the current handler's key on redispatch.
    pub fn below(&self) -> LocalKeys {
        self.local.exclude(self.key)
    }
}

/// Why a mutation was not carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Both sides are wrappers but report different levels
    LevelMismatch { dst: Option<Level>, src: Option<Level> },
    /// One side is not a wrapper
    NotAWrapper,
}

/// Observable side effects of dispatch, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// Dead wrappers were replaced by their inner values before redispatch
    DeadWrappersUnwrapped { op: &'static str, count: usize },
    /// An in-place mutation could not be preserved and was skipped
    MutationDropped { op: &'static str, reason: DropReason },
}

#[derive(Debug)]
pub struct Dispatcher {
    table: DispatchTable,
    config: LaminaConfig,
    events: Mutex<Vec<DispatchEvent>>,
}

impl Dispatcher {
    pub fn new(table: DispatchTable, config: LaminaConfig) -> Self {
        Dispatcher { table, config, events: Mutex::new(Vec::new()) }
    }

    /// Dispatcher over `DispatchTable::with_defaults()`.
    pub fn with_defaults(config: LaminaConfig) -> Self {
        Self::new(DispatchTable::with_defaults(), config)
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    pub fn config(&self) -> &LaminaConfig {
        &self.config
    }

    /// Call `op` on `args` with no local keys.
    pub fn call(&self, op: Operator, args: Vec<Value>) -> LaminaResult<Value> {
        self.call_with(op, args, LocalKeys::default())
    }

    pub fn call_with(&self, op: Operator, args: Vec<Value>, local: LocalKeys) -> LaminaResult<Value> {
        if args.len() != op.arity() {
            return Err(LaminaError::ArityMismatch {
                op: op.name(),
                expected: op.arity(),
                actual: args.len(),
            });
        }
        let mut stack = OperandStack::new(self.config.max_operand_stack);
        for arg in args {
            stack.push(arg)?;
        }
        self.call_boxed(op, &mut stack, local)?;
        stack.pop()
    }

    /// Dispatch `op` on the top `op.arity()` entries of `stack`.
    pub fn call_boxed(&self, op: Operator, stack: &mut OperandStack, local: LocalKeys) -> LaminaResult<()> {
        let keys = stack
            .args(op.arity())?
            .iter()
            .fold(KeySet::EMPTY, |keys, arg| keys.union(arg.key_set()))
            .union(local.included)
            .difference(local.excluded);

        for key in keys.iter() {
            if let Some(kernel) = self.table.lookup(key, op) {
                trace!("dispatch {} at {:?} (keys {:?})", op.name(), key, keys);
                let ctx = CallContext { op, key, local };
                return kernel(self, &ctx, stack);
            }
        }
        Err(LaminaError::NoKernel { op: op.name(), key: keys.highest() })
    }

    pub(crate) fn record(&self, event: DispatchEvent) {
        if let DispatchEvent::MutationDropped { op, reason } = &event {
            warn!(
                "`{}` mutated its inputs across transform levels ({:?}); the mutation was not preserved \
                 and the inputs are left unchanged",
                op, reason
            );
        }
        self.events.lock().push(event);
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&self) -> Vec<DispatchEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}
