//! Wrapper handlers
//!
//! Two handlers sit at `DispatchKey::GradWrapper`, below transform-specific
//! kernels and above the backends:
//!
//! - a fallback for every operator that unwraps *dead* wrappers among the
//!   call's own arguments and redispatches. Live wrappers belong to transform
//!   logic registered at higher keys and are left alone.
//! - a kernel for `copy_`, the one mutating operator a wrapper must
//!   understand. Same-level wrappers copy their inner values in place; any
//!   other combination drops the mutation with a warning.

use log::debug;

use crate::error::{LaminaError, LaminaResult};
use crate::keys::DispatchKey;
use crate::value::Value;

use super::dispatcher::{CallContext, DispatchEvent, Dispatcher, DropReason};
use super::operator::Operator;
use super::stack::OperandStack;
use super::table::DispatchTable;

/// Register both wrapper handlers at `DispatchKey::GradWrapper`.
pub fn register_wrapper_handlers(table: &mut DispatchTable) {
    table.register_fallback(DispatchKey::GradWrapper, dead_wrapper_fallback);
    table.register_kernel(DispatchKey::GradWrapper, Operator::CopyInPlace, copy_wrapper);
}

/// Replace every dead wrapper argument by its inner value, then redispatch.
///
/// Only reachable when at least one argument is a dead wrapper; reaching it
/// with none means no transform claimed a live wrapper.
pub fn dead_wrapper_fallback(dispatcher: &Dispatcher, ctx: &CallContext, stack: &mut OperandStack) -> LaminaResult<()> {
    let op = ctx.op;
    let args = stack.args_mut(op.arity())?;

    let mut dead = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if !arg.is_wrapper() {
            continue;
        }
        let wrapper = arg.as_wrapper().ok_or(LaminaError::MissingWrapperKey)?;
        if !wrapper.is_alive() {
            dead.push(i);
        }
    }
    if dead.is_empty() {
        return Err(LaminaError::NoDeadWrapper { op: op.name() });
    }

    for &i in &dead {
        if let Value::Wrapped(wrapper) = std::mem::replace(&mut args[i], Value::Undefined) {
            args[i] = wrapper.into_value();
        }
    }
    debug!("`{}`: unwrapped {} dead wrapper(s)", op.name(), dead.len());
    dispatcher.record(DispatchEvent::DeadWrappersUnwrapped { op: op.name(), count: dead.len() });

    dispatcher.call_boxed(op, stack, ctx.local)
}

/// In-place copy between wrappers of the same level.
///
/// Mismatched levels, or a side that is not a wrapper, cannot be expressed
/// across layers: the destination is returned untouched and a warning is
/// recorded.
pub fn copy_wrapper(dispatcher: &Dispatcher, ctx: &CallContext, stack: &mut OperandStack) -> LaminaResult<()> {
    let op = ctx.op;
    let src_inner = {
        let args = stack.args(2)?;
        match (args[0].as_wrapper(), args[1].as_wrapper()) {
            (Some(dst), Some(src)) if dst.level() == src.level() => Some(src.value().clone()),
            (Some(dst), Some(src)) => {
                let reason = DropReason::LevelMismatch { dst: dst.level(), src: src.level() };
                dispatcher.record(DispatchEvent::MutationDropped { op: op.name(), reason });
                None
            }
            _ => {
                dispatcher.record(DispatchEvent::MutationDropped {
                    op: op.name(),
                    reason: DropReason::NotAWrapper,
                });
                None
            }
        }
    };
    let Some(src_inner) = src_inner else {
        return stack.pop().map(drop);
    };

    // Checked before the destination's value is taken: a failed push would
    // lose it.
    let mut inner = OperandStack::new(dispatcher.config().max_operand_stack);
    if inner.remaining() < 2 {
        return Err(LaminaError::OperandOverflow);
    }

    let dst = stack.args_mut(2)?[0].as_wrapper_mut().ok_or(LaminaError::MissingWrapperKey)?;
    inner.push(dst.take_value())?;
    inner.push(src_inner)?;
    let result = dispatcher.call_boxed(op, &mut inner, ctx.local);

    // Success leaves the updated destination; failure leaves both arguments
    // with the untouched destination first.
    let restored = inner.into_values().swap_remove(0);
    dst.restore_value(restored, result.is_ok());
    result?;

    stack.pop().map(drop)
}
