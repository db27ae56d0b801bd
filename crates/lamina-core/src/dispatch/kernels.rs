//! Backend kernels
//!
//! Reference kernels for plain tensors, registered at every backend key.
//! They only accept `Value::Plain` arguments; anything still wrapped at this
//! point is a routing error.

use crate::error::{LaminaError, LaminaResult};
use crate::keys::DispatchKey;
use crate::tensor::Tensor;
use crate::value::Value;

use super::dispatcher::{CallContext, Dispatcher};
use super::operator::Operator;
use super::stack::OperandStack;
use super::table::DispatchTable;

fn plain<'a>(op: Operator, value: &'a Value) -> LaminaResult<&'a Tensor> {
    value.as_plain().ok_or(LaminaError::TypeMismatch { op: op.name(), expected: "plain tensor arguments" })
}

fn binary(
    f: fn(&Tensor, &Tensor) -> LaminaResult<Tensor>,
) -> impl Fn(&Dispatcher, &CallContext, &mut OperandStack) -> LaminaResult<()> + Send + Sync + 'static {
    move |_: &Dispatcher, ctx: &CallContext, stack: &mut OperandStack| {
        let out = {
            let args = stack.args(2)?;
            f(plain(ctx.op, &args[0])?, plain(ctx.op, &args[1])?)?
        };
        stack.replace_args(2, out.into())
    }
}

fn unary(
    f: fn(&Tensor) -> Tensor,
) -> impl Fn(&Dispatcher, &CallContext, &mut OperandStack) -> LaminaResult<()> + Send + Sync + 'static {
    move |_: &Dispatcher, ctx: &CallContext, stack: &mut OperandStack| {
        let out = f(plain(ctx.op, &stack.args(1)?[0])?);
        stack.replace_args(1, out.into())
    }
}

fn copy_in_place(_: &Dispatcher, ctx: &CallContext, stack: &mut OperandStack) -> LaminaResult<()> {
    let args = stack.args_mut(2)?;
    let (dst, src) = args.split_at_mut(1);
    let src = plain(ctx.op, &src[0])?;
    match &mut dst[0] {
        Value::Plain(dst) => dst.copy_from(src)?,
        _ => {
            return Err(LaminaError::TypeMismatch { op: ctx.op.name(), expected: "plain tensor arguments" })
        }
    }
    // The destination stays on the stack as the output.
    stack.pop().map(drop)
}

/// Register the reference kernels for every operator at every backend key.
pub fn register_backend_kernels(table: &mut DispatchTable) {
    for key in DispatchKey::ALL.into_iter().filter(|k| k.is_backend()) {
        table.register_kernel(key, Operator::Add, binary(Tensor::add));
        table.register_kernel(key, Operator::Sub, binary(Tensor::sub));
        table.register_kernel(key, Operator::Mul, binary(Tensor::mul));
        table.register_kernel(key, Operator::Neg, unary(Tensor::neg));
        table.register_kernel(key, Operator::Sum, unary(Tensor::sum));
        table.register_kernel(key, Operator::Clone, unary(Tensor::clone));
        table.register_kernel(key, Operator::CopyInPlace, copy_in_place);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LaminaConfig;
    use crate::level::Level;
    use crate::tensor::Device;
    use crate::value::{Liveness, WrappedValue};

    fn backend_only() -> Dispatcher {
        let mut table = DispatchTable::new();
        register_backend_kernels(&mut table);
        Dispatcher::new(table, LaminaConfig::new())
    }

    fn vector(xs: &[f64]) -> Value {
        Tensor::from_vec(xs.to_vec(), &[xs.len()]).unwrap().into()
    }

    #[test]
    fn arithmetic_and_reduction() {
        let d = backend_only();
        let prod = d.call(Operator::Mul, vec![vector(&[1.0, 2.0]), vector(&[3.0, 4.0])]).unwrap();
        assert_eq!(prod.as_plain().unwrap().data(), &[3.0, 8.0]);
        let total = d.call(Operator::Sum, vec![prod]).unwrap();
        assert_eq!(total.shape().len(), 0);
        assert_eq!(total.as_plain().unwrap().data(), &[11.0]);
    }

    #[test]
    fn every_backend_runs_the_reference_kernels() {
        let d = backend_only();
        for device in [Device::Cpu, Device::Cuda, Device::Xla] {
            let x: Value = Tensor::scalar(2.0).to_device(device).into();
            let out = d.call(Operator::Neg, vec![x]).unwrap();
            assert_eq!(out.as_plain().unwrap().data(), &[-2.0]);
            assert_eq!(out.device(), Some(device));
        }
    }

    #[test]
    fn copy_writes_destination() {
        let d = backend_only();
        let out = d.call(Operator::CopyInPlace, vec![vector(&[0.0, 0.0]), vector(&[5.0, 6.0])]).unwrap();
        assert_eq!(out.as_plain().unwrap().data(), &[5.0, 6.0]);
    }

    #[test]
    fn failed_kernel_leaves_arguments() {
        let d = backend_only();
        let mut stack = OperandStack::new(4);
        stack.push(vector(&[0.0, 0.0])).unwrap();
        stack.push(vector(&[1.0])).unwrap();
        let err = d.call_boxed(Operator::CopyInPlace, &mut stack, Default::default()).unwrap_err();
        assert!(matches!(err, LaminaError::ShapeMismatch { .. }));
        assert_eq!(stack.size(), 2);
        assert_eq!(stack.args(2).unwrap()[0].as_plain().unwrap().data(), &[0.0, 0.0]);
    }

    #[test]
    fn wrapper_reaching_backend_is_a_type_error() {
        let d = backend_only();
        let w = WrappedValue::new(vector(&[1.0]), Level(1), Liveness::Detached(true)).unwrap();
        let err = d.call(Operator::Neg, vec![w.into()]).unwrap_err();
        assert_eq!(err, LaminaError::TypeMismatch { op: "neg", expected: "plain tensor arguments" });
    }
}
