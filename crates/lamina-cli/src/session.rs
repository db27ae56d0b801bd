//! Script execution
//!
//! A session owns one dispatcher, one layer stack and the named values bound
//! by the script. Output lines are collected so callers decide where they go.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use log::info;

use lamina_core::{dump_value_bounded, BatchedValue, Dispatcher, LaminaConfig, Level, Tensor, Value};
use lamina_stack::LayerStack;

use crate::script::{Command, Line};

pub struct Session {
    dispatcher: Dispatcher,
    layers: LayerStack,
    values: HashMap<String, Value>,
    output: Vec<String>,
}

impl Session {
    pub fn new(config: LaminaConfig) -> Self {
        let layers = LayerStack::new(&config);
        Session {
            dispatcher: Dispatcher::with_defaults(config),
            layers,
            values: HashMap::new(),
            output: Vec::new(),
        }
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Take the output produced so far.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn lookup(&self, name: &str) -> Result<&Value> {
        self.values.get(name).ok_or_else(|| anyhow!("no value named `{}`", name))
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn run(&mut self, lines: &[Line]) -> Result<()> {
        for line in lines {
            self.execute(&line.command).with_context(|| format!("line {}", line.number))?;
        }
        Ok(())
    }

    pub fn execute(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::Push(kind) => {
                let level = self.layers.push(*kind)?;
                info!("entered {} at level {}", kind.name(), level);
            }
            Command::Pop => {
                let layer = self.layers.pop()?;
                info!("left {} at level {}", layer.kind().name(), layer.level());
            }
            Command::Tensor { name, shape, fill, device } => {
                self.bind(name, Tensor::full(shape, *fill)?.to_device(*device).into());
            }
            Command::Wrap { name, src, level } => {
                let value = self.lookup(src)?.clone();
                let wrapped = self.layers.wrap(value, Level(*level))?;
                self.bind(name, wrapped.into());
            }
            Command::Detach { name, src } => {
                let wrapper = self
                    .lookup(src)?
                    .as_wrapper()
                    .ok_or_else(|| anyhow!("`{}` is not a wrapper", src))?;
                let copy = wrapper.shallow_copy_and_detach(wrapper.version(), wrapper.allows_metadata_change());
                self.bind(name, copy.into());
            }
            Command::Unwrap { name, src } => {
                let inner = match self.lookup(src)? {
                    Value::Wrapped(w) => w.value().clone(),
                    Value::Batched(b) => b.value().clone(),
                    _ => return Err(anyhow!("`{}` is not a proxy", src)),
                };
                self.bind(name, inner);
            }
            Command::Batch { name, src, level, dim } => {
                let value = self.lookup(src)?.clone();
                let batched = BatchedValue::new(value, Level(*level), *dim)?;
                self.bind(name, batched.into());
            }
            Command::Op { name, op, args } => {
                let values = args
                    .iter()
                    .map(|a| self.lookup(a).cloned())
                    .collect::<Result<Vec<_>>>()?;
                let out = self.dispatcher.call(*op, values)?;
                // In-place operators also rebind their destination.
                if op.is_mutating() {
                    if let Some(dst) = args.first() {
                        self.bind(dst, out.clone());
                    }
                }
                self.bind(name, out);
            }
            Command::Dump(name) => {
                let mut line = format!("{} = ", name);
                let depth = self.dispatcher.config().max_render_depth;
                dump_value_bounded(self.lookup(name)?, &mut line, depth)?;
                self.output.push(line);
            }
            Command::Events => {
                for event in self.dispatcher.drain_events() {
                    self.output.push(format!("{:?}", event));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse;
    use lamina_core::{Device, LaminaError};

    fn run(text: &str) -> (Session, Result<()>) {
        let mut session = Session::new(LaminaConfig::new());
        let result = parse(text).and_then(|lines| session.run(&lines));
        (session, result)
    }

    #[test]
    fn escaped_wrapper_decays_after_pop() {
        let (mut session, result) = run(
            "push grad\n\
             tensor x 2 3\n\
             wrap w x 1\n\
             pop\n\
             op y add w x\n\
             dump w\n\
             dump y\n",
        );
        result.unwrap();
        assert_eq!(session.take_output(), vec!["w = Wrapper[dead, Tensor[2]]", "y = Tensor[2]"]);
        assert_eq!(session.value("y").unwrap().as_plain().unwrap().data(), &[6.0, 6.0]);
        assert_eq!(session.layers().depth(), 0);
    }

    #[test]
    fn cross_level_copy_reports_one_event() {
        let (mut session, result) = run(
            "push grad\n\
             push grad\n\
             tensor x 1 0\n\
             wrap a x 1\n\
             wrap b x 2\n\
             op r copy_ b a\n\
             events\n",
        );
        result.unwrap();
        let output = session.take_output();
        assert_eq!(output.len(), 1);
        assert!(output[0].starts_with("MutationDropped"));
    }

    #[test]
    fn live_wrapper_without_transform_is_internal() {
        let (_, result) = run(
            "push grad\n\
             tensor x 1 1\n\
             wrap w x 1\n\
             op y neg w\n",
        );
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "line 4");
        let cause = err.downcast_ref::<LaminaError>().unwrap();
        assert!(cause.is_internal());
    }

    #[test]
    fn oversized_tensor_is_an_ordinary_error() {
        let mut session = Session::new(LaminaConfig::new());
        let command = Command::Tensor {
            name: "x".into(),
            shape: vec![1 << 32, 1 << 32],
            fill: 0.0,
            device: Device::Cpu,
        };
        let err = session.execute(&command).unwrap_err();
        let cause = err.downcast_ref::<LaminaError>().unwrap();
        assert!(matches!(cause, LaminaError::ShapeOverflow(_)));
        assert!(!cause.is_internal());
        assert!(session.value("x").is_none());
    }

    #[test]
    fn unknown_names_are_reported() {
        let (_, result) = run("dump nothing");
        assert!(format!("{:#}", result.unwrap_err()).contains("no value named `nothing`"));
    }
}
