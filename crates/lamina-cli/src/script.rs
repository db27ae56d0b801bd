//! Scenario scripts
//!
//! One command per line; `#` starts a comment. Names refer to values bound
//! by earlier lines.

use anyhow::{anyhow, bail, Context, Result};

use lamina_core::tensor::checked_numel;
use lamina_core::{Device, Operator};
use lamina_stack::TransformKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Push(TransformKind),
    Pop,
    Tensor { name: String, shape: Vec<usize>, fill: f64, device: Device },
    Wrap { name: String, src: String, level: u32 },
    Detach { name: String, src: String },
    Unwrap { name: String, src: String },
    Batch { name: String, src: String, level: u32, dim: usize },
    Op { name: String, op: Operator, args: Vec<String> },
    Dump(String),
    Events,
}

/// A parsed command and the 1-based line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: usize,
    pub command: Command,
}

fn parse_shape(text: &str) -> Result<Vec<usize>> {
    if text == "scalar" {
        return Ok(Vec::new());
    }
    let shape = text
        .split('x')
        .map(|d| d.parse::<usize>().with_context(|| format!("bad dimension `{}`", d)))
        .collect::<Result<Vec<_>>>()?;
    checked_numel(&shape)?;
    Ok(shape)
}

fn parse_device(text: &str) -> Result<Device> {
    match text {
        "cpu" => Ok(Device::Cpu),
        "cuda" => Ok(Device::Cuda),
        "xla" => Ok(Device::Xla),
        other => bail!("unknown device `{}`", other),
    }
}

fn arg<'a>(words: &[&'a str], i: usize, what: &str) -> Result<&'a str> {
    words.get(i).copied().ok_or_else(|| anyhow!("missing {}", what))
}

fn parse_command(words: &[&str]) -> Result<Command> {
    let name = || arg(words, 1, "name").map(str::to_string);
    let src = || arg(words, 2, "source").map(str::to_string);
    let command = match words[0] {
        "push" => {
            let kind = arg(words, 1, "transform")?;
            Command::Push(TransformKind::from_name(kind).ok_or_else(|| anyhow!("unknown transform `{}`", kind))?)
        }
        "pop" => Command::Pop,
        "tensor" => Command::Tensor {
            name: name()?,
            shape: parse_shape(arg(words, 2, "shape")?)?,
            fill: arg(words, 3, "fill")?.parse().context("bad fill value")?,
            device: words.get(4).map_or(Ok(Device::Cpu), |d| parse_device(d))?,
        },
        "wrap" => Command::Wrap {
            name: name()?,
            src: src()?,
            level: arg(words, 3, "level")?.parse().context("bad level")?,
        },
        "detach" => Command::Detach { name: name()?, src: src()? },
        "unwrap" => Command::Unwrap { name: name()?, src: src()? },
        "batch" => Command::Batch {
            name: name()?,
            src: src()?,
            level: arg(words, 3, "level")?.parse().context("bad level")?,
            dim: arg(words, 4, "dim")?.parse().context("bad dim")?,
        },
        "op" => {
            let op = arg(words, 2, "operator")?;
            Command::Op {
                name: name()?,
                op: Operator::from_name(op).ok_or_else(|| anyhow!("unknown operator `{}`", op))?,
                args: words[3..].iter().map(|s| s.to_string()).collect(),
            }
        }
        "dump" => Command::Dump(name()?),
        "events" => Command::Events,
        other => bail!("unknown command `{}`", other),
    };
    Ok(command)
}

pub fn parse(text: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let content = raw.split('#').next().unwrap_or("");
        let words: Vec<&str> = content.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        let command = parse_command(&words).with_context(|| format!("line {}", i + 1))?;
        lines.push(Line { number: i + 1, command });
    }
    Ok(lines)
}
