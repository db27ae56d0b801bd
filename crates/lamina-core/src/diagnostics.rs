//! Diagnostics
//!
//! Renders the proxy nesting of a value, outermost first:
//! `Wrapper[lvl=2, Batched[lvl=1 dim=0, Tensor[4, 3]]]`.

use std::fmt::{self, Write};

use crate::value::Value;

/// Nesting depth rendered by `dump_value` and `Display for Value`; also the
/// default of `LaminaConfig::max_render_depth`.
pub const DEFAULT_RENDER_DEPTH: usize = 256;

/// Render `value` into `out` with the default depth bound. Hosts with a
/// configured bound call `dump_value_bounded`.
pub fn dump_value<W: Write + ?Sized>(value: &Value, out: &mut W) -> fmt::Result {
    dump_value_bounded(value, out, DEFAULT_RENDER_DEPTH)
}

/// Render `value`, printing `...` for anything nested deeper than `max_depth`.
pub fn dump_value_bounded<W: Write + ?Sized>(value: &Value, out: &mut W, max_depth: usize) -> fmt::Result {
    if max_depth == 0 {
        return out.write_str("...");
    }
    match value {
        Value::Undefined => out.write_str("Undefined"),
        Value::Plain(t) => write_dims(out, t.shape()),
        Value::Wrapped(w) => {
            out.write_str("Wrapper[")?;
            match w.level() {
                Some(level) => write!(out, "lvl={}, ", level)?,
                None => out.write_str("dead, ")?,
            }
            dump_value_bounded(w.value(), out, max_depth - 1)?;
            out.write_char(']')
        }
        Value::Batched(b) => {
            write!(out, "Batched[lvl={} dim={}, ", b.level(), b.bdim())?;
            dump_value_bounded(b.value(), out, max_depth - 1)?;
            out.write_char(']')
        }
    }
}

fn write_dims<W: Write + ?Sized>(out: &mut W, dims: &[usize]) -> fmt::Result {
    out.write_str("Tensor[")?;
    for (i, d) in dims.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write!(out, "{}", d)?;
    }
    out.write_char(']')
}

pub fn dump_value_string(value: &Value) -> String {
    let mut s = String::new();
    // Writing into a String cannot fail.
    let _ = dump_value(value, &mut s);
    s
}

/// Print the rendering to stdout and end the line.
pub fn dump_value_stdout(value: &Value) {
    println!("{}", dump_value_string(value));
}
