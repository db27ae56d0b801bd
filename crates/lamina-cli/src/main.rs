//! Lamina - CLI
//!
//! Runs scenario scripts against a fresh dispatcher and layer stack.
//!
//! Exit status: 0 on success, 1 on a script or usage error, 2 when the
//! runtime reports an internal invariant violation.

mod script;
mod session;

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use lamina_core::{LaminaConfig, LaminaError};

use crate::session::Session;

#[derive(Parser, Debug)]
#[command(name = "lamina", version, about = "Run a layered value-interception scenario script")]
struct Cli {
    /// Scenario script to execute
    script: PathBuf,

    /// Only parse the script
    #[arg(long)]
    check: bool,

    /// Write the layer push/pop audit log to this file when done
    #[arg(long, value_name = "PATH")]
    audit: Option<PathBuf>,

    /// Log dispatch decisions (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let text = fs::read_to_string(&cli.script)
        .with_context(|| format!("failed to read {}", cli.script.display()))?;
    let lines = script::parse(&text)?;
    if cli.check {
        println!("{}: {} command(s)", cli.script.display(), lines.len());
        return Ok(());
    }

    let mut session = Session::new(LaminaConfig::new());
    let result = session.run(&lines);
    for line in session.take_output() {
        println!("{}", line);
    }
    if let Some(path) = &cli.audit {
        session
            .layers()
            .audit_log()
            .persist(path)
            .with_context(|| format!("failed to write audit log to {}", path.display()))?;
    }
    result
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {:#}", err);
        let internal = err
            .downcast_ref::<LaminaError>()
            .map_or(false, LaminaError::is_internal);
        process::exit(if internal { 2 } else { 1 });
    }
}
