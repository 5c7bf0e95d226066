//! Generate the Rust codec module for a built-in schema.
//!
//! Usage:
//!   amqp_codegen [OPTIONS]
//!
//! Options:
//!   --envelope        Emit the Hop message envelope module instead of AMQP 0-9-1
//!   --wireformat PATH Module providing the scalar codecs (default crate::wireformat)
//!   --sexp PATH       Module providing Sexp (default crate::sexp)
//!   --out, -o FILE    Write to FILE instead of stdout
//!   --summary         Print the dispatch table instead of source
//!
//! Set RUST_LOG=debug to trace layout planning on stderr.

use amqp_codegen::emit::{self, EmitOptions};
use amqp_codegen::{amqp, compile, ResolvedSchema};
use anyhow::{bail, Context};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn take_flag(args: &mut Vec<String>, names: &[&str]) -> bool {
    match args.iter().position(|a| names.contains(&a.as_str())) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn take_value(args: &mut Vec<String>, names: &[&str]) -> anyhow::Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| names.contains(&a.as_str())) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{} needs a value", args[pos]);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let envelope = take_flag(&mut args, &["--envelope"]);
    let summary = take_flag(&mut args, &["--summary"]);
    let mut options = EmitOptions::default();
    if let Some(path) = take_value(&mut args, &["--wireformat"])? {
        options.wireformat_module = path;
    }
    if let Some(path) = take_value(&mut args, &["--sexp"])? {
        options.sexp_module = path;
    }
    let out = take_value(&mut args, &["--out", "-o"])?.map(PathBuf::from);
    if let Some(unknown) = args.first() {
        bail!("unknown argument {}", unknown);
    }

    let source = if envelope {
        emit::envelope_module(&amqp::hop_messages(), &options)
    } else {
        let resolved = ResolvedSchema::resolve(&amqp::amqp0_9_1()).context("resolving AMQP 0-9-1 schema")?;
        let compiled = compile(&resolved).context("compiling AMQP 0-9-1 schema")?;
        if summary {
            emit::dispatch_summary(&compiled)
        } else {
            emit::rust_module(&compiled, &options)
        }
    };

    match out {
        Some(path) => {
            emit::write_file(&path, &source).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("{}: {} bytes", path.display(), source.len());
        }
        None => std::io::stdout().write_all(source.as_bytes())?,
    }
    Ok(())
}
