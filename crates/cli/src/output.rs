use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::cli::{OutputFormat, WriteFlags};

/// Serialize a resource in the requested format. JSON uses four-space
/// indentation to match what kubectl-style tooling prints.
pub fn write_resource<W: Write + ?Sized, R: Serialize>(out: &mut W, format: OutputFormat, resource: &R) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let mut buf = Vec::new();
            let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
            resource.serialize(&mut ser)?;
            out.write_all(&buf)?;
            writeln!(out)?;
        }
        OutputFormat::Yaml => {
            out.write_all(serde_yaml::to_string(resource)?.as_bytes())?;
        }
    }
    Ok(())
}

pub fn write_message<W: Write + ?Sized>(out: &mut W, message: &str, dry_run: bool) -> Result<()> {
    if dry_run {
        writeln!(out, "{} (dry run)", message)?;
    } else {
        writeln!(out, "{}", message)?;
    }
    Ok(())
}

/// `--output` wins over the plain success message.
pub fn report<W: Write + ?Sized, R: Serialize>(out: &mut W, write: &WriteFlags, resource: &R, message: &str) -> Result<()> {
    match write.output {
        Some(format) => write_resource(out, format, resource),
        None => write_message(out, message, write.dry_run),
    }
}
