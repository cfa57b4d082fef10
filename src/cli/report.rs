//! One-shot text outputs.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::auth::ServerAddress;
use crate::core::{Job, Usage};

/// Write jobs as a single JSON array.
pub fn write_json<W: Write>(out: &mut W, jobs: &[Job], pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, jobs)?;
        writeln!(out)?;
    } else {
        serde_json::to_writer(&mut *out, jobs)?;
    }
    Ok(())
}

/// Load a job list previously written by [`write_json`].
pub fn read_json(path: &Path) -> Result<Vec<Job>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn write_server<W: Write>(out: &mut W, server: &ServerAddress) -> Result<()> {
    writeln!(out, "{server}")?;
    Ok(())
}

/// One line per host: name, total cores, and a bar with one `|` per core.
pub fn write_usage<W: Write>(out: &mut W, usage: &Usage, color: bool) -> Result<()> {
    for (host, load) in usage.loads() {
        let bar = "|".repeat(load as usize);
        if color {
            writeln!(out, "\x1b[36m{host}\x1b[m \x1b[90m[{load}]\x1b[m \x1b[32m{bar}\x1b[m")?;
        } else {
            writeln!(out, "{host} [{load}] {bar}")?;
        }
    }
    Ok(())
}
