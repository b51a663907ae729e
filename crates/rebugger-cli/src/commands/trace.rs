//! `rebug trace`: snapshot every frame of a failing command

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use rebugger_core::RebugConfig;
use serde::Serialize;

use super::{load_session, Output};

#[derive(Debug, Serialize)]
struct FrameReport {
    frame: String,
    method: Option<String>,
    /// `path:first-last` of the definition
    location: Option<String>,
    snapshot: Option<String>,
    block: Option<String>,
}

#[derive(Debug, Serialize)]
struct TraceReport {
    error: String,
    frames: Vec<FrameReport>,
}

pub fn handle_trace_command(
    config: RebugConfig,
    files: &[PathBuf],
    module: &str,
    command: &str,
    output: &Output,
) -> Result<()> {
    let mut rebugger = load_session(config, files)?;
    let trace = rebugger.capture_stacktrace(module, command).context("capturing the stacktrace")?;

    let mut frames = Vec::with_capacity(trace.len());
    for captured in &trace.frames {
        let block = captured.snapshot.map(|id| rebugger.render(id)).transpose()?;
        frames.push(FrameReport {
            frame: captured.frame.to_string(),
            method: captured.definition.as_ref().map(|d| d.method.to_string()),
            location: captured.definition.as_ref().map(|d| {
                let (first, last) = d.linerange();
                format!("{}:{}-{}", d.path.display(), first, last)
            }),
            snapshot: captured.snapshot.map(|id| id.to_string()),
            block,
        });
    }
    let report = TraceReport { error: trace.error.error.to_string(), frames };

    output.emit(&report, || {
        println!("{} {}", "ERROR:".red().bold(), report.error);
        print!("{}", trace.listing());
        for (i, frame) in report.frames.iter().enumerate() {
            if let Some(block) = &frame.block {
                println!();
                println!("{}", format!("[{}] {}", i + 1, frame.frame).bold());
                println!("{}", block);
            }
        }
    })
}
