//! Command handlers

pub mod run;
pub mod stepin;
pub mod trace;

pub use run::handle_run_command;
pub use stepin::{handle_stepin_command, StepinRequest};
pub use trace::handle_trace_command;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use rebugger_core::{RebugConfig, Rebugger};
use rebugger_lang::{LangError, Signal};
use serde::Serialize;

/// How results are printed
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Print `data` as JSON, or run `text` to print it for humans
    pub fn emit<T: Serialize>(&self, data: &T, text: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(data)?);
        } else {
            text();
        }
        Ok(())
    }
}

/// Unwrap a language failure into the concrete error type it carries
pub fn lang_error(error: LangError) -> anyhow::Error {
    match error {
        LangError::Parse(e) => e.into(),
        LangError::Signal(Signal::Raised(e)) => (*e).into(),
        LangError::Signal(Signal::Stop) => anyhow!("evaluation was interrupted by a stop signal"),
        LangError::Io { path, message } => anyhow!("could not read {}: {}", path, message),
    }
}

/// Create a session and load `files` as tracked source
pub fn load_session(config: RebugConfig, files: &[PathBuf]) -> Result<Rebugger> {
    let mut rebugger = Rebugger::new(config);
    for file in files {
        rebugger
            .include(file)
            .map_err(lang_error)
            .with_context(|| format!("loading {}", file.display()))?;
    }
    Ok(rebugger)
}
