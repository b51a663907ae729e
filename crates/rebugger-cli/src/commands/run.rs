//! `rebug run`: load files and print the last value

use std::path::PathBuf;

use anyhow::Result;
use rebugger_core::RebugConfig;
use rebugger_lang::Value;
use serde_json::json;

use super::{lang_error, Output};

pub fn handle_run_command(config: RebugConfig, files: &[PathBuf], output: &Output) -> Result<()> {
    let mut rebugger = rebugger_core::Rebugger::new(config);
    let mut last = Value::Nothing;
    for file in files {
        last = rebugger.include(file).map_err(lang_error)?;
    }
    output.emit(&json!({ "value": last.repr() }), || println!("{}", last.repr()))
}
