//! CLI Error Handling
//!
//! Prints errors with a colour per reporting category, or as a JSON object
//! when `--json` is given.

use chrono::prelude::*;
use colored::Colorize;
use rebugger_core::{CaptureError, ConfigError};
use rebugger_error::{ErrorMessage, RebugError, Severity};
use rebugger_lang::{ParseError, RuntimeError};
use serde_json::{json, Value};

/// Shared error handler for command line operations
#[derive(Debug, Clone)]
pub struct CliErrorHandler {
    pub verbose: bool,
    pub json: bool,
}

impl CliErrorHandler {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    /// Structured form of the first categorized error in the chain
    fn categorized(error: &anyhow::Error) -> Option<ErrorMessage> {
        error.chain().find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<CaptureError>() {
                Some(e.to_message())
            } else if let Some(e) = cause.downcast_ref::<ParseError>() {
                Some(e.to_message())
            } else if let Some(e) = cause.downcast_ref::<RuntimeError>() {
                Some(e.to_message())
            } else {
                cause.downcast_ref::<ConfigError>().map(|e| e.to_message())
            }
        })
    }

    pub fn handle_error(&self, error: &anyhow::Error) -> Value {
        let message = Self::categorized(error);
        let error_obj = json!({
            "error": error.to_string(),
            "report": message.as_ref().map(ErrorMessage::to_json),
            "timestamp_human": Local::now().to_rfc3339(),
        });

        if self.json {
            println!("{}", error_obj);
            return error_obj;
        }

        match &message {
            Some(report) => {
                let label = format!("{} [{}]", report.category, report.code);
                let label = match report.severity {
                    Severity::Warning => label.yellow().bold(),
                    Severity::Error => label.red().bold(),
                    Severity::Critical => label.magenta().bold(),
                };
                eprintln!("{} {}", label, error);
                if let (true, Some(context)) = (self.verbose, &report.context) {
                    eprintln!("{}", "while evaluating:".dimmed());
                    for line in context.lines() {
                        eprintln!("    {}", line);
                    }
                }
            }
            None => eprintln!("{} {}", "Error:".red().bold(), error),
        }
        if self.verbose {
            for cause in error.chain().skip(1) {
                eprintln!("Caused by: {}", cause);
            }
        }

        error_obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_errors_are_categorized() {
        let err = anyhow::Error::new(CaptureError::StashingFailed).context("stepin failed");
        let report = CliErrorHandler::categorized(&err).unwrap();
        assert_eq!(report.category.to_string(), "reachability");
        assert_eq!(report.severity, Severity::Warning);

        let value = CliErrorHandler::new(false, true).handle_error(&err);
        assert_eq!(value["report"]["code"], 2003);
    }

    #[test]
    fn test_plain_errors_have_no_report() {
        let err = anyhow::anyhow!("no buffer given");
        assert!(CliErrorHandler::categorized(&err).is_none());
        let value = CliErrorHandler::new(false, true).handle_error(&err);
        assert!(value["report"].is_null());
    }
}
