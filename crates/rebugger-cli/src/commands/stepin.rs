//! `rebug stepin`: capture a marked call and print its replay block

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use rebugger_core::RebugConfig;
use serde::Serialize;

use super::{load_session, Output};

#[derive(Debug, Clone, Default)]
pub struct StepinRequest {
    pub files: Vec<PathBuf>,
    pub buffer: Option<String>,
    pub buffer_file: Option<PathBuf>,
    pub point: Option<usize>,
    pub at: Option<String>,
}

impl StepinRequest {
    /// Buffer text and the byte offset of the marked call
    fn resolve(&self) -> Result<(String, usize)> {
        let buffer = match (&self.buffer, &self.buffer_file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => {
                std::fs::read_to_string(path).with_context(|| format!("reading buffer {}", path.display()))?
            }
            (None, None) => return Err(anyhow!("either --buffer or --buffer-file is required")),
        };
        let point = match (self.point, &self.at) {
            (Some(point), _) => point,
            (None, Some(needle)) => {
                buffer.find(needle.as_str()).ok_or_else(|| anyhow!("`{}` does not occur in the buffer", needle))?
            }
            (None, None) => 0,
        };
        Ok((buffer, point))
    }
}

#[derive(Debug, Serialize)]
struct StepinReport {
    id: String,
    header: String,
    block: String,
}

pub fn handle_stepin_command(config: RebugConfig, request: StepinRequest, output: &Output) -> Result<()> {
    let (buffer, point) = request.resolve()?;
    let mut rebugger = load_session(config, &request.files)?;
    let step = rebugger.stepin(&buffer, point).context("stepping into the marked call")?;

    let report = StepinReport { id: step.id.to_string(), header: step.header.clone(), block: step.block.clone() };
    output.emit(&report, || {
        let mut lines = step.header.lines();
        if let Some(first) = lines.next() {
            println!("{}", first.bold());
        }
        for line in lines {
            println!("{}", line.blue());
        }
        println!();
        println!("{}", step.block);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_marks_first_occurrence() {
        let request = StepinRequest {
            buffer: Some("y = add(1, add(2, 3))".to_string()),
            at: Some("add".to_string()),
            ..Default::default()
        };
        assert_eq!(request.resolve().unwrap().1, 4);
    }

    #[test]
    fn test_resolve_reads_buffer_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "f(1)").unwrap();
        let request = StepinRequest { buffer_file: Some(file.path().to_path_buf()), point: Some(0), ..Default::default() };
        assert_eq!(request.resolve().unwrap(), ("f(1)".to_string(), 0));
    }

    #[test]
    fn test_resolve_requires_a_buffer() {
        assert!(StepinRequest::default().resolve().is_err());
    }

    #[test]
    fn test_stepin_end_to_end() {
        let mut file = tempfile::Builder::new().suffix(".rb").tempfile().unwrap();
        write!(file, "function add(x, y)\n    x + y\nend\n").unwrap();
        let request = StepinRequest {
            files: vec![file.path().to_path_buf()],
            buffer: Some("add(2, 3)".to_string()),
            point: Some(0),
            ..Default::default()
        };
        handle_stepin_command(RebugConfig::default(), request, &Output { json: true }).unwrap();
    }
}
