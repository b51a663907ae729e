//! Replay rendering: turn a snapshot into an editable block
//!
//! ```text
//! @eval Main let (x, y) = Rebugger.getstored("<uuid>")
//!     x + y
//! end
//! ```
//!
//! The block evaluates in the method's own module, binds every parameter in a
//! fresh `let` scope to freshly copied stored values and then runs the
//! method's body as it appears in the source file.

use rebugger_lang::MethodDef;

use crate::capability::Definition;
use crate::config::RenderConfig;
use crate::natives::GET_STORED;
use crate::store::Snapshot;

#[derive(Debug, Clone)]
pub struct Renderer {
    store_module: String,
    indent: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl Renderer {
    pub fn new(store_module: impl Into<String>, indent: usize) -> Self {
        Self { store_module: store_module.into(), indent }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.store_module.clone(), config.indent)
    }

    /// Rebinding block for `snapshot` around the body of `definition`
    pub fn render(&self, snapshot: &Snapshot, definition: &Definition) -> String {
        let pattern = match snapshot.names.as_slice() {
            [only] => format!("({},)", only),
            names => format!("({})", names.join(", ")),
        };
        let pad = " ".repeat(self.indent);
        let body = body_lines(definition);
        let mut out = format!(
            "@eval {} let {} = {}.{}(\"{}\")\n",
            definition.method.module, pattern, self.store_module, GET_STORED, snapshot.id
        );
        if body.is_empty() {
            out.push_str(&pad);
            out.push_str("nothing\n");
        }
        for line in body {
            if !line.is_empty() {
                out.push_str(&pad);
                out.push_str(&line);
            }
            out.push('\n');
        }
        out.push_str("end");
        out
    }

    /// `name(sig) in Module at path:line` followed by one line per binding
    pub fn header(&self, snapshot: &Snapshot, method: &MethodDef) -> String {
        let mut out = method.to_string();
        for (name, value) in snapshot.bindings() {
            out.push_str(&format!("\n  {} = {}", name, value.repr()));
        }
        out
    }
}

/// Whole source lines spanned by the body, with common indentation removed
fn body_lines(definition: &Definition) -> Vec<String> {
    let span = definition.method.def.body_span;
    let source: &str = &definition.source;
    if span.start >= span.end || span.end > source.len() {
        return Vec::new();
    }
    // Widen to whole lines unless other code shares them (`function f(x) x end`)
    let line_start = source[..span.start].rfind('\n').map_or(0, |i| i + 1);
    let start = if source[line_start..span.start].trim().is_empty() { line_start } else { span.start };
    let line_end = source[span.end..].find('\n').map_or(source.len(), |i| span.end + i);
    let end = if source[span.end..line_end].trim().is_empty() { line_end } else { span.end };
    let lines: Vec<&str> = source[start..end].lines().map(str::trim_end).collect();

    let common = common_indent(&lines);
    lines
        .iter()
        .map(|l| if l.trim().is_empty() { String::new() } else { l[common.len()..].to_string() })
        .collect()
}

/// Longest leading whitespace shared by every non-blank line
fn common_indent<'a>(lines: &[&'a str]) -> &'a str {
    let mut indents = lines
        .iter()
        .copied()
        .filter(|l| !l.trim().is_empty())
        .map(|l| &l[..l.len() - l.trim_start().len()]);
    let Some(mut common) = indents.next() else {
        return "";
    };
    for indent in indents {
        let shared = common
            .char_indices()
            .zip(indent.chars())
            .find(|((_, a), b)| a != b)
            .map_or(common.len().min(indent.len()), |((i, _), _)| i);
        common = &common[..shared];
    }
    common
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{SourceLookup, TrackedSources};
    use rebugger_lang::{Interpreter, Value};
    use uuid::Uuid;

    fn definition(source: &str, name: &str) -> Definition {
        let mut interp = Interpreter::new();
        interp.include_str("demo.rb", source).unwrap();
        let method = interp.methods_of("Main", name)[0].clone();
        TrackedSources.definition(&method).unwrap()
    }

    fn snapshot(def: &Definition, names: &[&str], values: Vec<Value>) -> Snapshot {
        Snapshot {
            id: Uuid::nil(),
            method: def.method.id,
            function: def.method.name.clone(),
            module: def.method.module.clone(),
            depth: 1,
            names: names.iter().map(|n| n.to_string()).collect(),
            values,
        }
    }

    #[test]
    fn test_render_reindents_body() {
        let def = definition("function add(x, y)\n        s = x + y\n        s\nend\n", "add");
        let snap = snapshot(&def, &["x", "y"], vec![Value::Int(2), Value::Int(3)]);
        let block = Renderer::default().render(&snap, &def);
        assert_eq!(
            block,
            "@eval Main let (x, y) = Rebugger.getstored(\"00000000-0000-0000-0000-000000000000\")\n    s = x + y\n    s\nend"
        );
    }

    #[test]
    fn test_single_and_empty_bindings() {
        let def = definition("function one(x)\n  x\nend\nfunction none()\nend\n", "one");
        let snap = snapshot(&def, &["x"], vec![Value::Int(1)]);
        assert!(Renderer::new("R", 2).render(&snap, &def).starts_with("@eval Main let (x,) = R.getstored("));

        let def = definition("function one(x)\n  x\nend\nfunction none()\nend\n", "none");
        let snap = snapshot(&def, &[], Vec::new());
        let block = Renderer::new("R", 2).render(&snap, &def);
        assert!(block.contains("let () = R.getstored("));
        assert!(block.ends_with("\n  nothing\nend"));
    }

    #[test]
    fn test_mixed_unicode_indentation() {
        let def = definition("function wide(x)\n\u{3000}y = x\n  y\nend\n", "wide");
        let snap = snapshot(&def, &["x"], vec![Value::Int(1)]);
        let block = Renderer::default().render(&snap, &def);
        assert!(block.ends_with("\n    \u{3000}y = x\n      y\nend"));

        // A shared multi-byte prefix is removed whole
        let def = definition("function deep(x)\n\u{3000}\u{3000}y = x\n\u{3000}y\nend\n", "deep");
        let snap = snapshot(&def, &["x"], vec![Value::Int(1)]);
        let block = Renderer::new("R", 2).render(&snap, &def);
        assert!(block.ends_with("\n  \u{3000}y = x\n  y\nend"));
    }

    #[test]
    fn test_header_lists_bindings() {
        let def = definition("function add(x, y)\n    x + y\nend\n", "add");
        let snap = snapshot(&def, &["x", "y"], vec![Value::Int(2), Value::str("a")]);
        let header = Renderer::default().header(&snap, &def.method);
        assert_eq!(header, "add(x, y) in Main at demo.rb:1\n  x = 2\n  y = \"a\"");
    }
}
