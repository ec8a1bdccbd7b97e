//! Control-file parser.
//!
//! The format is a nested key-value text file: `name { ... }` blocks
//! (brace on the same or the following line), one `key value` pair per
//! line, `;;` line comments, double-quoted strings, and `#include "path"`
//! textual inclusion resolved relative to the including file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use afv_core::{AfvError, AfvResult};

const MAX_INCLUDE_DEPTH: usize = 16;

/// A parsed value: either a scalar (the raw remainder of the line) or a
/// nested block.
#[derive(Clone, Debug)]
pub enum ConfigValue {
    Scalar(String),
    Block(ConfigBlock),
}

/// One `{ }` level of the control file.
#[derive(Clone, Debug, Default)]
pub struct ConfigBlock {
    entries: BTreeMap<String, ConfigValue>,
}

impl ConfigBlock {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn block(&self, key: &str) -> AfvResult<&ConfigBlock> {
        match self.entries.get(key) {
            Some(ConfigValue::Block(block)) => Ok(block),
            Some(ConfigValue::Scalar(_)) => Err(AfvError::config(format!(
                "'{key}' must be a {{ }} block"
            ))),
            None => Err(AfvError::config(format!("missing required block '{key}'"))),
        }
    }

    pub fn block_opt(&self, key: &str) -> Option<&ConfigBlock> {
        match self.entries.get(key) {
            Some(ConfigValue::Block(block)) => Some(block),
            _ => None,
        }
    }

    fn scalar(&self, key: &str) -> AfvResult<&str> {
        match self.entries.get(key) {
            Some(ConfigValue::Scalar(raw)) => Ok(raw),
            Some(ConfigValue::Block(_)) => Err(AfvError::config(format!(
                "'{key}' is a block, expected a value"
            ))),
            None => Err(AfvError::config(format!("missing required option '{key}'"))),
        }
    }

    /// String value with surrounding quotes stripped.
    pub fn str(&self, key: &str) -> AfvResult<String> {
        Ok(unquote(self.scalar(key)?))
    }

    pub fn str_opt(&self, key: &str) -> Option<String> {
        self.scalar(key).ok().map(unquote)
    }

    pub fn f64(&self, key: &str) -> AfvResult<f64> {
        let raw = self.scalar(key)?;
        raw.trim().parse().map_err(|_| {
            AfvError::config(format!("option '{key}' must be a number, got '{raw}'"))
        })
    }

    pub fn f64_or(&self, key: &str, default: f64) -> AfvResult<f64> {
        if self.contains(key) {
            self.f64(key)
        } else {
            Ok(default)
        }
    }

    pub fn usize(&self, key: &str) -> AfvResult<usize> {
        let raw = self.scalar(key)?;
        raw.trim().parse().map_err(|_| {
            AfvError::config(format!("option '{key}' must be a non-negative integer, got '{raw}'"))
        })
    }

    pub fn usize_or(&self, key: &str, default: usize) -> AfvResult<usize> {
        if self.contains(key) {
            self.usize(key)
        } else {
            Ok(default)
        }
    }

    pub fn i32(&self, key: &str) -> AfvResult<i32> {
        let raw = self.scalar(key)?;
        raw.trim().parse().map_err(|_| {
            AfvError::config(format!("option '{key}' must be an integer, got '{raw}'"))
        })
    }

    pub fn bool_or(&self, key: &str, default: bool) -> AfvResult<bool> {
        let Some(ConfigValue::Scalar(raw)) = self.entries.get(key) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(AfvError::config(format!(
                "option '{key}' must be a boolean, got '{other}'"
            ))),
        }
    }

    /// Whitespace-separated integer list.
    pub fn i32_list(&self, key: &str) -> AfvResult<Vec<i32>> {
        let Some(ConfigValue::Scalar(raw)) = self.entries.get(key) else {
            return Ok(Vec::new());
        };
        raw.split_whitespace()
            .map(|tok| {
                tok.parse().map_err(|_| {
                    AfvError::config(format!("option '{key}' holds a non-integer '{tok}'"))
                })
            })
            .collect()
    }
}

fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Drop a `;;` comment, respecting double quotes.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_quotes = !in_quotes,
            b';' if !in_quotes && i + 1 < bytes.len() && bytes[i + 1] == b';' => {
                return &line[..i];
            }
            _ => {}
        }
        i += 1;
    }
    line
}

/// Parse a control file from disk, resolving `#include` directives.
pub fn parse_control_file(path: &Path) -> AfvResult<ConfigBlock> {
    let text = preprocess(path, 0)?;
    parse_control_str(&text)
}

fn preprocess(path: &Path, depth: usize) -> AfvResult<String> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(AfvError::config(format!(
            "include depth exceeds {MAX_INCLUDE_DEPTH} at {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| AfvError::io(format!("control file {}", path.display()), e))?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let stripped = strip_comment(line).trim();
        if let Some(rest) = stripped.strip_prefix("#include") {
            let target = unquote(rest);
            if target.is_empty() {
                return Err(AfvError::config(format!(
                    "#include without a path in {}",
                    path.display()
                )));
            }
            let mut inc: PathBuf = base.clone();
            inc.push(&target);
            out.push_str(&preprocess(&inc, depth + 1)?);
            out.push('\n');
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Parse control-file text (no `#include` resolution).
pub fn parse_control_str(text: &str) -> AfvResult<ConfigBlock> {
    let mut stack: Vec<(String, ConfigBlock)> = Vec::new();
    let mut current = ConfigBlock::default();
    let mut pending: Option<String> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let bad = |what: &str| AfvError::config(format!("control line {}: {what}", lineno + 1));

        if line == "{" {
            let key = pending
                .take()
                .ok_or_else(|| bad("'{' without a preceding block name"))?;
            stack.push((key, std::mem::take(&mut current)));
            continue;
        }
        if line == "}" {
            if pending.is_some() {
                return Err(bad("block name without a value or '{'"));
            }
            let (key, mut parent) = stack
                .pop()
                .ok_or_else(|| bad("unmatched '}'"))?;
            parent
                .entries
                .insert(key, ConfigValue::Block(std::mem::take(&mut current)));
            current = parent;
            continue;
        }
        if pending.is_some() {
            return Err(bad("expected '{' after a bare block name"));
        }

        if let Some(name) = line.strip_suffix('{') {
            let name = name.trim();
            if name.is_empty() {
                return Err(bad("block with an empty name"));
            }
            stack.push((name.to_string(), std::mem::take(&mut current)));
            continue;
        }

        match line.split_once(char::is_whitespace) {
            Some((key, value)) => {
                current
                    .entries
                    .insert(key.to_string(), ConfigValue::Scalar(value.trim().to_string()));
            }
            None => {
                // Bare word: a block name whose '{' follows on its own line.
                pending = Some(line.to_string());
            }
        }
    }
    if let Some(name) = pending {
        return Err(AfvError::config(format!(
            "block '{name}' is never opened"
        )));
    }
    if !stack.is_empty() {
        return Err(AfvError::config(format!(
            "{} unclosed block(s) at end of control file",
            stack.len()
        )));
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
;; sample configuration
io {
    mesh_file "grid.msh"
    convergence_history_required true
}
flow_conditions
{
    adiabatic_index 1.4
    freestream_Mach_number 0.38  ;; trailing comment
}
bc {
    listof_output_wall_boundaries 2 5 9
}
Jacobian_inviscid_flux consistent
"#;

    #[test]
    fn parses_blocks_and_scalars() {
        let root = parse_control_str(SAMPLE).unwrap();
        let io = root.block("io").unwrap();
        assert_eq!(io.str("mesh_file").unwrap(), "grid.msh");
        assert!(io.bool_or("convergence_history_required", false).unwrap());

        let flow = root.block("flow_conditions").unwrap();
        assert_eq!(flow.f64("adiabatic_index").unwrap(), 1.4);
        assert_eq!(flow.f64("freestream_Mach_number").unwrap(), 0.38);

        let bc = root.block("bc").unwrap();
        assert_eq!(bc.i32_list("listof_output_wall_boundaries").unwrap(), vec![2, 5, 9]);

        assert_eq!(root.str("Jacobian_inviscid_flux").unwrap(), "consistent");
    }

    #[test]
    fn missing_keys_are_config_errors() {
        let root = parse_control_str(SAMPLE).unwrap();
        let err = root.block("io").unwrap().f64("nope").unwrap_err();
        assert_eq!(err.kind(), "config");
        assert!(root.block("pseudotime").is_err());
    }

    #[test]
    fn unbalanced_braces_are_rejected() {
        assert!(parse_control_str("io {\n mesh_file x\n").is_err());
        assert!(parse_control_str("}\n").is_err());
        assert!(parse_control_str("io\nmesh_file x\n").is_err());
    }

    #[test]
    fn comments_do_not_break_quoted_strings() {
        let root = parse_control_str("io {\n f \"a;;b\" ;; real comment\n}\n").unwrap();
        assert_eq!(root.block("io").unwrap().str("f").unwrap(), "a;;b");
    }

    #[test]
    fn includes_resolve_relative_to_the_including_file() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("conf");
        std::fs::create_dir(&sub).unwrap();

        let mut inner = std::fs::File::create(sub.join("flow.cfg")).unwrap();
        writeln!(inner, "flow_conditions {{\n adiabatic_index 1.4\n}}").unwrap();

        let main_path = sub.join("case.ctrl");
        let mut main = std::fs::File::create(&main_path).unwrap();
        writeln!(main, "#include \"flow.cfg\"\nio {{\n mesh_file \"m.msh\"\n}}").unwrap();

        let root = parse_control_file(&main_path).unwrap();
        assert_eq!(
            root.block("flow_conditions").unwrap().f64("adiabatic_index").unwrap(),
            1.4
        );
        assert_eq!(root.block("io").unwrap().str("mesh_file").unwrap(), "m.msh");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = parse_control_file(Path::new("/nonexistent/x.ctrl")).unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
