//! Built-in template generator.
//!
//! Templates are line based: a line whose first non-blank character is `@`
//! is an expression, every other line is literal text. Each template becomes
//! one render function appending to a `String`.

use std::fmt::Write as _;
use std::path::Path;

use regen_pipeline::{ArtifactGenerator, DocumentHandle, GeneratedArtifact, GenerationDiagnostic, GenerationError, Severity, SourceMapping};

const INDENT: &str = "\t";

pub struct TemplateGenerator;

impl ArtifactGenerator for TemplateGenerator {
	fn generate(&self, document: &DocumentHandle) -> Result<GeneratedArtifact, GenerationError> {
		let path = document.key().path();
		let name = function_name(path).ok_or_else(|| GenerationError::failed(document.key(), "file name is not a valid template name"))?;
		let namespace = document.project().root_namespace().unwrap_or("generated");
		Ok(render(&document.text().to_string(), namespace, &name))
	}
}

/// `pages/Index.tpl` -> `render_index`.
fn function_name(path: &Path) -> Option<String> {
	let stem = path.file_stem()?.to_str()?;
	let mut name = String::from("render_");
	for ch in stem.chars() {
		match ch {
			c if c.is_ascii_alphanumeric() => name.push(c.to_ascii_lowercase()),
			'_' | '-' | '.' | ' ' => name.push('_'),
			_ => return None,
		}
	}
	(name.len() > "render_".len()).then_some(name)
}

fn render(source: &str, namespace: &str, name: &str) -> GeneratedArtifact {
	let mut code = String::new();
	let mut diagnostics = Vec::new();
	let mut mappings = Vec::new();

	let _ = writeln!(code, "// namespace: {namespace}");
	let _ = writeln!(code, "pub fn {name}(out: &mut String) {{");

	let mut offset = 0;
	for line in source.split_inclusive('\n') {
		let body = line.trim_end_matches(['\n', '\r']);
		let trimmed = body.trim_start();
		match trimmed.strip_prefix('@') {
			Some(expr) => {
				let at = offset + (body.len() - trimmed.len());
				let expr_start = at + 1 + (expr.len() - expr.trim_start().len());
				let expr = expr.trim();
				if expr.is_empty() {
					diagnostics.push(GenerationDiagnostic {
						severity: Severity::Error,
						message: "expected an expression after '@'".to_string(),
						span: at..at + 1,
					});
				} else {
					let _ = write!(code, "{INDENT}out.push_str(&(");
					let generated_start = code.len();
					code.push_str(expr);
					mappings.push(SourceMapping {
						original: expr_start..expr_start + expr.len(),
						generated: generated_start..code.len(),
					});
					code.push_str(").to_string());\n");
				}
			}
			None => {
				let _ = writeln!(code, "{INDENT}out.push_str({:?});", format!("{body}\n"));
			}
		}
		offset += line.len();
	}
	code.push_str("}\n");

	GeneratedArtifact::new(code).with_diagnostics(diagnostics).with_source_mappings(mappings)
}
