//! Generated artifacts and the generator seam.

use std::ops::Range;

use crate::document::DocumentHandle;
use crate::error::GenerationError;

/// Severity of a diagnostic reported during generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
	Info,
	Warning,
	Error,
}

/// Diagnostic attached to a generated artifact, spanning source byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationDiagnostic {
	pub severity: Severity,
	pub message: String,
	pub span: Range<usize>,
}

/// Maps a span of the source document onto a span of the generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapping {
	pub original: Range<usize>,
	pub generated: Range<usize>,
}

/// Immutable result of one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedArtifact {
	code: String,
	diagnostics: Vec<GenerationDiagnostic>,
	source_mappings: Vec<SourceMapping>,
}

impl GeneratedArtifact {
	pub fn new(code: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_diagnostics(mut self, diagnostics: Vec<GenerationDiagnostic>) -> Self {
		self.diagnostics = diagnostics;
		self
	}

	#[must_use]
	pub fn with_source_mappings(mut self, mut mappings: Vec<SourceMapping>) -> Self {
		mappings.sort_by_key(|m| m.original.start);
		self.source_mappings = mappings;
		self
	}

	/// Generated code.
	pub fn code(&self) -> &str {
		&self.code
	}

	pub fn diagnostics(&self) -> &[GenerationDiagnostic] {
		&self.diagnostics
	}

	/// Source mappings, ordered by original start offset.
	pub fn source_mappings(&self) -> &[SourceMapping] {
		&self.source_mappings
	}

	pub fn has_errors(&self) -> bool {
		self.diagnostics.iter().any(|d| d.severity == Severity::Error)
	}

	/// Translates a source byte offset into the generated code.
	///
	/// Returns `None` when the offset falls outside every mapped span.
	pub fn map_to_generated(&self, original_offset: usize) -> Option<usize> {
		let idx = self.source_mappings.partition_point(|m| m.original.start <= original_offset);
		let mapping = self.source_mappings[..idx].last()?;
		if original_offset >= mapping.original.end {
			return None;
		}
		let delta = original_offset - mapping.original.start;
		let mapped = mapping.generated.start + delta;
		(mapped < mapping.generated.end).then_some(mapped)
	}
}

/// External generation function: source document in, artifact out.
///
/// Implementations are pure with respect to pipeline state and run on the
/// blocking pool, so they may do expensive synchronous work.
pub trait ArtifactGenerator: Send + Sync + 'static {
	/// Generates the artifact for `document`, using `document.project()` as the
	/// project-wide context.
	fn generate(&self, document: &DocumentHandle) -> Result<GeneratedArtifact, GenerationError>;
}
