//! Adapts cached artifacts into versioned text for consumers.
//!
//! Consumers load generated text once and keep their own copy, so the loader
//! evicts the cached artifact after every load. The reported version is the
//! output version, which survives eviction; a consumer comparing versions does
//! not see a change when the same output is recomputed later.

use std::path::PathBuf;
use std::sync::Arc;

use regen_primitives::{TextEncoding, VersionStamp};

use crate::artifact::ArtifactGenerator;
use crate::document::DocumentHandle;
use crate::error::GenerationError;

/// Generated text tagged with its encoding and output version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAndVersion {
	pub text: String,
	pub encoding: TextEncoding,
	pub version: VersionStamp,
	/// Path of the source document the text was generated from.
	pub file_path: PathBuf,
}

impl TextAndVersion {
	/// Encoded bytes of the text, including the encoding preamble.
	pub fn to_bytes(&self) -> Vec<u8> {
		self.encoding.encode(&self.text)
	}
}

/// Loads generated text through a document's output cache.
#[derive(Clone)]
pub struct GeneratedTextLoader {
	generator: Arc<dyn ArtifactGenerator>,
	encoding: TextEncoding,
}

impl GeneratedTextLoader {
	pub fn new(generator: Arc<dyn ArtifactGenerator>) -> Self {
		Self {
			generator,
			encoding: TextEncoding::default(),
		}
	}

	#[must_use]
	pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
		self.encoding = encoding;
		self
	}

	pub fn encoding(&self) -> TextEncoding {
		self.encoding
	}

	/// Returns the generated text for `document` and evicts the cached artifact.
	///
	/// The cache is cleared on failure as well.
	pub async fn load(&self, document: &DocumentHandle) -> Result<TextAndVersion, GenerationError> {
		let result = document.generated_output(&self.generator).await;
		let output_version = document.output().output_version();
		document.output().clear();

		let output = result?;
		let version = output_version.map_or(output.version(), |v| v.max(output.version()));
		tracing::debug!(doc = %document.key(), version = %version, "regen.text.load");
		Ok(TextAndVersion {
			text: output.artifact().code().to_string(),
			encoding: self.encoding,
			version,
			file_path: document.key().path().to_path_buf(),
		})
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use regen_primitives::Rope;

	use super::*;
	use crate::test_support::{TestGenerator, as_dyn, doc};

	#[tokio::test]
	async fn load_returns_text_and_clears_cache() {
		let generator = TestGenerator::new();
		let loader = GeneratedTextLoader::new(as_dyn(&generator));
		let d = doc("/app/A.page", "<p>a</p>");

		let loaded = loader.load(&d).await.unwrap();
		assert_eq!(
			loaded,
			TextAndVersion {
				text: "// /app/A.page\n<p>a</p>".to_string(),
				encoding: TextEncoding::Utf8,
				version: d.version(),
				file_path: PathBuf::from("/app/A.page"),
			}
		);
		assert!(d.output().try_get_cached().is_none());
		assert_eq!(d.output().output_version(), Some(d.version()));
	}

	#[tokio::test]
	async fn reload_after_eviction_keeps_version() {
		let generator = TestGenerator::new();
		let loader = GeneratedTextLoader::new(as_dyn(&generator));
		let d = doc("/app/A.page", "x");

		let first = loader.load(&d).await.unwrap();
		let second = loader.load(&d).await.unwrap();
		assert_eq!(first.version, second.version);
		assert_eq!(first.text, second.text);
		assert_eq!(generator.calls(), 2);
	}

	#[tokio::test]
	async fn newer_snapshot_gets_newer_version() {
		let generator = TestGenerator::new();
		let loader = GeneratedTextLoader::new(as_dyn(&generator));
		let d1 = doc("/app/A.page", "x");
		let d2 = d1.with_text(Rope::from("y"));

		let first = loader.load(&d1).await.unwrap();
		let second = loader.load(&d2).await.unwrap();
		assert!(second.version > first.version);
		assert!(second.text.ends_with('y'));
	}

	#[tokio::test]
	async fn bom_encoding_is_reported() {
		let generator = TestGenerator::new();
		let loader = GeneratedTextLoader::new(as_dyn(&generator)).with_encoding(TextEncoding::Utf8WithBom);
		let d = doc("/app/A.page", "x");

		let loaded = loader.load(&d).await.unwrap();
		assert_eq!(loaded.encoding, TextEncoding::Utf8WithBom);
		assert_eq!(&loaded.to_bytes()[..3], &[0xEF, 0xBB, 0xBF]);
	}

	#[tokio::test]
	async fn failure_still_clears() {
		let generator = TestGenerator::new();
		generator.fail_on("/app/A.page");
		let loader = GeneratedTextLoader::new(as_dyn(&generator));
		let d = doc("/app/A.page", "x");

		assert!(loader.load(&d).await.is_err());
		assert!(d.output().try_get_cached().is_none());
	}
}
