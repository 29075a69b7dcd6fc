//! Incremental background regeneration of generated documents.
//!
//! Each document carries a [`VersionedOutputCache`] shared by all of its
//! snapshots. The [`BackgroundGenerator`] debounces edit notifications,
//! coalesces them per document, and warms those caches on a single worker;
//! [`GeneratedTextLoader`] hands generated text to consumers on demand and
//! evicts it afterwards.

pub mod artifact;
pub mod cache;
pub mod coalesce;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod project;
pub mod scheduler;
pub mod text_loader;

#[cfg(test)]
mod test_support;

pub use artifact::{ArtifactGenerator, GeneratedArtifact, GenerationDiagnostic, Severity, SourceMapping};
pub use cache::{CachedOutput, VersionedOutputCache};
pub use coalesce::{NotificationCoalescer, PendingWorkload};
pub use config::{ConfigError, GeneratorConfig};
pub use document::{DocumentHandle, ProjectContext};
pub use error::{GenerationError, SchedulerError, TextLoadError};
pub use events::RegenerationEvent;
pub use project::{ProjectChange, ProjectModel, Workspace};
pub use regen_primitives::{DocumentKey, ProjectKey, Rope, TextEncoding, VersionStamp};
#[cfg(any(test, feature = "test-hooks"))]
pub use scheduler::{ResetEvent, SchedulerHooks};
pub use scheduler::{BackgroundGenerator, SchedulerState, SchedulerStatus};
pub use text_loader::{GeneratedTextLoader, TextAndVersion};
