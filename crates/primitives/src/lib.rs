//! Core value types shared by the regeneration pipeline: project and document
//! identities, edit version stamps, and text encodings.

/// Text encoding tags for generated output.
pub mod encoding;
/// Project and document identities.
pub mod ids;
/// Monotonic edit version stamps.
pub mod version;

pub use encoding::TextEncoding;
pub use ids::{DocumentKey, ProjectKey};
pub use ropey::{Rope, RopeSlice};
pub use version::VersionStamp;
