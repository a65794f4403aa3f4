//! Dispatch layer for cmdtree applications.
//!
//! An [`Application`] bundles the command tree with its option groups and is shared
//! read-only (usually behind an `Arc`). Each [`Session`] owns its own config value and
//! turns argv into an [`Invocation`]: which implementation to load, what arguments it
//! receives, and which mandatory options are missing.

pub mod app;
pub mod error;
pub mod manifest;
pub mod options;

pub use app::{Application, Invocation, Session};
pub use error::{CliError, exit_code};
pub use manifest::{LoadedManifest, Manifest, ManifestNotFound};
pub use options::{OptionValue, OptionValues};
