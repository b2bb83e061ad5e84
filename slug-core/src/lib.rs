//! slug core library — fleet reference index, domain types, settings.
//!
//! Public API surface:
//! - [`types`] — newtypes for repository names and commit ids
//! - [`layout`] — on-disk and remote naming conventions
//! - [`patterns`] — shell-style glob sets used for filtering
//! - [`refs_index`] — the authoritative [`ReferenceIndex`]
//! - [`config`] — [`Settings`] load
//! - [`error`] — [`IndexError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod layout;
pub mod patterns;
pub mod refs_index;
pub mod types;

pub use config::Settings;
pub use error::{ConfigError, IndexError};
pub use patterns::PatternSet;
pub use refs_index::{IndexFilter, ReferenceIndex};
pub use types::{CommitId, RepoName};
