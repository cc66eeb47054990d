//! # `quire_core`
//!
//! The engine behind the Quire content editor. It keeps a site's entries in
//! sync with a content backend (a Git host, a local folder, memory in tests)
//! and runs the editing flow on top of it:
//!
//! 1. Listing, paging and searching entries of configured collections
//! 2. Decoding and encoding entry files (YAML, TOML, JSON, frontmatter)
//! 3. Generating slugs and paths, including per-locale files
//! 4. Saving drafts, with local backups so unsaved work survives a reload
//! 5. The editorial workflow (draft, in review, ready) before publishing
//!
//! Start with [`Engine::builder`] and drive editing through an
//! [`EditorSession`](session::EditorSession).

#![warn(missing_docs)]

pub mod auth;
pub mod autosave;

/// Content backends and the client interface they implement
pub mod backend;

pub mod backup;

/// Collection schemas
pub mod collection;

pub mod commit;

/// Site configuration
pub mod config;

pub mod cursor;
pub mod draft;

/// The synchronization engine
pub mod engine;

pub mod entry;
pub mod error;

/// Entry file formats
pub mod format;

pub mod hooks;
pub mod i18n;
pub mod media;
pub mod search;
pub mod session;
pub mod slug;
pub mod storage;
pub mod template;
pub mod validate;
pub mod value;
pub mod view;
pub mod workflow;

#[cfg(test)]
mod test_utils;

pub use config::CmsConfig;
pub use engine::Engine;
pub use entry::Entry;
pub use error::{QuireError, Result};
pub use session::EditorSession;
