//! CMS configuration model.
//!
//! Loaded from YAML or TOML. Only light normalization runs after loading:
//! collections inherit the global i18n block and resolve their locale
//! settings. Anything deeper (schema validation) is left to the caller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::commit::CommitMessages;
use crate::error::{QuireError, Result};
use crate::i18n::I18nOptions;
use crate::slug::SlugConfig;

/// Publishing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Saves publish directly
    #[default]
    Simple,
    /// Saves land in the review area first
    EditorialWorkflow,
}

/// The `backend` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Registered backend name (`test-repo`, `local`, ...)
    pub name: String,
    /// Repository identifier for hosted providers
    #[serde(default)]
    pub repo: Option<String>,
    /// Branch to read and write
    #[serde(default)]
    pub branch: Option<String>,
    /// Content root for the `local` backend
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Page size for paginated listings
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Commit message templates
    #[serde(default)]
    pub commit_messages: CommitMessages,
}

impl BackendConfig {
    /// A backend section naming only the backend.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CmsConfig {
    /// Storage provider
    pub backend: BackendConfig,
    /// Slug options
    #[serde(default)]
    pub slug: SlugConfig,
    /// Repository folder for uploaded media
    #[serde(default)]
    pub media_folder: String,
    /// Public URL prefix of `media_folder`
    #[serde(default)]
    pub public_folder: Option<String>,
    /// Publishing mode
    #[serde(default)]
    pub publish_mode: PublishMode,
    /// Global i18n settings
    #[serde(default)]
    pub i18n: Option<I18nOptions>,
    /// Content collections
    #[serde(default)]
    pub collections: Vec<Collection>,
}

impl CmsConfig {
    /// Parse YAML configuration text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_yaml_ng::from_str(text).map_err(|e| QuireError::Config(e.to_string()))?;
        Ok(config.normalize())
    }

    /// Parse TOML configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| QuireError::Config(e.to_string()))?;
        Ok(config.normalize())
    }

    /// Load a configuration file, choosing the parser by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| QuireError::Config(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("yml" | "yaml") | None => Self::from_yaml_str(&text),
            Some(other) => Err(QuireError::Config(format!(
                "unsupported configuration format '.{other}'"
            ))),
        }
    }

    /// Resolve per-collection i18n settings against the global block.
    pub fn normalize(mut self) -> Self {
        let global = self.i18n.clone();
        for collection in &mut self.collections {
            collection.resolve_i18n(global.as_ref());
        }
        self
    }

    /// Collection called `name`.
    pub fn collection(&self, name: &str) -> Result<&Collection> {
        self.collections
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| QuireError::UnknownCollection(name.to_string()))
    }

    /// Whether saves go through the editorial workflow.
    pub fn editorial_workflow(&self) -> bool {
        self.publish_mode == PublishMode::EditorialWorkflow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::I18nStructure;

    const YAML: &str = r#"
backend:
  name: test-repo
  commit_messages:
    create: "New {{collection}} {{slug}}"
media_folder: static/img
publish_mode: editorial_workflow
i18n:
  structure: multiple_files
  locales: [en, de]
collections:
  - name: posts
    folder: content/posts
    extension: md
    create: true
    i18n: true
    fields:
      - { name: title }
      - { name: body, widget: markdown }
  - name: pages
    files:
      - { name: about, file: content/about.yml }
"#;

    #[test]
    fn yaml_config_resolves_collection_i18n() {
        let config = CmsConfig::from_yaml_str(YAML).unwrap();
        assert!(config.editorial_workflow());
        assert_eq!(config.backend.commit_messages.create, "New {{collection}} {{slug}}");
        assert_eq!(config.backend.commit_messages.delete, CommitMessages::default().delete);

        let posts = config.collection("posts").unwrap();
        let settings = posts.i18n_settings().unwrap();
        assert_eq!(settings.structure, I18nStructure::MultipleFiles);
        assert_eq!(settings.default_locale, "en");
        assert!(config.collection("pages").unwrap().i18n_settings().is_none());
    }

    #[test]
    fn toml_config() {
        let config = CmsConfig::from_toml_str(
            r#"
media_folder = "static"

[backend]
name = "local"
root = "site"

[[collections]]
name = "notes"
folder = "notes"
"#,
        )
        .unwrap();
        assert_eq!(config.backend.root.as_deref(), Some(Path::new("site")));
        assert!(!config.editorial_workflow());
        assert_eq!(config.collections[0].name, "notes");
    }

    #[test]
    fn unknown_collection() {
        let config = CmsConfig::from_yaml_str(YAML).unwrap();
        assert!(matches!(
            config.collection("nope"),
            Err(QuireError::UnknownCollection(_))
        ));
    }

    #[test]
    fn load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, YAML).unwrap();
        assert_eq!(CmsConfig::load(&path).unwrap().collections.len(), 2);

        let bad = dir.path().join("config.ini");
        std::fs::write(&bad, "").unwrap();
        assert!(matches!(CmsConfig::load(&bad), Err(QuireError::Config(_))));
    }
}
