//! Commit messages for backend writes.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::collection::Collection;
use crate::entry::User;
use crate::template::{TemplateDate, compile_string_template};

/// What a commit does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAction {
    /// A new entry
    Create,
    /// An existing entry
    Update,
    /// Entry removal
    Delete,
    /// Media upload
    UploadMedia,
    /// Media removal
    DeleteMedia,
}

/// Message templates, overridable in `backend.commit_messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMessages {
    /// New entry
    #[serde(default = "CommitMessages::default_create")]
    pub create: String,
    /// Updated entry
    #[serde(default = "CommitMessages::default_update")]
    pub update: String,
    /// Deleted entry
    #[serde(default = "CommitMessages::default_delete")]
    pub delete: String,
    /// Uploaded media
    #[serde(default = "CommitMessages::default_upload_media")]
    pub upload_media: String,
    /// Deleted media
    #[serde(default = "CommitMessages::default_delete_media")]
    pub delete_media: String,
}

impl CommitMessages {
    fn default_create() -> String {
        "Create {{collection}} “{{slug}}”".into()
    }
    fn default_update() -> String {
        "Update {{collection}} “{{slug}}”".into()
    }
    fn default_delete() -> String {
        "Delete {{collection}} “{{slug}}”".into()
    }
    fn default_upload_media() -> String {
        "Upload “{{path}}”".into()
    }
    fn default_delete_media() -> String {
        "Delete “{{path}}”".into()
    }

    fn template(&self, action: CommitAction) -> &str {
        match action {
            CommitAction::Create => &self.create,
            CommitAction::Update => &self.update,
            CommitAction::Delete => &self.delete,
            CommitAction::UploadMedia => &self.upload_media,
            CommitAction::DeleteMedia => &self.delete_media,
        }
    }

    /// Render the message for `action`.
    ///
    /// Variables: `slug`, `path`, `collection` (singular label), `author-login`
    /// and `author-name`. Unknown variables render empty.
    pub fn render(
        &self,
        action: CommitAction,
        collection: Option<&Collection>,
        slug: &str,
        path: &str,
        author: Option<&User>,
    ) -> String {
        let template = self.template(action);
        let vars = json!({
            "slug": slug,
            "path": path,
            "collection": collection.map(Collection::singular_label).unwrap_or_default(),
            "author-login": author.and_then(|u| u.login.clone()).unwrap_or_default(),
            "author-name": author.and_then(|u| u.name.clone()).unwrap_or_default(),
        });
        for var in crate::template::extract_template_vars(template) {
            if vars.get(&var).is_none() {
                tracing::warn!(variable = %var, "unknown commit message variable");
            }
        }
        compile_string_template(template, TemplateDate::Disabled, slug, &vars, None)
            .unwrap_or_else(|_| template.to_string())
    }
}

impl Default for CommitMessages {
    fn default() -> Self {
        Self {
            create: Self::default_create(),
            update: Self::default_update(),
            delete: Self::default_delete(),
            upload_media: Self::default_upload_media(),
            delete_media: Self::default_delete_media(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_messages() {
        let mut posts = Collection::folder("posts", "content/posts");
        posts.label_singular = Some("Post".into());
        let messages = CommitMessages::default();
        assert_eq!(
            messages.render(CommitAction::Create, Some(&posts), "hello", "", None),
            "Create Post “hello”"
        );
        assert_eq!(
            messages.render(CommitAction::UploadMedia, None, "", "static/a.png", None),
            "Upload “static/a.png”"
        );
    }

    #[test]
    fn custom_template_with_author() {
        let messages = CommitMessages {
            update: "{{author-login}}: {{slug}} {{bogus}}".into(),
            ..Default::default()
        };
        let user = User {
            login: Some("sam".into()),
            ..Default::default()
        };
        assert_eq!(
            messages.render(CommitAction::Update, None, "hello", "", Some(&user)),
            "sam: hello "
        );
    }
}
