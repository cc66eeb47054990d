//! Editorial workflow transitions through the backend.

use tracing::{info, warn};

use super::Engine;
use crate::collection::Collection;
use crate::error::Result;
use crate::hooks::HookEvent;
use crate::workflow::WorkflowStatus;

impl Engine {
    /// Move an unpublished entry to `status`. Content is unchanged.
    pub async fn update_unpublished_status(
        &self,
        collection: &Collection,
        slug: &str,
        status: WorkflowStatus,
    ) -> Result<()> {
        self.client
            .update_unpublished_entry_status(&collection.name, slug, status)
            .await?;
        info!(collection = %collection.name, slug, %status, "unpublished entry moved");
        Ok(())
    }

    /// Publish an unpublished entry, running the publish hooks around it.
    ///
    /// A failing pre-publish hook stops the publish. Post-publish hook
    /// failures are logged only.
    pub async fn publish_unpublished(&self, collection: &Collection, slug: &str) -> Result<()> {
        let entry = self.unpublished_entry(collection, slug).await?;
        self.run_hooks(HookEvent::PrePublish, entry.data.clone()).await?;
        self.client.publish_unpublished_entry(&collection.name, slug).await?;
        info!(collection = %collection.name, slug, "entry published");
        // The entry is live; hook failures are only logged.
        if let Err(e) = self.run_hooks(HookEvent::PostPublish, entry.data).await {
            warn!(collection = %collection.name, slug, error = %e, "post-publish hook failed");
        }
        Ok(())
    }

    /// Discard an unpublished entry.
    pub async fn delete_unpublished(&self, collection: &Collection, slug: &str) -> Result<()> {
        self.client.delete_unpublished_entry(&collection.name, slug).await?;
        info!(collection = %collection.name, slug, "unpublished entry deleted");
        Ok(())
    }
}
