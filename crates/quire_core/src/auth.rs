//! Persisted login session.

use std::sync::Arc;

use crate::entry::User;
use crate::error::Result;
use crate::storage::KeyValueStore;

/// Key under which the signed-in user is stored.
pub const USER_KEY: &str = "quire-user";

/// Remembers the signed-in user between sessions.
#[derive(Clone)]
pub struct AuthStore {
    store: Arc<dyn KeyValueStore>,
}

impl AuthStore {
    /// A session store over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored user; an unreadable record counts as signed out.
    pub async fn get_user(&self) -> Result<Option<User>> {
        let Some(value) = self.store.get(USER_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!("discarding unreadable stored user: {e}");
                self.store.remove(USER_KEY).await?;
                Ok(None)
            }
        }
    }

    /// Remember `user`.
    pub async fn store_user(&self, user: &User) -> Result<()> {
        self.store.set(USER_KEY, serde_json::to_value(user)?).await
    }

    /// Forget the stored user.
    pub async fn logout(&self) -> Result<()> {
        self.store.remove(USER_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn store_get_and_logout() {
        let auth = AuthStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(auth.get_user().await.unwrap(), None);
        let user = User {
            login: Some("sam".into()),
            token: Some("t".into()),
            ..Default::default()
        };
        auth.store_user(&user).await.unwrap();
        assert_eq!(auth.get_user().await.unwrap(), Some(user));
        auth.logout().await.unwrap();
        assert_eq!(auth.get_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_user_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        store.set(USER_KEY, json!("not a user")).await.unwrap();
        let auth = AuthStore::new(store.clone());
        assert_eq!(auth.get_user().await.unwrap(), None);
        assert!(store.keys().await.is_empty());
    }
}
