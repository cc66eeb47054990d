use std::collections::HashMap;
use std::sync::Arc;

use super::{BackendClient, LocalBackend, MemoryBackend};
use crate::config::BackendConfig;
use crate::error::{QuireError, Result};

/// Builds a backend from its configuration block.
pub type BackendFactory = Arc<dyn Fn(&BackendConfig) -> Result<Arc<dyn BackendClient>> + Send + Sync>;

/// Backend factories by name.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `test-repo` and `local` backends.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("test-repo", |config: &BackendConfig| {
            let backend = match config.page_size {
                Some(size) => MemoryBackend::paginated(size),
                None => MemoryBackend::new(),
            };
            Ok(Arc::new(backend) as Arc<dyn BackendClient>)
        });
        registry.register("local", |config: &BackendConfig| {
            let root = config.root.clone().ok_or_else(|| {
                QuireError::Config("the local backend needs `backend.root`".into())
            })?;
            Ok(Arc::new(LocalBackend::new(root)) as Arc<dyn BackendClient>)
        });
        registry
    }

    /// Register (or replace) a factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&BackendConfig) -> Result<Arc<dyn BackendClient>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Whether a factory exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate the backend named in `config`.
    pub fn resolve(&self, config: &BackendConfig) -> Result<Arc<dyn BackendClient>> {
        let factory = self
            .factories
            .get(&config.name)
            .ok_or_else(|| QuireError::UnknownBackend(config.name.clone()))?;
        tracing::debug!(backend = %config.name, "resolving backend");
        factory(config)
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("BackendRegistry").field("backends", &names).finish()
    }
}
