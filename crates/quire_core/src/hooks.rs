//! Entry event hooks.
//!
//! Hooks registered for an event run in registration order. Each receives
//! the current entry data and the signed-in user. Returning `Some(data)`
//! replaces the data for the rest of the pipeline; `None` leaves it
//! unchanged. A failing hook aborts the operation that fired the event.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::entry::User;
use crate::error::Result;
use crate::value::EntryData;

/// When a hook fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Before the entry is serialized; may rewrite the data
    PreSave,
    /// Before the backend write; may rewrite the data
    PrePublish,
    /// After the backend write
    PostSave,
    /// After the backend write, once published
    PostPublish,
}

// ==================== EntryHook Trait ====================

/// A transform run on entry data for an event.
#[async_trait]
pub trait EntryHook: Send + Sync {
    /// Inspect `data`; return replacement data or `None` for no change.
    async fn call(&self, data: &EntryData, author: Option<&User>) -> Result<Option<EntryData>>;
}

/// Adapter turning a closure into an [`EntryHook`].
pub struct FnHook<F>(F);

impl<F> FnHook<F>
where
    F: Fn(&EntryData, Option<&User>) -> Result<Option<EntryData>> + Send + Sync,
{
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> EntryHook for FnHook<F>
where
    F: Fn(&EntryData, Option<&User>) -> Result<Option<EntryData>> + Send + Sync,
{
    async fn call(&self, data: &EntryData, author: Option<&User>) -> Result<Option<EntryData>> {
        (self.0)(data, author)
    }
}

// ==================== Pipeline ====================

/// Hooks grouped by event.
#[derive(Clone, Default)]
pub struct HookPipeline {
    hooks: Vec<(HookEvent, Arc<dyn EntryHook>)>,
}

impl HookPipeline {
    /// An empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` for `event`.
    pub fn register(&mut self, event: HookEvent, hook: Arc<dyn EntryHook>) {
        self.hooks.push((event, hook));
    }

    /// Register a closure for `event`.
    pub fn register_fn<F>(&mut self, event: HookEvent, f: F)
    where
        F: Fn(&EntryData, Option<&User>) -> Result<Option<EntryData>> + Send + Sync + 'static,
    {
        self.register(event, Arc::new(FnHook::new(f)));
    }

    /// Number of hooks registered for `event`.
    pub fn count(&self, event: HookEvent) -> usize {
        self.hooks.iter().filter(|(e, _)| *e == event).count()
    }

    /// Run the hooks of `event` over `data`, returning the final data.
    pub async fn run(&self, event: HookEvent, mut data: EntryData, author: Option<&User>) -> Result<EntryData> {
        for (index, (_, hook)) in self.hooks.iter().filter(|(e, _)| *e == event).enumerate() {
            if let Some(replaced) = hook.call(&data, author).await? {
                debug!(?event, index, "hook replaced entry data");
                data = replaced;
            }
        }
        Ok(data)
    }
}

impl std::fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookPipeline")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
