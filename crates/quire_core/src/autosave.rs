//! Debounced local backups of the draft.
//!
//! Every edit calls [`Autosaver::schedule`]; only the last call within the
//! delay window writes a backup. Scheduling bumps a generation counter and a
//! pending task writes only if its generation is still current when it wakes.
//! Cancelling bumps the counter and then waits on the write lock, so a write
//! that already started finishes before the caller moves on (a persist never
//! races a late backup of the draft it just saved).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::collection::Collection;
use crate::engine::Engine;
use crate::entry::Entry;

/// Default debounce window.
pub const AUTOSAVE_DELAY: Duration = Duration::from_secs(2);

struct Shared {
    generation: AtomicU64,
    // Held for the duration of a backup write; holds the last written fingerprint.
    write_lock: Mutex<Option<String>>,
}

/// Debounces draft backups for one editing session.
pub struct Autosaver {
    engine: Arc<Engine>,
    delay: Duration,
    shared: Arc<Shared>,
}

impl Autosaver {
    /// Autosaver with the default delay.
    pub fn new(engine: Arc<Engine>) -> Self {
        Self::with_delay(engine, AUTOSAVE_DELAY)
    }

    /// Autosaver that waits `delay` after the last edit.
    pub fn with_delay(engine: Arc<Engine>, delay: Duration) -> Self {
        Self {
            engine,
            delay,
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                write_lock: Mutex::new(None),
            }),
        }
    }

    /// Back up `entry` once no further edit arrives within the delay.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn schedule(&self, collection: &Collection, entry: &Entry) {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let engine = self.engine.clone();
        let shared = self.shared.clone();
        let delay = self.delay;
        let collection = collection.clone();
        let entry = entry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut last = shared.write_lock.lock().await;
            if shared.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            write_backup(&engine, &collection, &entry, &mut last).await;
        });
    }

    /// Write `entry`'s backup now, superseding anything pending.
    pub async fn flush(&self, collection: &Collection, entry: &Entry) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let mut last = self.shared.write_lock.lock().await;
        write_backup(&self.engine, collection, entry, &mut last).await;
    }

    /// Drop any pending backup and wait for one already being written.
    pub async fn cancel_pending(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        drop(self.shared.write_lock.lock().await);
    }

    /// Cancel pending work and forget the last written backup, so the next
    /// backup is written even if unchanged.
    pub async fn reset(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        *self.shared.write_lock.lock().await = None;
    }
}

impl std::fmt::Debug for Autosaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autosaver")
            .field("delay", &self.delay)
            .field("generation", &self.shared.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

async fn write_backup(engine: &Engine, collection: &Collection, entry: &Entry, last: &mut Option<String>) {
    let fingerprint = engine
        .entry_to_raw(collection, entry)
        .and_then(|raw| Ok(serde_json::to_string(&(raw, &entry.locale_variants, &entry.media_files))?));
    let fingerprint = match fingerprint {
        Ok(fingerprint) => fingerprint,
        Err(e) => {
            warn!(collection = %collection.name, error = %e, "could not serialize draft for backup");
            return;
        }
    };
    if last.as_deref() == Some(fingerprint.as_str()) {
        debug!(collection = %collection.name, "draft unchanged since last backup");
        return;
    }
    match engine.persist_local_backup(collection, entry).await {
        Ok(()) => {
            debug!(collection = %collection.name, slug = %entry.slug, "draft backed up");
            *last = Some(fingerprint);
        }
        Err(e) => warn!(collection = %collection.name, error = %e, "draft backup failed"),
    }
}
