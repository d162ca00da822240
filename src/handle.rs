//! Lifetime management for the open archive behind a resource file.
//!
//! With locking enabled the handle is opened once and reused: readers check
//! the slot without taking a lock, and only a miss falls through to the
//! mutex-guarded re-check-then-open path, so concurrent first calls open the
//! archive once. The slot may be emptied at any time (explicit close, idle
//! reclamation); the next caller simply opens a fresh handle.
//!
//! With locking disabled every acquire opens a new handle and every release
//! closes it.

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::error::Result;
use crate::zip::{ArchiveFlavor, ZipArchive};

/// Opens archive handles. The indirection lets callers observe or replace
/// how handles are created.
pub trait ArchiveOpener: Send + Sync {
    fn open(&self, path: &Path, flavor: ArchiveFlavor) -> Result<ZipArchive>;
}

/// Opens archives from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsOpener;

impl ArchiveOpener for FsOpener {
    fn open(&self, path: &Path, flavor: ArchiveFlavor) -> Result<ZipArchive> {
        ZipArchive::open(path, flavor)
    }
}

struct Cached {
    archive: Arc<ZipArchive>,
    /// Milliseconds since the owning cache's epoch.
    last_used: AtomicU64,
}

/// Per-resource-file cache of the open archive handle.
pub struct HandleCache {
    path: PathBuf,
    flavor: ArchiveFlavor,
    lock_archives: bool,
    idle_timeout: Option<Duration>,
    opener: Arc<dyn ArchiveOpener>,
    slot: ArcSwapOption<Cached>,
    open_lock: Mutex<()>,
    epoch: Instant,
}

impl HandleCache {
    pub fn new(
        path: PathBuf,
        flavor: ArchiveFlavor,
        lock_archives: bool,
        idle_timeout: Option<Duration>,
        opener: Arc<dyn ArchiveOpener>,
    ) -> Self {
        Self {
            path,
            flavor,
            lock_archives,
            idle_timeout,
            opener,
            slot: ArcSwapOption::empty(),
            open_lock: Mutex::new(()),
            epoch: Instant::now(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether handles outlive the operation that acquired them.
    pub fn is_locking(&self) -> bool {
        self.lock_archives
    }

    /// Get a live handle, opening the archive if nothing usable is cached.
    pub fn acquire(&self) -> Result<Arc<ZipArchive>> {
        if !self.lock_archives {
            return self.open_fresh();
        }

        if let Some(archive) = self.cached() {
            trace!(path = %self.path.display(), "archive handle cache hit");
            return Ok(archive);
        }

        let _guard = self.open_lock.lock();
        if let Some(archive) = self.cached() {
            return Ok(archive);
        }

        let archive = self.open_fresh()?;
        self.slot.store(Some(Arc::new(Cached {
            archive: Arc::clone(&archive),
            last_used: AtomicU64::new(self.now()),
        })));
        Ok(archive)
    }

    /// Hand back a handle obtained from [`acquire`](Self::acquire). Closes it
    /// when locking is disabled; otherwise the cached copy stays open.
    pub fn release(&self, handle: Arc<ZipArchive>) {
        if !self.lock_archives {
            debug!(path = %self.path.display(), "closing archive handle");
        }
        drop(handle);
    }

    /// Drop the cached handle. Safe to call repeatedly and concurrently: only
    /// the caller that empties the slot releases the handle, and lookups that
    /// already hold it finish before the file is actually closed.
    pub fn close(&self) {
        if let Some(cached) = self.slot.swap(None) {
            debug!(path = %self.path.display(), "closing cached archive handle");
            drop(cached);
        }
    }

    /// Drop the cached handle if it has sat unused past the idle timeout.
    /// Returns whether a handle was reclaimed.
    pub fn reclaim_idle(&self) -> bool {
        let _guard = self.open_lock.lock();
        let expired = match &*self.slot.load() {
            Some(cached) => self.is_expired(cached),
            None => false,
        };
        if expired {
            debug!(path = %self.path.display(), "reclaiming idle archive handle");
            self.slot.store(None);
        }
        expired
    }

    /// Whether a handle is currently cached.
    pub fn is_cached(&self) -> bool {
        self.slot.load().is_some()
    }

    fn cached(&self) -> Option<Arc<ZipArchive>> {
        let guard = self.slot.load();
        let cached = (*guard).as_ref()?;
        if self.is_expired(cached) {
            return None;
        }
        cached.last_used.store(self.now(), Ordering::Relaxed);
        Some(Arc::clone(&cached.archive))
    }

    fn is_expired(&self, cached: &Cached) -> bool {
        match self.idle_timeout {
            Some(timeout) => {
                let idle = self.now().saturating_sub(cached.last_used.load(Ordering::Relaxed));
                idle >= timeout.as_millis() as u64
            }
            None => false,
        }
    }

    fn open_fresh(&self) -> Result<Arc<ZipArchive>> {
        debug!(path = %self.path.display(), flavor = ?self.flavor, "opening archive");
        Ok(Arc::new(self.opener.open(&self.path, self.flavor)?))
    }

    fn now(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

impl Drop for HandleCache {
    fn drop(&mut self) {
        self.close();
    }
}
