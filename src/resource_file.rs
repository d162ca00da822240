//! A JAR/ZIP archive on the classpath.
//!
//! [`ResourceFile`] answers lookups by name, preloads archives that carry a
//! preload table, reads manifest attributes, and feeds the classpath index.
//! It never holds the archive open itself; every operation goes through the
//! [`HandleCache`], which decides whether the handle survives the call.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::handle::{ArchiveOpener, FsOpener, HandleCache};
use crate::index::LoaderDataBuilder;
use crate::manifest::{MANIFEST_NAME, Manifest};
use crate::preload::{PreloadTable, preload_archive};
use crate::resource::{Attributes, EntryResource, Resource, attributes_from_manifest};
use crate::security::SecurityProvider;
use crate::zip::{ArchiveFlavor, ZipArchive};

/// How entries are wrapped into resources.
#[derive(Clone, Default)]
pub enum LoaderMode {
    #[default]
    Plain,
    /// Open archives as JARs and attach a protection domain from the provider.
    Secure(Arc<dyn SecurityProvider>),
}

impl LoaderMode {
    pub fn is_secure(&self) -> bool {
        matches!(self, LoaderMode::Secure(_))
    }

    fn flavor(&self) -> ArchiveFlavor {
        match self {
            LoaderMode::Plain => ArchiveFlavor::Zip,
            LoaderMode::Secure(_) => ArchiveFlavor::Jar,
        }
    }
}

impl fmt::Debug for LoaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderMode::Plain => f.write_str("Plain"),
            LoaderMode::Secure(_) => f.write_str("Secure"),
        }
    }
}

/// Settings for a [`ResourceFile`].
#[derive(Debug, Clone)]
pub struct ResourceFileOptions {
    /// Keep the archive open between calls. Only safe when the file does
    /// not change on disk while in use.
    pub lock_archives: bool,
    pub mode: LoaderMode,
    /// Drop a cached handle that has not been used for this long.
    pub idle_timeout: Option<Duration>,
}

impl Default for ResourceFileOptions {
    fn default() -> Self {
        Self {
            lock_archives: true,
            mode: LoaderMode::Plain,
            idle_timeout: None,
        }
    }
}

impl ResourceFileOptions {
    pub fn lock_archives(mut self, lock: bool) -> Self {
        self.lock_archives = lock;
        self
    }

    pub fn secure(mut self, provider: Arc<dyn SecurityProvider>) -> Self {
        self.mode = LoaderMode::Secure(provider);
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }
}

struct Inner {
    cache: HandleCache,
    base_url: Arc<Url>,
    mode: LoaderMode,
    attributes: OnceLock<Option<Arc<Attributes>>>,
}

/// Shared handle to one archive on the classpath. Cloning is cheap and all
/// clones share the same cached archive handle.
#[derive(Clone)]
pub struct ResourceFile {
    inner: Arc<Inner>,
}

impl ResourceFile {
    /// Set up a resource file for `path`. The archive is not opened until the
    /// first operation needs it.
    pub fn new(path: impl Into<PathBuf>, options: ResourceFileOptions) -> Result<Self> {
        Self::with_opener(path, options, Arc::new(FsOpener))
    }

    pub fn with_opener(
        path: impl Into<PathBuf>,
        options: ResourceFileOptions,
        opener: Arc<dyn ArchiveOpener>,
    ) -> Result<Self> {
        let path = path.into();
        let base_url = file_url(&path)?;
        let cache = HandleCache::new(
            path,
            options.mode.flavor(),
            options.lock_archives,
            options.idle_timeout,
            opener,
        );
        Ok(Self {
            inner: Arc::new(Inner {
                cache,
                base_url: Arc::new(base_url),
                mode: options.mode,
                attributes: OnceLock::new(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        self.inner.cache.path()
    }

    /// `file:` URL of the archive.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn mode(&self) -> &LoaderMode {
        &self.inner.mode
    }

    /// Run `f` against a live handle and release it afterwards, whether or
    /// not `f` succeeded.
    pub(crate) fn with_archive<T>(&self, f: impl FnOnce(&ZipArchive) -> Result<T>) -> Result<T> {
        let archive = self.inner.cache.acquire()?;
        let result = f(archive.as_ref());
        self.inner.cache.release(archive);
        result
    }

    /// Look up an entry by exact name. No bytes are read here.
    pub fn get_resource(&self, name: &str) -> Result<Option<Resource>> {
        self.with_archive(|archive| {
            let Some(entry) = archive.entry(name) else {
                return Ok(None);
            };
            let signers: Arc<[String]> = archive.signers().into();
            let resource = EntryResource::new(self.clone(), entry.clone(), signers);
            Ok(Some(Resource::Entry(resource)))
        })
    }

    /// Materialize a preloadable archive into memory. `base_path` is the
    /// location the preloaded resources report as their origin. Returns
    /// `None` when the archive has no preload table.
    pub fn preload(&self, base_path: &Path) -> Result<Option<PreloadTable>> {
        let base_url = Arc::new(file_url(base_path)?);
        self.with_archive(|archive| {
            preload_archive(archive, base_url, |archive| {
                let attributes = typed_attributes(archive)?;
                let _ = self.inner.attributes.set(attributes.clone());
                Ok(attributes)
            })
        })
    }

    /// Main-section attributes of the manifest. A missing, unreadable or
    /// malformed manifest yields `None`; only failing to open the archive
    /// is an error.
    pub fn load_manifest_attributes(&self) -> Result<Option<HashMap<String, String>>> {
        self.with_archive(manifest_attributes)
    }

    /// Known manifest attributes, loaded once per resource file.
    pub fn resource_attributes(&self) -> Result<Option<Arc<Attributes>>> {
        if let Some(attributes) = self.inner.attributes.get() {
            return Ok(attributes.clone());
        }
        let loaded = self.with_archive(typed_attributes)?;
        Ok(self.inner.attributes.get_or_init(|| loaded).clone())
    }

    /// Classify every entry for the classpath index.
    pub fn build_class_path_cache_data(&self) -> Result<LoaderDataBuilder> {
        self.with_archive(|archive| {
            let mut builder = LoaderDataBuilder::new();
            for entry in archive.entries() {
                builder.add_entry(&entry.name);
            }
            debug!(
                path = %archive.path().display(),
                entries = archive.entries().len(),
                "built classpath index data"
            );
            Ok(builder)
        })
    }

    /// Close the cached archive handle, if any. The next operation reopens it.
    pub fn close(&self) {
        self.inner.cache.close();
    }

    /// Drop the cached handle if it has been idle past the configured timeout.
    pub fn reclaim_idle(&self) -> bool {
        self.inner.cache.reclaim_idle()
    }

    pub fn is_handle_cached(&self) -> bool {
        self.inner.cache.is_cached()
    }
}

impl fmt::Debug for ResourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFile")
            .field("path", &self.path())
            .field("mode", &self.inner.mode)
            .field("lock_archives", &self.inner.cache.is_locking())
            .finish()
    }
}

fn file_url(path: &Path) -> Result<Url> {
    Url::from_file_path(path).map_err(|_| Error::InvalidBaseLocation(path.to_path_buf()))
}

fn manifest_attributes(archive: &ZipArchive) -> Result<Option<HashMap<String, String>>> {
    let Some(entry) = archive.entry(MANIFEST_NAME) else {
        return Ok(None);
    };
    let bytes = match archive.read_entry(entry) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %archive.path().display(), error = %e, "ignoring unreadable manifest");
            return Ok(None);
        }
    };
    match Manifest::parse(&bytes) {
        Ok(manifest) => Ok(Some(manifest.into_main_attributes())),
        Err(e) => {
            debug!(path = %archive.path().display(), error = %e, "ignoring malformed manifest");
            Ok(None)
        }
    }
}

fn typed_attributes(archive: &ZipArchive) -> Result<Option<Arc<Attributes>>> {
    Ok(manifest_attributes(archive)?
        .as_ref()
        .and_then(attributes_from_manifest)
        .map(Arc::new))
}
