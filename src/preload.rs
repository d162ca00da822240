//! Bulk preloading of archives that declare themselves preloadable.
//!
//! A preloadable archive starts with the [`SIZE_ENTRY`] entry holding a
//! little-endian `u16` count of the entries that follow it. Those entries are
//! read once into an open-addressed [`PreloadTable`], after which lookups
//! never touch the archive again.

use std::sync::Arc;
use tracing::debug;
use url::Url;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Error, Result};
use crate::resource::{Attributes, MemoryResource, Resource};
use crate::zip::ZipArchive;

/// Reserved name of the first entry in a preloadable archive.
pub const SIZE_ENTRY: &str = "META-INF/jb/$$size$$";

/// Outcome of probing the table for a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The name occupies this slot.
    Found(usize),
    /// The name is absent; this is the slot it would go into.
    Vacant(usize),
    /// The name is absent and no slot is free.
    Full,
}

/// Name to resource table with linear probing.
///
/// Sized for a declared entry count `n` at `((n * 4) + 1) & !1` slots, which
/// keeps the load factor at or below 25%.
#[derive(Debug, Clone)]
pub struct PreloadTable {
    slots: Vec<Option<MemoryResource>>,
    len: usize,
}

impl PreloadTable {
    pub fn for_declared_count(count: u16) -> Self {
        let slots = ((count as usize * 4) + 1) & !1;
        Self {
            slots: vec![None; slots],
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn probe(&self, name: &str) -> Probe {
        let slots = self.slots.len();
        if slots == 0 {
            return Probe::Full;
        }

        let start = (xxh3_64(name.as_bytes()) % slots as u64) as usize;
        for step in 0..slots {
            let idx = (start + step) % slots;
            match &self.slots[idx] {
                None => return Probe::Vacant(idx),
                Some(resource) if resource.name() == name => return Probe::Found(idx),
                Some(_) => {}
            }
        }
        Probe::Full
    }

    /// Insert a resource under its name. A name that is already present is
    /// an error and leaves the table unchanged.
    pub fn insert(&mut self, resource: MemoryResource) -> Result<()> {
        match self.probe(resource.name()) {
            Probe::Vacant(idx) => {
                self.slots[idx] = Some(resource);
                self.len += 1;
                Ok(())
            }
            Probe::Found(_) => Err(Error::DuplicateName(resource.name().to_string())),
            Probe::Full => Err(Error::invalid(format!(
                "preload table full, cannot add {}",
                resource.name()
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MemoryResource> {
        match self.probe(name) {
            Probe::Found(idx) => self.slots[idx].as_ref(),
            Probe::Vacant(_) | Probe::Full => None,
        }
    }

    /// Lookup in the loader's resource form.
    pub fn get_resource(&self, name: &str) -> Option<Resource> {
        self.get(name).cloned().map(Resource::Memory)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryResource> {
        self.slots.iter().flatten()
    }
}

/// Read the preload table out of `archive`, or `None` if the archive does
/// not start with [`SIZE_ENTRY`].
///
/// `load_attributes` runs only once the size entry has been read, so an
/// archive that is not preloadable never has its manifest touched.
pub(crate) fn preload_archive(
    archive: &ZipArchive,
    base_url: Arc<Url>,
    load_attributes: impl FnOnce(&ZipArchive) -> Result<Option<Arc<Attributes>>>,
) -> Result<Option<PreloadTable>> {
    let entries = archive.entries();
    let Some((size_entry, rest)) = entries.split_first() else {
        return Ok(None);
    };
    if size_entry.name != SIZE_ENTRY {
        return Ok(None);
    }

    let raw = archive.read_prefix(size_entry, 2)?;
    let declared = u16::from_le_bytes([raw[0], raw[1]]);
    let attributes = load_attributes(archive)?;

    let mut table = PreloadTable::for_declared_count(declared);
    for entry in rest.iter().take(declared as usize) {
        if let Probe::Found(_) = table.probe(&entry.name) {
            return Err(Error::DuplicateName(entry.name.clone()));
        }
        let content = archive.read_entry(entry)?;
        table.insert(MemoryResource::new(
            Arc::clone(&base_url),
            content,
            entry.name.clone(),
            attributes.clone(),
        ))?;
    }

    debug!(
        path = %archive.path().display(),
        declared,
        loaded = table.len(),
        "preloaded archive"
    );
    Ok(Some(table))
}
