//! Named, byte-addressable artifacts served by a resource file.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, OnceLock};
use url::Url;

use crate::error::Result;
use crate::resource_file::{LoaderMode, ResourceFile};
use crate::security::{EntryContext, ProtectionDomain};
use crate::zip::ZipEntry;

/// Manifest main-section attributes a resource exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    SpecTitle,
    SpecVersion,
    SpecVendor,
    ClassPath,
    ImplTitle,
    ImplVersion,
    ImplVendor,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::SpecTitle,
        Attribute::SpecVersion,
        Attribute::SpecVendor,
        Attribute::ClassPath,
        Attribute::ImplTitle,
        Attribute::ImplVersion,
        Attribute::ImplVendor,
    ];

    /// Manifest header carrying this attribute.
    pub fn header_name(&self) -> &'static str {
        match self {
            Attribute::SpecTitle => "Specification-Title",
            Attribute::SpecVersion => "Specification-Version",
            Attribute::SpecVendor => "Specification-Vendor",
            Attribute::ClassPath => "Class-Path",
            Attribute::ImplTitle => "Implementation-Title",
            Attribute::ImplVersion => "Implementation-Version",
            Attribute::ImplVendor => "Implementation-Vendor",
        }
    }
}

pub type Attributes = HashMap<Attribute, String>;

/// Pick the known attributes out of raw manifest headers. `None` when the
/// manifest carries none of them.
pub fn attributes_from_manifest(main: &HashMap<String, String>) -> Option<Attributes> {
    let attributes: Attributes = Attribute::ALL
        .iter()
        .filter_map(|attr| main.get(attr.header_name()).map(|v| (*attr, v.clone())))
        .collect();
    (!attributes.is_empty()).then_some(attributes)
}

/// `jar:<base>!/<name>`
pub(crate) fn entry_url(base: &Url, name: &str) -> Result<Url> {
    Ok(Url::parse(&format!("jar:{base}!/{name}"))?)
}

/// A resource found in an archive.
#[derive(Debug, Clone)]
pub enum Resource {
    /// Bytes are read from the archive each time they are requested.
    Entry(EntryResource),
    /// Bytes were materialized up front.
    Memory(MemoryResource),
}

impl Resource {
    pub fn name(&self) -> &str {
        match self {
            Resource::Entry(r) => r.name(),
            Resource::Memory(r) => r.name(),
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            Resource::Entry(r) => r.len(),
            Resource::Memory(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn url(&self) -> Result<Url> {
        match self {
            Resource::Entry(r) => r.url().cloned(),
            Resource::Memory(r) => r.url(),
        }
    }

    pub fn bytes(&self) -> Result<Vec<u8>> {
        match self {
            Resource::Entry(r) => r.bytes(),
            Resource::Memory(r) => Ok(r.bytes().to_vec()),
        }
    }

    pub fn reader(&self) -> Result<Cursor<Vec<u8>>> {
        self.bytes().map(Cursor::new)
    }

    pub fn attributes(&self) -> Result<Option<Arc<Attributes>>> {
        match self {
            Resource::Entry(r) => r.attributes(),
            Resource::Memory(r) => Ok(r.attributes().cloned()),
        }
    }

    /// Trust descriptor; only secure-mode entry resources have one.
    pub fn protection_domain(&self) -> Result<Option<Arc<ProtectionDomain>>> {
        match self {
            Resource::Entry(r) => r.protection_domain(),
            Resource::Memory(_) => Ok(None),
        }
    }
}

/// An entry inside a live archive. Holds a share of its resource file, so
/// the file outlives every resource handed out from it.
#[derive(Clone)]
pub struct EntryResource {
    file: ResourceFile,
    entry: ZipEntry,
    url: OnceLock<Url>,
    signers: Arc<[String]>,
}

impl EntryResource {
    pub(crate) fn new(file: ResourceFile, entry: ZipEntry, signers: Arc<[String]>) -> Self {
        Self {
            file,
            entry,
            url: OnceLock::new(),
            signers,
        }
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn entry(&self) -> &ZipEntry {
        &self.entry
    }

    pub fn len(&self) -> u64 {
        self.entry.size
    }

    pub fn is_empty(&self) -> bool {
        self.entry.size == 0
    }

    pub fn url(&self) -> Result<&Url> {
        if let Some(url) = self.url.get() {
            return Ok(url);
        }
        let url = entry_url(self.file.base_url(), &self.entry.name)?;
        Ok(self.url.get_or_init(|| url))
    }

    /// Re-acquires the archive, reads the entry and releases it again.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        self.file.with_archive(|archive| archive.read_entry(&self.entry))
    }

    pub fn attributes(&self) -> Result<Option<Arc<Attributes>>> {
        self.file.resource_attributes()
    }

    pub fn protection_domain(&self) -> Result<Option<Arc<ProtectionDomain>>> {
        match self.file.mode() {
            LoaderMode::Plain => Ok(None),
            LoaderMode::Secure(provider) => {
                let context = EntryContext {
                    entry: &self.entry,
                    signers: &self.signers,
                };
                Ok(provider.protection_domain(&context, self.url()?))
            }
        }
    }
}

impl std::fmt::Debug for EntryResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryResource")
            .field("file", &self.file.path())
            .field("entry", &self.entry.name)
            .field("size", &self.entry.size)
            .finish()
    }
}

/// A resource whose bytes are owned in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryResource {
    base_url: Arc<Url>,
    name: String,
    bytes: Arc<[u8]>,
    attributes: Option<Arc<Attributes>>,
}

impl MemoryResource {
    pub fn new(
        base_url: Arc<Url>,
        bytes: impl Into<Arc<[u8]>>,
        name: impl Into<String>,
        attributes: Option<Arc<Attributes>>,
    ) -> Self {
        Self {
            base_url,
            name: name.into(),
            bytes: bytes.into(),
            attributes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn url(&self) -> Result<Url> {
        entry_url(&self.base_url, &self.name)
    }

    pub fn attributes(&self) -> Option<&Arc<Attributes>> {
        self.attributes.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_known_manifest_headers() {
        let main = HashMap::from([
            ("Implementation-Title".to_string(), "demo".to_string()),
            ("Class-Path".to_string(), "lib/a.jar".to_string()),
            ("Created-By".to_string(), "hand".to_string()),
        ]);
        let attributes = attributes_from_manifest(&main).unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[&Attribute::ImplTitle], "demo");
        assert_eq!(attributes[&Attribute::ClassPath], "lib/a.jar");

        let unrelated = HashMap::from([("Created-By".to_string(), "hand".to_string())]);
        assert!(attributes_from_manifest(&unrelated).is_none());
    }

    #[test]
    fn memory_resource_url_points_into_archive() {
        let base = Arc::new(Url::parse("file:///libs/app.jar").unwrap());
        let resource = MemoryResource::new(base, b"abc".to_vec(), "a/b.txt", None);
        assert_eq!(
            resource.url().unwrap().as_str(),
            "jar:file:///libs/app.jar!/a/b.txt"
        );
        assert_eq!(resource.len(), 3);
        assert_eq!(resource.bytes(), b"abc");
    }
}
