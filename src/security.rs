//! Trust descriptors for resources loaded in secure mode.
//!
//! The loader never interprets signatures itself. In secure mode each entry
//! resource asks a [`SecurityProvider`] for its [`ProtectionDomain`], keyed by
//! the entry and its resolved URL.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use crate::zip::ZipEntry;

/// Opaque trust descriptor attached to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionDomain {
    /// Location the code was loaded from.
    pub code_source: Url,
    /// Signature blocks of the archive the entry came from.
    pub signers: Vec<String>,
}

/// What a provider gets to see about an entry.
#[derive(Debug, Clone, Copy)]
pub struct EntryContext<'a> {
    pub entry: &'a ZipEntry,
    pub signers: &'a [String],
}

/// Source of protection domains for secure-mode resources.
pub trait SecurityProvider: Send + Sync {
    fn protection_domain(&self, entry: &EntryContext<'_>, url: &Url)
    -> Option<Arc<ProtectionDomain>>;
}

/// Hands out one shared domain per distinct signer set, all rooted at the
/// archive's code source.
pub struct CodeSourceProvider {
    code_source: Url,
    domains: Mutex<HashMap<Vec<String>, Arc<ProtectionDomain>>>,
}

impl CodeSourceProvider {
    pub fn new(code_source: Url) -> Self {
        Self {
            code_source,
            domains: Mutex::new(HashMap::new()),
        }
    }
}

impl SecurityProvider for CodeSourceProvider {
    fn protection_domain(
        &self,
        entry: &EntryContext<'_>,
        _url: &Url,
    ) -> Option<Arc<ProtectionDomain>> {
        let mut domains = self.domains.lock();
        let domain = domains
            .entry(entry.signers.to_vec())
            .or_insert_with(|| {
                Arc::new(ProtectionDomain {
                    code_source: self.code_source.clone(),
                    signers: entry.signers.to_vec(),
                })
            });
        Some(Arc::clone(domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::CompressionMethod;

    fn entry(name: &str) -> ZipEntry {
        ZipEntry {
            name: name.to_string(),
            compression_method: CompressionMethod::Stored,
            compressed_size: 0,
            size: 0,
            crc32: 0,
            lfh_offset: 0,
            is_directory: false,
        }
    }

    #[test]
    fn shares_domain_per_signer_set() {
        let source = Url::parse("file:///libs/app.jar").unwrap();
        let provider = CodeSourceProvider::new(source.clone());
        let url = Url::parse("jar:file:///libs/app.jar!/A.class").unwrap();
        let signers = vec!["META-INF/A.SF".to_string()];

        let a = entry("A.class");
        let b = entry("B.class");
        let first = provider
            .protection_domain(&EntryContext { entry: &a, signers: &signers }, &url)
            .unwrap();
        let second = provider
            .protection_domain(&EntryContext { entry: &b, signers: &signers }, &url)
            .unwrap();
        let unsigned = provider
            .protection_domain(&EntryContext { entry: &b, signers: &[] }, &url)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &unsigned));
        assert_eq!(first.code_source, source);
        assert!(unsigned.signers.is_empty());
    }
}
