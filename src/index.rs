//! Per-archive classification data for a classpath-wide lookup cache.
//!
//! Every entry is either a class (by [`CLASS_EXTENSION`]) or a resource. The
//! builder records the package of each, plus a short-name record so that
//! entries sharing a basename across archives can be told apart later.

use std::collections::BTreeSet;
use xxhash_rust::xxh3::xxh3_64;

/// Extension of compiled class entries.
pub const CLASS_EXTENSION: &str = ".class";

/// Basename of an entry and where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameRecord {
    /// Last path segment, without a trailing `/` for directories.
    pub short_name: String,
    /// Everything before `short_name`, including the trailing `/`.
    pub parent: String,
    /// The entry name as stored in the archive.
    pub full_name: String,
}

/// Receives the data of an [`IndexRegistrar`].
pub trait IndexSink {
    fn class_package(&mut self, package: &str, hash: u64);
    fn resource_package(&mut self, package: &str, hash: u64);
    fn name(&mut self, record: &NameRecord);
}

/// Read side of the collected index data.
pub trait IndexRegistrar {
    fn class_packages(&self) -> Vec<&str>;
    fn resource_packages(&self) -> Vec<&str>;
    fn name_records(&self) -> &[NameRecord];

    fn class_package_hashes(&self) -> Vec<u64> {
        self.class_packages().into_iter().map(package_hash).collect()
    }

    fn resource_package_hashes(&self) -> Vec<u64> {
        self.resource_packages()
            .into_iter()
            .map(package_hash)
            .collect()
    }

    fn register_to(&self, sink: &mut dyn IndexSink) {
        for package in self.class_packages() {
            sink.class_package(package, package_hash(package));
        }
        for package in self.resource_packages() {
            sink.resource_package(package, package_hash(package));
        }
        for record in self.name_records() {
            sink.name(record);
        }
    }
}

/// Stable hash of a package name as shared with the classpath cache.
pub fn package_hash(package: &str) -> u64 {
    xxh3_64(package.as_bytes())
}

/// Package of an entry: its name up to the last `/`. Root entries live in
/// the empty package.
pub fn package_of(name: &str) -> &str {
    match name.rfind('/') {
        Some(idx) => &name[..idx],
        None => "",
    }
}

#[derive(Debug, Default, Clone)]
pub struct LoaderDataBuilder {
    class_packages: BTreeSet<String>,
    resource_packages: BTreeSet<String>,
    names: Vec<NameRecord>,
}

impl LoaderDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one entry name.
    pub fn add_entry(&mut self, name: &str) {
        if name.ends_with(CLASS_EXTENSION) {
            self.add_class_package_from_name(name);
            let start = name.rfind('/').map_or(0, |idx| idx + 1);
            self.add_possibly_duplicate_name_entry(name, start, name.len());
        } else {
            self.add_resource_package_from_name(name);
            if let Some(dir) = name.strip_suffix('/') {
                let start = dir.rfind('/').map_or(0, |idx| idx + 1);
                self.add_possibly_duplicate_name_entry(name, start, dir.len());
            } else {
                let start = name.rfind('/').map_or(0, |idx| idx + 1);
                self.add_possibly_duplicate_name_entry(name, start, name.len());
            }
        }
    }

    pub fn add_class_package_from_name(&mut self, name: &str) {
        insert_missing(&mut self.class_packages, package_of(name));
    }

    pub fn add_resource_package_from_name(&mut self, name: &str) {
        insert_missing(&mut self.resource_packages, package_of(name));
    }

    /// Record `name[start..end]` as the short name of `name`.
    pub fn add_possibly_duplicate_name_entry(&mut self, name: &str, start: usize, end: usize) {
        self.names.push(NameRecord {
            short_name: name[start..end].to_string(),
            parent: name[..start].to_string(),
            full_name: name.to_string(),
        });
    }

    /// Records whose short name is shared with at least one other record.
    pub fn duplicate_names(&self) -> Vec<&NameRecord> {
        let mut seen = std::collections::HashMap::<&str, usize>::new();
        for record in &self.names {
            *seen.entry(record.short_name.as_str()).or_default() += 1;
        }
        self.names
            .iter()
            .filter(|record| seen[record.short_name.as_str()] > 1)
            .collect()
    }
}

fn insert_missing(set: &mut BTreeSet<String>, package: &str) {
    if !set.contains(package) {
        set.insert(package.to_string());
    }
}

impl IndexRegistrar for LoaderDataBuilder {
    fn class_packages(&self) -> Vec<&str> {
        self.class_packages.iter().map(String::as_str).collect()
    }

    fn resource_packages(&self) -> Vec<&str> {
        self.resource_packages.iter().map(String::as_str).collect()
    }

    fn name_records(&self) -> &[NameRecord] {
        &self.names
    }
}
