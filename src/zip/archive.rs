use flate2::read::DeflateDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt, SectionReader, load_bytes};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipEntry};

/// Which view of the container a handle offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFlavor {
    /// Plain ZIP: entries and their bytes only.
    Zip,
    /// JAR: additionally tracks the signature blocks under `META-INF/`.
    Jar,
}

/// An open archive: the reader plus its parsed central directory.
///
/// The central directory is decoded once, in [`open`](Self::open) or
/// [`from_reader`](Self::from_reader); afterwards lookups are in-memory and
/// only content reads touch the source. All reads take `&self`, so one
/// handle can serve any number of threads at once.
///
/// Dropping the value closes the underlying file.
///
/// ## Example
///
/// ```ignore
/// let archive = ZipArchive::open(Path::new("app.jar"), ArchiveFlavor::Zip)?;
/// if let Some(entry) = archive.entry("META-INF/MANIFEST.MF") {
///     let bytes = archive.read_entry(entry)?;
/// }
/// ```
pub struct ZipArchive {
    path: PathBuf,
    flavor: ArchiveFlavor,
    parser: ZipParser<Box<dyn ReadAt>>,
    entries: Vec<ZipEntry>,
    by_name: HashMap<String, usize>,
    signers: Vec<String>,
}

impl ZipArchive {
    /// Open the archive at `path` and read its central directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Archive on the local filesystem
    /// * `flavor` - Whether to also collect JAR signature blocks
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be opened or read
    /// - [`Error::InvalidArchive`] if it is not a readable ZIP archive
    pub fn open(path: &Path, flavor: ArchiveFlavor) -> Result<Self> {
        let reader = LocalFileReader::new(path)?;
        Self::from_reader(path, Box::new(reader), flavor)
    }

    /// Build a handle over an arbitrary source.
    ///
    /// `path` is only a label for logs and errors; nothing is opened
    /// through it. When an archive holds the same name more than once,
    /// [`entry`](Self::entry) resolves to the first occurrence.
    pub fn from_reader(path: &Path, reader: Box<dyn ReadAt>, flavor: ArchiveFlavor) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let entries = parser.read_central_directory()?;

        let mut by_name = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            by_name.entry(entry.name.clone()).or_insert(idx);
        }

        let signers = match flavor {
            ArchiveFlavor::Zip => Vec::new(),
            ArchiveFlavor::Jar => entries
                .iter()
                .filter(|e| is_signature_block(&e.name))
                .map(|e| e.name.clone())
                .collect(),
        };

        Ok(Self {
            path: path.to_path_buf(),
            flavor,
            parser,
            entries,
            by_name,
            signers,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flavor(&self) -> ArchiveFlavor {
        self.flavor
    }

    /// Entries in central directory order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Exact-name lookup.
    pub fn entry(&self, name: &str) -> Option<&ZipEntry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// Signature block entries (`META-INF/*.SF`, `*.RSA`, ...). Always empty
    /// for [`ArchiveFlavor::Zip`].
    pub fn signers(&self) -> &[String] {
        &self.signers
    }

    /// Stream over the decompressed content of `entry`.
    ///
    /// Reads the entry's Local File Header to find the data, then wraps the
    /// compressed range in a decoder for its method.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedCompression`] for anything but STORED or DEFLATE
    /// - [`Error::InvalidArchive`] if the Local File Header is damaged
    pub fn entry_reader(&self, entry: &ZipEntry) -> Result<Box<dyn Read + '_>> {
        let offset = self.parser.data_offset(entry)?;
        let raw = SectionReader::new(self.parser.reader(), offset, entry.compressed_size);
        match entry.compression_method {
            CompressionMethod::Stored => Ok(Box::new(raw)),
            CompressionMethod::Deflate => Ok(Box::new(DeflateDecoder::new(raw))),
            CompressionMethod::Unknown(method) => Err(Error::UnsupportedCompression {
                name: entry.name.clone(),
                method,
            }),
        }
    }

    /// Read the entry's full declared length.
    pub fn read_entry(&self, entry: &ZipEntry) -> Result<Vec<u8>> {
        self.read_prefix(entry, entry.size)
    }

    /// Read exactly `len` leading bytes of the entry.
    ///
    /// A stream that ends before `len` bytes fails with an
    /// [`UnexpectedEof`](std::io::ErrorKind::UnexpectedEof) I/O error.
    pub fn read_prefix(&self, entry: &ZipEntry, len: u64) -> Result<Vec<u8>> {
        let len = usize::try_from(len)
            .map_err(|_| Error::invalid(format!("entry {} too large to load", entry.name)))?;
        Ok(load_bytes(self.entry_reader(entry)?, len)?)
    }
}

fn is_signature_block(name: &str) -> bool {
    let Some(file) = name.strip_prefix("META-INF/") else {
        return false;
    };
    if file.contains('/') {
        return false;
    }
    let upper = file.to_ascii_uppercase();
    [".SF", ".RSA", ".DSA", ".EC"]
        .iter()
        .any(|ext| upper.ends_with(ext))
}

impl std::fmt::Debug for ZipArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchive")
            .field("path", &self.path)
            .field("flavor", &self.flavor)
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn build(files: &[(&str, &[u8], zip::CompressionMethod)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data, method) in files {
            let options = SimpleFileOptions::default().compression_method(*method);
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn open(bytes: Vec<u8>, flavor: ArchiveFlavor) -> ZipArchive {
        ZipArchive::from_reader(Path::new("mem.jar"), Box::new(bytes), flavor).unwrap()
    }

    #[test]
    fn reads_stored_and_deflated_entries() {
        let text = b"lorem ipsum ".repeat(64);
        let archive = open(
            build(&[
                ("a.txt", b"stored bytes".as_slice(), zip::CompressionMethod::Stored),
                ("b.txt", text.as_slice(), zip::CompressionMethod::Deflated),
            ]),
            ArchiveFlavor::Zip,
        );

        let a = archive.entry("a.txt").unwrap();
        assert_eq!(archive.read_entry(a).unwrap(), b"stored bytes");

        let b = archive.entry("b.txt").unwrap();
        assert_eq!(b.compression_method, CompressionMethod::Deflate);
        assert_eq!(archive.read_entry(b).unwrap(), text);
        assert_eq!(archive.read_prefix(b, 5).unwrap(), b"lorem");
    }

    #[test]
    fn lookup_is_exact() {
        let archive = open(
            build(&[("dir/x.txt", b"x".as_slice(), zip::CompressionMethod::Stored)]),
            ArchiveFlavor::Zip,
        );
        assert!(archive.entry("dir/x.txt").is_some());
        assert!(archive.entry("x.txt").is_none());
        assert!(archive.entry("DIR/x.txt").is_none());
    }

    #[test]
    fn jar_flavor_collects_signature_blocks() {
        let bytes = build(&[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n".as_slice(), zip::CompressionMethod::Stored),
            ("META-INF/SIGNER.SF", b"sf".as_slice(), zip::CompressionMethod::Stored),
            ("META-INF/SIGNER.RSA", b"rsa".as_slice(), zip::CompressionMethod::Stored),
            ("META-INF/sub/NOT.SF", b"no".as_slice(), zip::CompressionMethod::Stored),
        ]);

        let jar = open(bytes.clone(), ArchiveFlavor::Jar);
        assert_eq!(jar.signers(), ["META-INF/SIGNER.SF", "META-INF/SIGNER.RSA"]);

        let plain = open(bytes, ArchiveFlavor::Zip);
        assert!(plain.signers().is_empty());
    }
}
