//! Archive fixtures and an instrumented opener shared by the integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use jarload::io::{LocalFileReader, ReadAt};
use jarload::zip::{ArchiveFlavor, ZipArchive};
use jarload::{ArchiveOpener, SIZE_ENTRY};
use zip::write::SimpleFileOptions;

/// Write an archive with the `zip` crate. Names ending in `/` become
/// directory entries; file entries are deflated.
pub fn write_jar<D: AsRef<[u8]>>(dir: &Path, file_name: &str, entries: &[(&str, D)]) -> PathBuf {
    let path = dir.join(file_name);
    let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
    let deflated = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, stored).unwrap();
        } else if *name == SIZE_ENTRY {
            writer.start_file(*name, stored).unwrap();
            writer.write_all(data.as_ref()).unwrap();
        } else {
            writer.start_file(*name, deflated).unwrap();
            writer.write_all(data.as_ref()).unwrap();
        }
    }
    writer.finish().unwrap();
    path
}

/// Write a preloadable archive: the size entry declaring `declared`, then
/// `entries` in order.
pub fn write_preload_jar<D: AsRef<[u8]>>(
    dir: &Path,
    file_name: &str,
    declared: u16,
    entries: &[(&str, D)],
) -> PathBuf {
    let mut all = vec![(SIZE_ENTRY, declared.to_le_bytes().to_vec())];
    all.extend(entries.iter().map(|(name, data)| (*name, data.as_ref().to_vec())));
    write_jar(dir, file_name, &all)
}

/// Minimal STORED-only ZIP writer. Unlike the `zip` crate it happily writes
/// duplicate names, which lets tests build corrupt preload archives.
pub fn write_raw_stored<D: AsRef<[u8]>>(
    dir: &Path,
    file_name: &str,
    entries: &[(&str, D)],
) -> PathBuf {
    let entries: Vec<_> = entries
        .iter()
        .map(|(name, data)| (name.as_bytes(), 0u16, data.as_ref()))
        .collect();
    write_raw(dir, file_name, &entries)
}

/// Raw ZIP writer taking `(name, method, data)` triples. `data` is written
/// as-is whatever the method says, so an unknown method produces an entry
/// the reader refuses to decode. Names are raw bytes and need not be UTF-8.
pub fn write_raw(dir: &Path, file_name: &str, entries: &[(&[u8], u16, &[u8])]) -> PathBuf {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for &(name, method, data) in entries {
        let offset = out.len() as u32;
        let name_len = name.len() as u16;
        let size = data.len() as u32;

        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&[0; 4]); // time, date
        out.extend_from_slice(&0u32.to_le_bytes()); // crc, unchecked by the reader
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(data);

        central.extend_from_slice(b"PK\x01\x02");
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&method.to_le_bytes());
        central.extend_from_slice(&[0; 4]);
        central.extend_from_slice(&0u32.to_le_bytes());
        central.extend_from_slice(&size.to_le_bytes());
        central.extend_from_slice(&size.to_le_bytes());
        central.extend_from_slice(&name_len.to_le_bytes());
        central.extend_from_slice(&[0; 12]); // extra, comment, disk, attributes
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name);
    }

    let cd_offset = out.len() as u32;
    let count = entries.len() as u16;
    out.extend_from_slice(&central);
    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&(central.len() as u32).to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());

    let path = dir.join(file_name);
    std::fs::write(&path, out).unwrap();
    path
}

/// Opens archives from disk while counting opens and live handles.
#[derive(Default)]
pub struct TrackingOpener {
    opens: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl TrackingOpener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl ArchiveOpener for TrackingOpener {
    fn open(&self, path: &Path, flavor: ArchiveFlavor) -> jarload::Result<ZipArchive> {
        let reader = LocalFileReader::new(path)?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        let tracked = TrackedReader {
            inner: reader,
            live: Arc::clone(&self.live),
        };
        ZipArchive::from_reader(path, Box::new(tracked), flavor)
    }
}

struct TrackedReader {
    inner: LocalFileReader,
    live: Arc<AtomicUsize>,
}

impl ReadAt for TrackedReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read_at(offset, buf)
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
