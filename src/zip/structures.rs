use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Error, Result};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::invalid("bad end of central directory record"));
        }

        // disk numbers are irrelevant for single-file archives
        let mut cursor = Cursor::new(&data[8..]);

        Ok(Self {
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EocdLocator {
    pub eocd64_offset: u64,
}

impl Zip64EocdLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::invalid("missing ZIP64 end of central directory locator"));
        }

        let mut cursor = Cursor::new(&data[8..]);
        Ok(Self {
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64Eocd {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64Eocd {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::invalid("bad ZIP64 end of central directory record"));
        }

        // skip record size, versions, disk numbers and per-disk entry count
        let mut cursor = Cursor::new(&data[32..]);
        Ok(Self {
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// One central directory record
///
/// Sizes and the header offset are already widened from the ZIP64 extra
/// field where the fixed header saturated at `0xFFFFFFFF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    /// Full path within the archive, `/`-separated, UTF-8
    pub name: String,
    pub compression_method: CompressionMethod,
    /// Bytes occupied in the archive
    pub compressed_size: u64,
    /// Uncompressed length, the number of bytes a read of this entry yields
    pub size: u64,
    /// Recorded checksum; reads do not verify it
    pub crc32: u32,
    /// Offset of the Local File Header
    pub lfh_offset: u64,
    /// True when the name ends with `/`
    pub is_directory: bool,
}

impl ZipEntry {
    /// Name after the last `/`, ignoring a trailing directory marker.
    pub fn file_name(&self) -> &str {
        let trimmed = self.name.strip_suffix('/').unwrap_or(&self.name);
        match trimmed.rfind('/') {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> ZipEntry {
        ZipEntry {
            name: name.to_string(),
            compression_method: CompressionMethod::Stored,
            compressed_size: 0,
            size: 0,
            crc32: 0,
            lfh_offset: 0,
            is_directory: name.ends_with('/'),
        }
    }

    #[test]
    fn file_name_strips_directories() {
        assert_eq!(entry("a/b/Foo.class").file_name(), "Foo.class");
        assert_eq!(entry("a/b/").file_name(), "b");
        assert_eq!(entry("top.txt").file_name(), "top.txt");
    }

    #[test]
    fn eocd_rejects_wrong_signature() {
        let mut raw = [0u8; EndOfCentralDirectory::SIZE];
        raw[0..4].copy_from_slice(b"PK\x01\x02");
        assert!(EndOfCentralDirectory::from_bytes(&raw).is_err());
    }

    #[test]
    fn eocd_flags_zip64_markers() {
        let mut raw = [0u8; EndOfCentralDirectory::SIZE];
        raw[0..4].copy_from_slice(EndOfCentralDirectory::SIGNATURE);
        raw[10..12].copy_from_slice(&0xFFFFu16.to_le_bytes());
        let eocd = EndOfCentralDirectory::from_bytes(&raw).unwrap();
        assert!(eocd.is_zip64());
    }
}
