//! Low-level ZIP archive parser.
//!
//! This module decodes the binary ZIP structures of an archive, reading
//! from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If any EOCD field overflowed, follow the ZIP64 locator to the ZIP64 EOCD
//! 3. Read the whole Central Directory in one call and decode every entry
//! 4. On demand, read an entry's Local File Header to find its data
//!
//! Entry names must be valid UTF-8. Lookups match names exactly, so a
//! lossily decoded name could never be found again; such archives are
//! rejected as invalid instead.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This bounds the backward search for an EOCD that is followed by a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// ZIP64 extended information extra field tag.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Low-level ZIP file parser.
///
/// Reads and decodes ZIP structures from a data source. It is generic over
/// the reader so the same code serves local files and in-memory buffers.
///
/// ## Usage
///
/// Normally used through [`ZipArchive`](super::ZipArchive), which keeps
/// the parsed entries and a by-name index next to the parser.
///
/// ## Example
///
/// ```ignore
/// let parser = ZipParser::new(reader);
/// for entry in parser.read_central_directory()? {
///     let offset = parser.data_offset(&entry)?;
///     // Read compressed data from offset...
/// }
/// ```
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: R,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    /// Create a new parser for the given reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The data source; its [`ReadAt::size`] is taken once here
    ///
    /// # Returns
    ///
    /// A parser ready to read the archive. Nothing is read until
    /// [`read_central_directory`](Self::read_central_directory) is called.
    pub fn new(reader: R) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The EOCD sits at the end of the file. The common case, an archive
    /// without a comment, costs a single 22-byte read. Otherwise the last
    /// 64 KiB plus the record size is searched backwards for the signature.
    /// A candidate is accepted only when its comment length reaches exactly
    /// to the end of the file, so signature bytes inside a comment are
    /// skipped.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of the EOCD in the file).
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArchive`] if the file is smaller than an EOCD or
    ///   no valid EOCD is found
    /// - [`Error::Io`] if the underlying reads fail
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            return Err(Error::invalid("file too small for a ZIP archive"));
        }

        // Common case: no archive comment, the record sits at the very end.
        let offset = self.size - eocd_size;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf)?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0, 0] {
            return Ok((EndOfCentralDirectory::from_bytes(&buf)?, offset));
        }

        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;
        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf)?;

        // Scan backwards; a hit only counts if its comment runs exactly to EOF.
        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd =
                    EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                return Ok((eocd, search_start + i as u64));
            }
        }

        Err(Error::invalid("end of central directory not found"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// The ZIP64 locator sits immediately before the regular EOCD and
    /// points at the ZIP64 EOCD, which carries the 64-bit entry count,
    /// directory size and directory offset.
    ///
    /// # Arguments
    ///
    /// * `eocd_offset` - Offset of the regular EOCD, as returned by
    ///   [`find_eocd`](Self::find_eocd)
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchive`] if the locator or the ZIP64 EOCD
    /// is missing or has a bad signature.
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64Eocd> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EocdLocator::SIZE as u64)
            .ok_or_else(|| Error::invalid("no room for ZIP64 locator"))?;
        let mut locator_buf = vec![0u8; Zip64EocdLocator::SIZE];
        self.reader.read_exact_at(locator_offset, &mut locator_buf)?;
        let locator = Zip64EocdLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64Eocd::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)?;
        Zip64Eocd::from_bytes(&eocd64_buf)
    }

    /// Parse the whole Central Directory.
    ///
    /// Resolves the directory location (through ZIP64 when needed), reads
    /// it in a single call and decodes one [`ZipEntry`] per record.
    ///
    /// # Returns
    ///
    /// Every entry in archive order, directories included. Duplicate names
    /// are kept as they appear.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchive`] if:
    /// - the directory extends past the end of the file
    /// - a record is truncated or has a bad signature
    /// - an entry name is not valid UTF-8
    pub fn read_central_directory(&self) -> Result<Vec<ZipEntry>> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if cd_offset.saturating_add(cd_size) > self.size {
            return Err(Error::invalid("central directory extends past end of file"));
        }
        // Every record is at least CDFH_MIN_SIZE bytes; cap the preallocation
        // so a lying entry count cannot request absurd memory.
        let capacity = total_entries.min(cd_size / CDFH_MIN_SIZE as u64) as usize;

        let mut cd_data = vec![0u8; cd_size as usize];
        self.reader.read_exact_at(cd_offset, &mut cd_data)?;

        let mut entries = Vec::with_capacity(capacity);
        let mut cursor = Cursor::new(cd_data.as_slice());
        for _ in 0..total_entries {
            entries.push(parse_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Get the offset where an entry's data begins.
    ///
    /// The Local File Header has its own name and extra field lengths,
    /// which may differ from the Central Directory's, so it has to be read
    /// to locate the data.
    ///
    /// # Arguments
    ///
    /// * `entry` - An entry from [`read_central_directory`](Self::read_central_directory)
    ///
    /// # Returns
    ///
    /// The byte offset of the entry's (possibly compressed) data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchive`] if the LFH signature is wrong.
    pub fn data_offset(&self, entry: &ZipEntry) -> Result<u64> {
        let mut lfh_buf = [0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut lfh_buf)?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(Error::invalid(format!(
                "bad local file header for {}",
                entry.name
            )));
        }

        let mut cursor = Cursor::new(&lfh_buf[26..]);
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// The underlying data source.
    pub fn reader(&self) -> &R {
        &self.reader
    }
}

/// Parse one Central Directory File Header.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipEntry> {
    let mut sig = [0u8; 4];
    cursor
        .read_exact(&mut sig)
        .map_err(|_| Error::invalid("central directory truncated"))?;
    if sig != CDFH_SIGNATURE {
        return Err(Error::invalid("bad central directory file header"));
    }

    // versions and general purpose flags
    cursor.set_position(cursor.position() + 6);
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    // modification time and date
    cursor.set_position(cursor.position() + 4);
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    // disk number start, internal and external attributes
    cursor.set_position(cursor.position() + 8);
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut name_bytes)?;
    let name = String::from_utf8(name_bytes)
        .map_err(|_| Error::invalid("entry name is not valid UTF-8"))?;

    let extra_field_end = cursor.position() + extra_field_length as u64;
    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;
        let field_end = cursor.position() + field_size as u64;

        if header_id == ZIP64_EXTRA_ID {
            // Only the fields saturated in the fixed header are present.
            if size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }
        cursor.set_position(field_end);
    }

    cursor.set_position(extra_field_end + file_comment_length as u64);

    Ok(ZipEntry {
        is_directory: name.ends_with('/'),
        name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        size,
        crc32,
        lfh_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(comment: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.add_directory("pkg/", stored).unwrap();
        writer.start_file("pkg/A.class", stored).unwrap();
        writer.write_all(b"class-a").unwrap();
        writer.start_file("readme.txt", stored).unwrap();
        writer.write_all(b"hello").unwrap();
        writer.set_comment(comment);
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn lists_entries_in_archive_order() {
        let parser = ZipParser::new(archive(""));
        let names: Vec<_> = parser
            .read_central_directory()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["pkg/", "pkg/A.class", "readme.txt"]);
    }

    #[test]
    fn finds_eocd_behind_comment() {
        let parser = ZipParser::new(archive("built by a test"));
        let entries = parser.read_central_directory().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_directory);
        assert_eq!(entries[2].size, 5);
    }

    #[test]
    fn data_offset_points_at_content() {
        let parser = ZipParser::new(archive(""));
        let entries = parser.read_central_directory().unwrap();
        let offset = parser.data_offset(&entries[1]).unwrap();
        let mut buf = [0u8; 7];
        parser.reader().read_exact_at(offset, &mut buf).unwrap();
        assert_eq!(&buf, b"class-a");
    }

    #[test]
    fn rejects_non_utf8_entry_names() {
        let mut data = archive("");
        // Turn "readme.txt" into "r\xffadme.txt" in the central directory.
        let cd = data
            .windows(4)
            .rposition(|w| w == CDFH_SIGNATURE)
            .unwrap();
        data[cd + CDFH_MIN_SIZE + 1] = 0xFF;

        let parser = ZipParser::new(data);
        assert!(matches!(
            parser.read_central_directory(),
            Err(Error::InvalidArchive(msg)) if msg.contains("UTF-8")
        ));
    }

    #[test]
    fn rejects_non_zip_data() {
        let parser = ZipParser::new(vec![7u8; 128]);
        assert!(matches!(
            parser.read_central_directory(),
            Err(Error::InvalidArchive(_))
        ));
    }
}
