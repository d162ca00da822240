//! ZIP container access.
//!
//! - [`structures`]: ZIP format records (EOCD, ZIP64 records, entries)
//! - [`parser`]: binary parsing of those records from a [`ReadAt`](crate::io::ReadAt) source
//! - [`archive`]: an open archive handle with name lookup and entry reads
//!
//! Supports single-disk archives, ZIP64 extensions, and the STORED and
//! DEFLATE methods. Encryption and other compression methods are not handled.

mod archive;
mod parser;
mod structures;

pub use archive::{ArchiveFlavor, ZipArchive};
pub use parser::ZipParser;
pub use structures::*;
