//! # jarload
//!
//! Classpath resource files backed by JAR/ZIP archives.
//!
//! A [`ResourceFile`] wraps one archive and serves the lookups a class
//! loader needs: resources by exact name, manifest attributes, and the
//! package/name data for a classpath-wide index. The archive handle is
//! opened lazily and, unless disabled, cached between calls.
//!
//! ## Features
//!
//! - Lazy, cached archive handles with a double-checked open
//! - Exact-name lookup with content read on demand
//! - Bulk preload of archives carrying a preload table
//! - Lenient manifest attribute loading
//! - Class/resource classification for classpath indexing
//! - Secure mode with pluggable protection domains
//!
//! ## Example
//!
//! ```no_run
//! use jarload::{ResourceFile, ResourceFileOptions};
//!
//! fn main() -> jarload::Result<()> {
//!     let file = ResourceFile::new("/opt/app/lib/app.jar", ResourceFileOptions::default())?;
//!
//!     if let Some(resource) = file.get_resource("com/example/Main.class")? {
//!         println!("{} is {} bytes", resource.url()?, resource.bytes()?.len());
//!     }
//!
//!     let index = file.build_class_path_cache_data()?;
//!     println!("{} shared basenames", index.duplicate_names().len());
//!
//!     file.close();
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod handle;
pub mod index;
pub mod io;
pub mod manifest;
pub mod preload;
pub mod resource;
pub mod resource_file;
pub mod security;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use handle::{ArchiveOpener, FsOpener, HandleCache};
pub use index::{IndexRegistrar, IndexSink, LoaderDataBuilder, NameRecord};
pub use manifest::Manifest;
pub use preload::{PreloadTable, SIZE_ENTRY};
pub use resource::{Attribute, Attributes, EntryResource, MemoryResource, Resource};
pub use resource_file::{LoaderMode, ResourceFile, ResourceFileOptions};
pub use security::{CodeSourceProvider, ProtectionDomain, SecurityProvider};
