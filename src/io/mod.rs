//! Random access and bounded reads over archive bytes.

mod bytes;
mod local;

pub use bytes::load_bytes;
pub use local::LocalFileReader;

use std::io;

/// Trait for random access reading from a data source
///
/// Reads are positional and take `&self`, so one source can be shared by
/// every thread reading the same archive without a seek lock.
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer from `offset`, failing on a short source.
    fn read_exact_at(&self, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read_at(offset, buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("source ended at offset {offset}"),
                    ));
                }
                Ok(n) => {
                    offset += n as u64;
                    buf = &mut buf[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Box<T> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}

/// In-memory archives, mostly handy for tests and already-mapped data.
impl ReadAt for Vec<u8> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.len());
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}

/// A `Read` view over `len` bytes of a [`ReadAt`] source starting at `offset`.
///
/// Reports end of stream once `len` bytes are consumed, even if the source
/// continues; a source that ends early simply yields fewer bytes.
pub struct SectionReader<'a, R: ReadAt + ?Sized> {
    source: &'a R,
    offset: u64,
    remaining: u64,
}

impl<'a, R: ReadAt + ?Sized> SectionReader<'a, R> {
    pub fn new(source: &'a R, offset: u64, len: u64) -> Self {
        Self {
            source,
            offset,
            remaining: len,
        }
    }
}

impl<R: ReadAt + ?Sized> io::Read for SectionReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.source.read_at(self.offset, &mut buf[..want])?;
        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}
