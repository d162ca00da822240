use std::io::{self, Read};

/// Read exactly `len` bytes from `reader` into a freshly allocated buffer.
///
/// Every entry-reading path goes through here: the size comes from the archive
/// directory, so a stream that ends early is reported as
/// [`io::ErrorKind::UnexpectedEof`] rather than handed back short.
pub fn load_bytes<R: Read>(mut reader: R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("expected {len} bytes, stream ended after {filled}"),
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn stops_at_requested_length() {
        let bytes = load_bytes(Cursor::new(b"abcdef"), 4).unwrap();
        assert_eq!(bytes, b"abcd");
    }

    #[test]
    fn zero_length_reads_nothing() {
        assert!(load_bytes(Cursor::new(b""), 0).unwrap().is_empty());
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let err = load_bytes(Cursor::new(b"ab"), 3).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
