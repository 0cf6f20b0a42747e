//! MacBinary header stripping, applied to entries originating from `MacOS` (os_type `'m'`).
//!
//! MacLHA stores a 128-byte MacBinary metadata block as a prefix of the file's *decompressed*
//! stream. Readers that don't care about Macintosh resource-fork metadata want the bytes that
//! follow it; the archive's recorded length and CRC-16, however, cover the whole raw stream,
//! header included. This wrapper exposes the stripped content while letting the caller still
//! digest the header bytes into the same running checksum used for the rest of the entry.
use crate::crc::Crc16;
use crate::error::Result;
use super::Decoder;

/// The fixed size of a MacBinary header prefix.
pub const MACBINARY_HEADER_LEN: usize = 128;

/// Wraps a raw decoder, consuming the leading MacBinary header on first use.
#[derive(Debug)]
pub struct MacBinaryDecoder<D> {
    inner: D,
    header_pending: bool,
}

impl<D> MacBinaryDecoder<D> {
    pub fn new(inner: D) -> Self {
        MacBinaryDecoder { inner, header_pending: true }
    }
    /// Returns a reference to the wrapped raw decoder.
    pub fn get_ref(&self) -> &D {
        &self.inner
    }
}

impl<R, D: Decoder<R>> MacBinaryDecoder<D> {
    /// Reads and discards the 128-byte MacBinary header, digesting it into `crc`.
    ///
    /// Must be called at most once, before the first call to [`Decoder::fill_buffer`]; it is a
    /// no-op on subsequent calls.
    pub fn strip_header(&mut self, crc: &mut Crc16) -> Result<()> {
        if self.header_pending {
            let mut header = [0u8; MACBINARY_HEADER_LEN];
            self.inner.fill_buffer(&mut header)?;
            crc.digest(&header);
            self.header_pending = false;
        }
        Ok(())
    }
}

impl<R, D: Decoder<R>> Decoder<R> for MacBinaryDecoder<D> {
    fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    fn fill_buffer(&mut self, buf: &mut [u8]) -> Result<()> {
        debug_assert!(!self.header_pending, "strip_header must run before the first read");
        self.inner.fill_buffer(buf)
    }

    fn progress_block_size(&self) -> u64 {
        self.inner.progress_block_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::PassthroughDecoder;
    use std::io::Cursor;

    #[test]
    fn strip_header_consumes_128_bytes_and_digests_them() {
        let mut content = vec![0u8; MACBINARY_HEADER_LEN];
        content.extend_from_slice(b"payload");
        let raw = PassthroughDecoder::new(Cursor::new(content.clone()));
        let mut dec = MacBinaryDecoder::new(raw);
        let mut crc = Crc16::new();
        dec.strip_header(&mut crc).unwrap();

        let mut expect_crc = Crc16::new();
        expect_crc.digest(&content[..MACBINARY_HEADER_LEN]);
        assert_eq!(crc.sum16(), expect_crc.sum16());

        let mut buf = [0u8; 7];
        dec.fill_buffer(&mut buf).unwrap();
        assert_eq!(&buf, b"payload");
    }
}
