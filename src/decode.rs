//! # Decoding algorithms.
use std::io::Read;

use crate::error::{Error, Result};
use crate::header::CompressionMethod;

mod lhnew;
pub mod macbinary;

pub use lhnew::*;

/// The trait implemented by all decoders.
pub trait Decoder<R> {
    /// Unwraps and returns the inner reader.
    fn into_inner(self) -> R;
    /// Fills the whole `buf` with decoded data.
    ///
    /// The caller is responsible for not requesting more bytes than the entry's decompressed
    /// length; doing so will most likely result in an unexpected-EOF error.
    fn fill_buffer(&mut self, buf: &mut [u8]) -> Result<()>;
    /// The unit, in decoded bytes, the progress callback passed to [`crate::extract::Extractor`]
    /// counts in. `ring_size/2` for lh5/6/7 and `ring_size/4` for lh4; decoders with no natural
    /// block concept just report a fixed chunk size.
    fn progress_block_size(&self) -> u64 {
        8192
    }
}

/// An identity decoder for storage-only methods (`-lh0-`, `-lz4-`, `-pm0-`).
#[derive(Debug)]
pub struct PassthroughDecoder<R> {
    inner: R,
}

/// A decoder used when the compression method is recognized but not supported.
/// Reading from it always produces [`Error::Decompress`].
#[derive(Debug)]
pub struct UnsupportedDecoder<R> {
    inner: R,
}

/// Dispatches across every decoder this crate implements.
#[non_exhaustive]
#[derive(Debug)]
pub enum DecoderAny<R> {
    Passthrough(PassthroughDecoder<R>),
    Unsupported(UnsupportedDecoder<R>),
    Lh4(Lh4Decoder<R>),
    Lh5(Lh5Decoder<R>),
    Lh6(Lh6Decoder<R>),
    Lh7(Lh7Decoder<R>),
}

macro_rules! decoder_any_dispatch {
    (($model:expr)($($spec:tt)*) => $expr:expr) => {
        match $model {
            DecoderAny::Passthrough($($spec)*) => $expr,
            DecoderAny::Unsupported($($spec)*) => $expr,
            DecoderAny::Lh4($($spec)*) => $expr,
            DecoderAny::Lh5($($spec)*) => $expr,
            DecoderAny::Lh6($($spec)*) => $expr,
            DecoderAny::Lh7($($spec)*) => $expr,
        }
    };
}

impl<R: Read> DecoderAny<R> {
    /// Creates a decoder suited to `compression`, wrapping the given (already size-limited)
    /// stream reader.
    pub fn new_from_compression(compression: CompressionMethod, rd: R) -> Self {
        match compression {
            CompressionMethod::Pm0 | CompressionMethod::Lz4 | CompressionMethod::Lh0 =>
                DecoderAny::Passthrough(PassthroughDecoder::new(rd)),
            CompressionMethod::Lh4 => DecoderAny::Lh4(Lh4Decoder::new(rd)),
            CompressionMethod::Lh5 => DecoderAny::Lh5(Lh5Decoder::new(rd)),
            CompressionMethod::Lh6 => DecoderAny::Lh6(Lh6Decoder::new(rd)),
            CompressionMethod::Lh7 => DecoderAny::Lh7(Lh7Decoder::new(rd)),
            _ => DecoderAny::Unsupported(UnsupportedDecoder::new(rd)),
        }
    }
    /// Returns `true` if this decoder is able to decode the entry's content.
    pub fn is_supported(&self) -> bool {
        !matches!(self, DecoderAny::Unsupported(..))
    }
}

impl<R: Read> Decoder<R> for DecoderAny<R> {
    fn into_inner(self) -> R {
        decoder_any_dispatch!((self)(decoder) => decoder.into_inner())
    }

    #[inline]
    fn fill_buffer(&mut self, buf: &mut [u8]) -> Result<()> {
        decoder_any_dispatch!((self)(decoder) => decoder.fill_buffer(buf))
    }

    #[inline]
    fn progress_block_size(&self) -> u64 {
        decoder_any_dispatch!((self)(decoder) => decoder.progress_block_size())
    }
}

impl<R: Read> PassthroughDecoder<R> {
    pub fn new(inner: R) -> Self {
        PassthroughDecoder { inner }
    }
}

impl<R: Read> Decoder<R> for PassthroughDecoder<R> {
    fn into_inner(self) -> R {
        self.inner
    }

    #[inline]
    fn fill_buffer(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(Error::from)
    }
}

impl<R: Read> UnsupportedDecoder<R> {
    pub fn new(inner: R) -> Self {
        UnsupportedDecoder { inner }
    }
}

impl<R: Read> Decoder<R> for UnsupportedDecoder<R> {
    fn into_inner(self) -> R {
        self.inner
    }

    #[inline]
    fn fill_buffer(&mut self, _buf: &mut [u8]) -> Result<()> {
        Err(Error::Decompress("unsupported compression method"))
    }
}
