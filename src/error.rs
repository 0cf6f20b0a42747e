//! # Crate-wide error type.
use std::fmt;
use std::io;

/// The result type returned by most fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error produced while parsing a header, decoding a stream or applying
/// filesystem metadata.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error from the underlying stream or the filesystem.
    Io(io::Error),
    /// Error parsing an LHA header.
    HeaderParse(&'static str),
    /// Error decompressing a file's content.
    Decompress(&'static str),
    /// A decoded checksum did not match the one recorded in the header.
    Checksum(&'static str),
    /// A metadata operation (chmod, mkdir, symlink, ...) failed fatally.
    Metadata(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            Io(e) => e.fmt(f),
            HeaderParse(e) => write!(f, "while parsing header: {}", e),
            Decompress(e) => write!(f, "while decompressing: {}", e),
            Checksum(e) => write!(f, "checksum mismatch: {}", e),
            Metadata(e) => write!(f, "while applying metadata: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}
