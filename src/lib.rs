/*! A streaming decompressor and extractor for [LHA/LZH](https://en.wikipedia.org/wiki/LHA_(file_format)) archives.

This crate focuses on the "new-style" LZSS+Huffman codec family (`-lh4-` through `-lh7-`) and
the archive-level mechanics around it: iterating entries, applying deferred directory metadata
so a directory's own timestamps and permissions are written after its children, and verifying
decoded content against the header's recorded length and CRC-16.

## Supported compression methods

| identifier | decoder              | description
|------------|----------------------|------------
| `-lhd-`    | n/a                  | directory marker (no content)
| `-lh0-`    | `PassthroughDecoder` | no compression
| `-lh4-`    | `Lh4Decoder`         | 4kB sliding window, dynamic huffman
| `-lh5-`    | `Lh5Decoder`         | 8kB sliding window, dynamic huffman
| `-lh6-`    | `Lh6Decoder`         | 32kB sliding window, dynamic huffman
| `-lh7-`    | `Lh7Decoder`         | 64kB sliding window, dynamic huffman
| `-lz4-`    | `PassthroughDecoder` | no compression
| `-pm0-`    | `PassthroughDecoder` | no compression
| others     | `UnsupportedDecoder` | recognized but not implemented by this crate

## Quick start

```no_run
use lharch::{Extractor, UnixPlatform};
use std::path::Path;

let mut archive = lharch::open_file("archive.lzh")?;
let extractor = Extractor::new(UnixPlatform);
extractor.extract_all(&mut archive, Path::new("out"), None)?;
# Ok::<(), std::io::Error>(())
```
*/
pub mod bitstream;
pub mod crc;
pub mod decode;
pub mod dirstack;
pub mod error;
pub mod extract;
pub mod header;
pub mod huffman;
pub mod platform;
pub mod reader;
pub mod ringbuf;

pub use dirstack::DirPolicy;
pub use error::{Error, Result};
pub use extract::{Extractor, ProgressCb};
pub use header::{CompressionMethod, FileHeader};
pub use platform::{Platform, UnixPlatform};
pub use reader::{ArchiveReader, Entry, HeaderSource, LhaBasicReader};

use std::fs::File;
use std::io;
use std::path::Path;

/// Opens a file from the filesystem and returns an [`ArchiveReader`] positioned before the
/// first entry, using [`DirPolicy::EndOfDir`] (the policy most extractors want: a directory's
/// metadata is applied right after its contents finish, matching how archives are usually
/// ordered depth-first).
///
/// # Errors
/// Returns an error if the file can't be opened; header parsing itself is deferred until the
/// first call to [`ArchiveReader::next_entry`].
pub fn open_file<P: AsRef<Path>>(path: P) -> io::Result<ArchiveReader<LhaBasicReader, File>> {
    let file = File::open(path)?;
    Ok(ArchiveReader::new(file, LhaBasicReader, DirPolicy::EndOfDir))
}
