//! # LHA/LZH file header.
use std::rc::Rc;

mod compression;
mod flags;
mod ostype;
mod parser;
mod timestamp;

pub use compression::*;
pub use flags::*;
pub use ostype::*;
pub use parser::*;
pub use timestamp::*;

/// A fully parsed LHA/LZH file header.
///
/// Headers are handed around as `Rc<FileHeader>` so the directory-policy stack and the caller
/// can share the same entry without cloning its (possibly long) path strings.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    /// The directory portion of the entry's path, empty when the entry lives at the archive
    /// root. When present it ends with `/`.
    pub path: String,
    /// The entry's base filename, without any directory component.
    pub filename: String,
    /// The compression method this entry was stored with.
    pub compress_method: CompressionMethod,
    /// The decompressed length of the entry's content, in bytes.
    pub length: u64,
    /// The number of compressed bytes making up the entry's content in the archive stream.
    pub compressed_size: u64,
    /// The CRC-16 of the decompressed content, as recorded in the header.
    pub crc: u16,
    /// The originating OS, as recorded in the header.
    pub os_type: OsType,
    /// For `-lhd-` entries following the LHA-for-Unix `name|target` convention, the symlink's
    /// target path.
    pub symlink_target: Option<String>,
    /// Last-modified time, in Unix epoch seconds. `0` if no timestamp could be determined.
    pub timestamp: i64,
    /// Which optional extra headers contributed fields to this header.
    pub extra_flags: ExtraFlags,
    pub unix_uid: Option<u32>,
    pub unix_gid: Option<u32>,
    pub unix_perms: Option<u32>,
    pub win_created: Option<u64>,
    pub win_modified: Option<u64>,
    pub win_accessed: Option<u64>,
}

impl FileHeader {
    /// Returns `true` if this entry marks a directory (as opposed to a file or symlink).
    ///
    /// Directories and symlinks both use [`CompressionMethod::Lhd`]; callers distinguish them
    /// via [`FileHeader::symlink_target`].
    pub fn is_directory(&self) -> bool {
        self.compress_method.is_directory() && self.symlink_target.is_none()
    }
    /// Returns `true` if this entry is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.symlink_target.is_some()
    }
    /// Returns the entry's full path, joining [`FileHeader::path`] and [`FileHeader::filename`].
    pub fn full_path(&self) -> String {
        let mut out = self.path.clone();
        out.push_str(&self.filename);
        out
    }
    /// Wraps this header in an `Rc`, as handed to the directory-policy stack.
    pub fn into_rc(self) -> Rc<FileHeader> {
        Rc::new(self)
    }
}
