//! Platform abstraction for applying extracted metadata to the filesystem (component K).
//!
//! [`crate::extract`] is written against the [`Platform`] trait rather than `std::fs` directly
//! so the ownership/permission bits that only make sense on Unix don't leak into the extraction
//! state machine. [`UnixPlatform`] is the only implementation this crate ships; a Windows port
//! would add a sibling module behind the analogous `cfg(target_family = "windows")` gate.
use std::ffi::CString;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

/// What, if anything, already occupies a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    None,
    File,
    Dir,
    Other,
}

/// Filesystem operations an [`crate::extract::Extractor`] needs, factored out so they can be
/// mocked in tests and so Unix-only semantics (uid/gid, symlinks) stay in one place.
pub trait Platform {
    /// Creates (or truncates) a regular file at `path` and returns it open for writing.
    fn create_file(&self, path: &Path) -> Result<fs::File>;
    /// Creates a directory at `path`. Tolerates the path already existing as a directory.
    fn mkdir(&self, path: &Path) -> Result<()>;
    /// Creates a symbolic link at `path` pointing at `target`.
    fn symlink(&self, target: &str, path: &Path) -> Result<()>;
    /// Sets both the access and modification time of `path` to `epoch_secs`.
    fn set_timestamps(&self, path: &Path, epoch_secs: i64) -> Result<()>;
    /// Changes ownership of `path`. Either field may be `None` to leave it unchanged.
    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<()>;
    /// Changes the permission bits of `path`.
    fn chmod(&self, path: &Path, mode: u32) -> Result<()>;
    /// Reports what kind of entry, if any, already exists at `path`. Follows symlinks.
    fn exists(&self, path: &Path) -> Existence;
}

/// The only [`Platform`] this crate ships: POSIX filesystem calls via `std::fs` and `libc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixPlatform;

fn path_to_cstring(path: &Path) -> Result<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| Error::Metadata("path contains an interior nul byte"))
}

impl Platform for UnixPlatform {
    fn create_file(&self, path: &Path) -> Result<fs::File> {
        Ok(fs::File::create(path)?)
    }

    fn mkdir(&self, path: &Path) -> Result<()> {
        match fs::create_dir(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if matches!(self.exists(path), Existence::Dir) {
                    Ok(())
                } else {
                    Err(Error::Io(e))
                }
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn symlink(&self, target: &str, path: &Path) -> Result<()> {
        std::os::unix::fs::symlink(target, path)?;
        Ok(())
    }

    fn set_timestamps(&self, path: &Path, epoch_secs: i64) -> Result<()> {
        let c_path = path_to_cstring(path)?;
        let tv = libc::timeval { tv_sec: epoch_secs as libc::time_t, tv_usec: 0 };
        let times = [tv, tv];
        let ret = unsafe { libc::utimes(c_path.as_ptr(), times.as_ptr()) };
        if ret != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        Ok(())
    }

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
        if uid.is_none() && gid.is_none() {
            return Ok(());
        }
        let c_path = path_to_cstring(path)?;
        // -1 (cast from u32::MAX) tells chown(2) to leave that id unchanged.
        let uid = uid.unwrap_or(u32::MAX) as libc::uid_t;
        let gid = gid.unwrap_or(u32::MAX) as libc::gid_t;
        let ret = unsafe { libc::chown(c_path.as_ptr(), uid, gid) };
        if ret != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        Ok(())
    }

    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|_| Error::Metadata("chmod failed"))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> Existence {
        match fs::metadata(path) {
            Ok(meta) => {
                if meta.is_dir() {
                    Existence::Dir
                } else if meta.is_file() {
                    Existence::File
                } else {
                    Existence::Other
                }
            }
            Err(_) => Existence::None,
        }
    }
}
