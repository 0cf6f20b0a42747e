//! Entry extraction (component G): turns [`crate::reader::Entry`] values into filesystem state.
use std::io::Read;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::header::FileHeader;
use crate::platform::Platform;
use crate::reader::{ArchiveReader, Entry, HeaderSource};

const DIR_MODE_WITH_PERMS: u32 = 0o700;
const DIR_MODE_DEFAULT: u32 = 0o777;

/// Reports decode progress as `(blocks_done, total_blocks)`. The block size is defined by the
/// active codec (see [`crate::decode::Decoder::progress_block_size`]).
pub type ProgressCb<'a> = dyn FnMut(u64, u64) + 'a;

/// Applies archive entries to the filesystem (or, via [`Extractor::check`], just verifies them).
#[derive(Debug)]
pub struct Extractor<P> {
    platform: P,
}

impl<P: Platform> Extractor<P> {
    pub fn new(platform: P) -> Self {
        Extractor { platform }
    }

    fn entry_dest(&self, dest_root: &Path, header: &FileHeader) -> PathBuf {
        dest_root.join(header.full_path())
    }

    /// Applies one entry (directory, symlink, or file) to `dest_root`.
    ///
    /// Directories created under a deferred [`crate::dirstack::DirPolicy`] are not given their
    /// final metadata here; the caller must call [`ArchiveReader::defer_directory`] and apply it
    /// later when the matching [`Entry::FakeDir`] is yielded, via [`Self::apply_fake_dir`].
    pub fn extract_normal<H, R>(
        &self,
        archive: &mut ArchiveReader<H, R>,
        header: &FileHeader,
        dest_root: &Path,
        defer_dir_metadata: bool,
        progress: Option<&mut ProgressCb<'_>>,
    ) -> Result<()>
    where
        H: HeaderSource<R>,
        R: Read,
    {
        let dest = self.entry_dest(dest_root, header);
        if header.is_directory() {
            let mode = if header.unix_perms.is_some() { DIR_MODE_WITH_PERMS } else { DIR_MODE_DEFAULT };
            log::debug!("creating directory {:?}", dest);
            self.platform.mkdir(&dest)?;
            if !defer_dir_metadata {
                self.apply_metadata_now(&dest, header, mode)?;
            }
            return Ok(());
        }
        if let Some(target) = &header.symlink_target {
            log::debug!("creating symlink {:?} -> {}", dest, target);
            self.platform.symlink(target, &dest)?;
            return Ok(());
        }
        log::debug!("extracting {:?} ({} bytes, {})", dest, header.length, header.compress_method);
        let mut file = self.platform.create_file(&dest)?;
        self.decode_into(archive, header, Some(&mut file), progress)?;
        if let Some(mode) = header.unix_perms {
            self.platform.chmod(&dest, mode)?;
        }
        if header.unix_uid.is_some() || header.unix_gid.is_some() {
            self.platform.chown(&dest, header.unix_uid, header.unix_gid)?;
        }
        self.platform.set_timestamps(&dest, header.timestamp)?;
        Ok(())
    }

    /// Applies the deferred metadata of a directory re-yielded as [`Entry::FakeDir`].
    ///
    /// Per the error model, a `chown` failure here is logged and ignored (non-root callers
    /// cannot usually change ownership); a `chmod` failure is fatal to the entry.
    pub fn apply_fake_dir(&self, header: &FileHeader, dest_root: &Path) -> Result<()> {
        let dest = self.entry_dest(dest_root, header);
        self.platform.set_timestamps(&dest, header.timestamp)?;
        if header.unix_uid.is_some() || header.unix_gid.is_some() {
            if let Err(e) = self.platform.chown(&dest, header.unix_uid, header.unix_gid) {
                log::warn!("chown {:?} failed (ignored): {}", dest, e);
            }
        }
        let mode = header.unix_perms.unwrap_or(DIR_MODE_DEFAULT);
        self.platform.chmod(&dest, mode)?;
        Ok(())
    }

    fn apply_metadata_now(&self, dest: &Path, header: &FileHeader, mode: u32) -> Result<()> {
        self.platform.set_timestamps(dest, header.timestamp)?;
        if header.unix_uid.is_some() || header.unix_gid.is_some() {
            if let Err(e) = self.platform.chown(dest, header.unix_uid, header.unix_gid) {
                log::warn!("chown {:?} failed (ignored): {}", dest, e);
            }
        }
        self.platform.chmod(dest, mode)?;
        Ok(())
    }

    /// Decodes the current entry's content, optionally writing it to `out`, verifying the
    /// running length and CRC-16 against the header on completion.
    ///
    /// Passing `out = None` implements [`Self::check`]'s discard-output behavior.
    fn decode_into<H, R>(
        &self,
        archive: &mut ArchiveReader<H, R>,
        header: &FileHeader,
        mut out: Option<&mut std::fs::File>,
        mut progress: Option<&mut ProgressCb<'_>>,
    ) -> Result<()>
    where
        H: HeaderSource<R>,
        R: Read,
    {
        let block_size = archive.progress_block_size().filter(|&n| n > 0).unwrap_or(u64::MAX);
        let total_blocks = header.length.div_ceil(block_size).max(1);
        let mut buf = [0u8; 8192];
        // `archive.bytes_read()` may already be nonzero here: a MacOS-origin entry's MacBinary
        // header is stripped (and digested) before `decode_into` is ever called.
        let mut remaining = header.length.saturating_sub(archive.bytes_read());
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            archive.read_content(&mut buf[..chunk])?;
            if let Some(file) = out.as_mut() {
                file.write_all(&buf[..chunk]).map_err(Error::from)?;
            }
            remaining -= chunk as u64;
            if let Some(cb) = progress.as_mut() {
                cb(archive.bytes_read() / block_size, total_blocks);
            }
        }
        if !archive.content_verified() {
            return Err(Error::Checksum("decoded length or CRC-16 does not match header"));
        }
        if let Some(cb) = progress.as_mut() {
            cb(total_blocks, total_blocks);
        }
        Ok(())
    }

    /// Verifies the current entry's content without writing it anywhere. Directories and
    /// symlinks trivially succeed.
    pub fn check<H, R>(
        &self,
        archive: &mut ArchiveReader<H, R>,
        header: &FileHeader,
        progress: Option<&mut ProgressCb<'_>>,
    ) -> Result<()>
    where
        H: HeaderSource<R>,
        R: Read,
    {
        if header.is_directory() || header.is_symlink() {
            return Ok(());
        }
        self.decode_into(archive, header, None, progress)
    }

    /// Drives `archive` to completion, extracting every entry under `dest_root`.
    ///
    /// Returns `Ok(())` only if every entry extracted and verified cleanly; on the first
    /// failure, extraction stops and the error is returned (partial output may remain on disk).
    pub fn extract_all<H, R>(
        &self,
        archive: &mut ArchiveReader<H, R>,
        dest_root: &Path,
        mut progress: Option<&mut ProgressCb<'_>>,
    ) -> Result<()>
    where
        H: HeaderSource<R>,
        R: Read,
    {
        while let Some(entry) = archive.next_entry()? {
            match entry {
                Entry::Normal(header) => {
                    let defer = header.is_directory();
                    self.extract_normal(archive, &header, dest_root, defer, progress.as_deref_mut())?;
                    if defer {
                        archive.defer_directory(header);
                    }
                }
                Entry::FakeDir(header) => {
                    self.apply_fake_dir(&header, dest_root)?;
                }
            }
        }
        Ok(())
    }

    /// Drives `archive` to completion, verifying every entry's content without writing it.
    pub fn check_all<H, R>(
        &self,
        archive: &mut ArchiveReader<H, R>,
        mut progress: Option<&mut ProgressCb<'_>>,
    ) -> Result<()>
    where
        H: HeaderSource<R>,
        R: Read,
    {
        while let Some(entry) = archive.next_entry()? {
            if let Entry::Normal(header) = entry {
                self.check(archive, &header, progress.as_deref_mut())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirstack::DirPolicy;
    use crate::header::{CompressionMethod, ExtraFlags, OsType};
    use crate::platform::{Existence, UnixPlatform};
    use std::io::Cursor;
    use tempfile::tempdir;

    struct ScriptedSource {
        headers: std::vec::IntoIter<FileHeader>,
    }

    impl HeaderSource<Cursor<Vec<u8>>> for ScriptedSource {
        fn next_header(&mut self, _rd: &mut Cursor<Vec<u8>>) -> Result<Option<FileHeader>> {
            Ok(self.headers.next())
        }
    }

    fn dir_header(path: &str) -> FileHeader {
        FileHeader {
            path: path.to_string(),
            filename: String::new(),
            compress_method: CompressionMethod::Lhd,
            length: 0,
            compressed_size: 0,
            crc: 0,
            os_type: OsType::Unix,
            symlink_target: None,
            timestamp: 0,
            extra_flags: ExtraFlags::empty(),
            unix_uid: None,
            unix_gid: None,
            unix_perms: None,
            win_created: None,
            win_modified: None,
            win_accessed: None,
        }
    }

    #[test]
    fn extract_all_creates_plain_directory_with_default_mode() {
        let dir = tempdir().unwrap();
        let headers = vec![dir_header("sub/")];
        let source = ScriptedSource { headers: headers.into_iter() };
        let mut archive = ArchiveReader::new(Cursor::new(Vec::new()), source, DirPolicy::Plain);
        let extractor = Extractor::new(UnixPlatform);
        extractor.extract_all(&mut archive, dir.path(), None).unwrap();
        assert_eq!(UnixPlatform.exists(&dir.path().join("sub")), Existence::Dir);
    }

    #[test]
    fn extract_all_reapplies_metadata_on_idempotent_rerun() {
        let dir = tempdir().unwrap();
        let headers = vec![dir_header("sub/")];
        let source = ScriptedSource { headers: headers.into_iter() };
        let mut archive = ArchiveReader::new(Cursor::new(Vec::new()), source, DirPolicy::Plain);
        let extractor = Extractor::new(UnixPlatform);
        extractor.extract_all(&mut archive, dir.path(), None).unwrap();

        let headers2 = vec![dir_header("sub/")];
        let source2 = ScriptedSource { headers: headers2.into_iter() };
        let mut archive2 = ArchiveReader::new(Cursor::new(Vec::new()), source2, DirPolicy::Plain);
        extractor.extract_all(&mut archive2, dir.path(), None).unwrap();
        assert_eq!(UnixPlatform.exists(&dir.path().join("sub")), Existence::Dir);
    }
}
