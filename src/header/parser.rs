use core::fmt::Write as _;
use core::num::Wrapping;
use std::io::Read;

use crate::crc::Crc16;
use crate::error::{Error, Result};
use super::{CompressionMethod, ExtraFlags, FileHeader, OsType};
use super::timestamp::{msdos_datetime_to_epoch, win_filetime_to_epoch};

/// Raw identifiers of extra headers this parser understands.
mod ext {
    pub const EXT_HEADER_COMMON:      u8 = 0x00;
    pub const EXT_HEADER_FILENAME:    u8 = 0x01;
    pub const EXT_HEADER_PATH:        u8 = 0x02;
    pub const EXT_HEADER_MSDOS_TIME:  u8 = 0x41;
    pub const EXT_HEADER_UNIX_PERM:   u8 = 0x50;
    pub const EXT_HEADER_UNIX_UIDGID: u8 = 0x51;
    pub const EXT_HEADER_UNIX_TIME:   u8 = 0x54;
}
use ext::*;

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
#[repr(packed)]
struct RawBaseHeader {
    compression: [u8;5],
    compressed_size: [u8;4],
    original_size: [u8;4],
    last_modified: [u8;4],
    msdos_attrs: u8,
    lha_level: u8,
}

struct Parser<'a, R> {
    rd: &'a mut R,
    crc: Crc16,
    csum: Wrapping<u8>,
    len: usize,
}

impl<R: Read> Parser<'_, R> {
    fn read_u8_or_none(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8];
        if self.rd.read(&mut byte)? == 0 {
            return Ok(None);
        }
        self.update_checksums_no_wrapping_sum(&byte);
        Ok(Some(byte[0]))
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut byte = [0u8];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8;2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8;4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.rd.read_exact(buf)?;
        self.update_checksums(buf);
        Ok(())
    }

    fn read_limit(&mut self, limit: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; limit];
        self.rd.read_exact(&mut buf)?;
        self.update_checksums(&buf);
        Ok(buf)
    }

    fn read_limit_no_checksums(&mut self, limit: usize, buf: &mut Vec<u8>) -> Result<()> {
        let start = buf.len();
        buf.resize(start + limit, 0);
        self.rd.read_exact(&mut buf[start..])?;
        Ok(())
    }

    fn update_checksums(&mut self, buf: &[u8]) {
        self.update_checksums_no_wrapping_sum(buf);
        self.csum = wrapping_csum(self.csum, buf);
    }

    fn update_checksums_no_wrapping_sum(&mut self, buf: &[u8]) {
        self.len += buf.len();
        self.crc.digest(buf);
    }
}

impl FileHeader {
    /// Attempts to parse the next LHA header from `rd`.
    ///
    /// Returns `Ok(None)` when the end-of-archive marker (a single `0` byte) is encountered.
    /// Supports header levels 0, 1 and 2; level 3 (rarely produced in the wild) is not
    /// recognized and is reported as a parse error.
    ///
    /// # Errors
    /// Returns an error from the underlying stream or because a malformed or unsupported
    /// header was encountered.
    pub fn read<R: Read>(rd: &mut R) -> Result<Option<FileHeader>> {
        let mut parser = Parser { rd, crc: Crc16::default(), csum: Wrapping(0), len: 0 };

        let header_len = match parser.read_u8_or_none()? {
            Some(0) | None => return Ok(None),
            Some(len) => len,
        };
        let csum = parser.read_u8()?;
        parser.csum = Wrapping(0);

        let mut raw = RawBaseHeader::default();
        parser.read_exact(unsafe { struct_slice_mut(&mut raw) })?;
        if raw.lha_level > 2 {
            return Err(Error::HeaderParse("unsupported header level"));
        }

        let base_filename = if raw.lha_level < 2 {
            let filename_len = parser.read_u8()? as usize;
            if (header_len as usize) < parser.len + filename_len {
                return Err(Error::HeaderParse("wrong header size"));
            }
            parser.read_limit(filename_len)?
        } else {
            Vec::new()
        };

        let file_crc = parser.read_u16()?;

        let mut os_type_byte = 0u8;
        if raw.lha_level > 0 {
            os_type_byte = parser.read_u8()?;
        }

        // extended area, level 0 and 1 only
        let mut extended_area: Vec<u8> = Vec::new();
        if raw.lha_level < 2 {
            let mut min_len = parser.len;
            if raw.lha_level == 0 {
                min_len -= 2; // no extra headers at level 0
            }
            if (header_len as usize) < min_len {
                return Err(Error::HeaderParse("wrong header size"));
            }
            let mut extended_len = (header_len as usize) - min_len;
            if extended_len != 0 && raw.lha_level == 0 {
                extended_len -= 1;
                os_type_byte = parser.read_u8()?;
            }
            if extended_len != 0 {
                extended_area = parser.read_limit(extended_len)?;
            }
        }

        let mut long_header_len: u32 = 0;
        let mut first_header_len: u32;
        let mut extra_headers: Vec<u8> = Vec::new();
        match raw.lha_level {
            1 => {
                first_header_len = parser.read_u16()? as u32;
            }
            2 => {
                long_header_len = u16::from_le_bytes([header_len, csum]) as u32;
                first_header_len = parser.read_u16()? as u32;
            }
            _ => {
                first_header_len = 0;
            }
        }

        if raw.lha_level < 2 {
            if csum != parser.csum.0 {
                return Err(Error::HeaderParse("invalid header checksum"));
            }
        } else if long_header_len < parser.len as u32 + first_header_len {
            return Err(Error::HeaderParse("wrong header size"));
        }

        let mut header_crc: Option<u16> = None;
        let mut filename_ext: Option<String> = None;
        let mut path_ext: Option<String> = None;
        let mut unix_uid = None;
        let mut unix_gid = None;
        let mut unix_perms = None;
        let mut win_created = None;
        let mut win_modified = None;
        let mut win_accessed = None;
        let mut unix_timestamp = None;
        let mut extra_flags = ExtraFlags::empty();

        let min_header_len = 3;
        let mut extra_header_len = first_header_len as usize;
        while extra_header_len != 0 {
            if extra_header_len < min_header_len {
                return Err(Error::HeaderParse("wrong extra header size"));
            }
            if long_header_len != 0 {
                if (long_header_len as usize) < parser.len + extra_header_len - 2 {
                    return Err(Error::HeaderParse("wrong header size"));
                }
            }
            parser.read_limit_no_checksums(extra_header_len, &mut extra_headers)?;
            let start = extra_headers.len() - extra_header_len;
            let header = &mut extra_headers[start..];
            match header {
                [EXT_HEADER_COMMON, data @ ..] => {
                    if header_crc.is_some() {
                        return Err(Error::HeaderParse("double common CRC-16 header"));
                    }
                    if let Some(crc) = data.get_mut(0..2) {
                        header_crc = read_u16(crc);
                        for p in crc.iter_mut() {
                            *p = 0;
                        }
                    }
                }
                [EXT_HEADER_FILENAME, data @ ..] => {
                    filename_ext = Some(parse_str(data));
                }
                [EXT_HEADER_PATH, data @ ..] => {
                    path_ext = Some(parse_path_to_str(data));
                }
                [EXT_HEADER_UNIX_PERM, data @ ..] if data.len() >= 2 => {
                    if let Some(mode) = read_u16(&data[0..2]) {
                        unix_perms = Some(mode as u32);
                        extra_flags |= ExtraFlags::UNIX_PERMS;
                    }
                }
                [EXT_HEADER_UNIX_UIDGID, data @ ..] if data.len() >= 4 => {
                    if let (Some(gid), Some(uid)) = (read_u16(&data[0..2]), read_u16(&data[2..4])) {
                        unix_gid = Some(gid as u32);
                        unix_uid = Some(uid as u32);
                        extra_flags |= ExtraFlags::UNIX_UID_GID;
                    }
                }
                [EXT_HEADER_UNIX_TIME, data @ ..] if data.len() >= 4 => {
                    if let Some(ts) = read_u32(&data[0..4]) {
                        unix_timestamp = Some(ts as i64);
                    }
                }
                [EXT_HEADER_MSDOS_TIME, data @ ..] if data.len() == 24 => {
                    if let (Some(ctime), Some(mtime), Some(atime)) =
                        (read_u64(&data[0..8]), read_u64(&data[8..16]), read_u64(&data[16..24]))
                    {
                        win_created = Some(ctime);
                        win_modified = Some(mtime);
                        win_accessed = Some(atime);
                        extra_flags |= ExtraFlags::WINDOWS_TIMES;
                    }
                }
                _ => {}
            }
            parser.update_checksums_no_wrapping_sum(header);
            extra_header_len = read_u16(&header[header.len() - 2..]).unwrap() as usize;
        }

        if long_header_len != 0 && long_header_len != parser.len as u32 {
            if raw.lha_level == 2 && long_header_len == parser.len as u32 + 1 {
                parser.read_u8()?; // padding byte
            } else if raw.lha_level == 2 && long_header_len + 2 != parser.len as u32 {
                return Err(Error::HeaderParse("wrong length of headers"));
            }
        }

        if let Some(crc) = header_crc {
            if crc != parser.crc.sum16() {
                return Err(Error::HeaderParse("wrong header CRC-16 checksum"));
            }
        }

        let original_size = u32::from_le_bytes(raw.original_size) as u64;
        let mut compressed_size = u32::from_le_bytes(raw.compressed_size) as u64;
        if raw.lha_level == 1 {
            if extra_headers.len() as u64 > compressed_size {
                return Err(Error::HeaderParse("wrong length of skip size"));
            }
            compressed_size -= extra_headers.len() as u64;
        }

        let compression = CompressionMethod::try_from(&raw.compression)
            .map_err(|_| Error::HeaderParse("unrecognized compression method"))?;
        let os_type = OsType::try_from(os_type_byte).unwrap_or_default();

        let (mut filename, path) = match (filename_ext, path_ext) {
            (Some(f), p) => (f, p.unwrap_or_default()),
            (None, p) => {
                let mut path = p.unwrap_or_default();
                let name = parse_str(&base_filename);
                // base filename may itself encode a path (level 0/1 archives created on
                // systems without a dedicated path extra header)
                if let Some(slash) = name.rfind('/') {
                    if !path.is_empty() && !path.ends_with('/') {
                        path.push('/');
                    }
                    path.push_str(&name[..=slash]);
                    (name[slash + 1..].to_string(), path)
                } else {
                    (name, path)
                }
            }
        };
        let mut path = path;
        if !path.is_empty() && !path.ends_with('/') {
            path.push('/');
        }

        let symlink_target = if compression.is_directory() {
            filename.find('|').map(|i| {
                let target = filename[i + 1..].to_string();
                filename.truncate(i);
                target
            })
        } else {
            None
        };

        let timestamp = if let Some(mtime) = win_modified {
            win_filetime_to_epoch(mtime).unwrap_or(0)
        } else if let Some(ts) = unix_timestamp {
            ts
        } else if raw.lha_level < 2 {
            let last_modified = u32::from_le_bytes(raw.last_modified);
            match (os_type, extended_area.get(1..5).and_then(read_u32)) {
                (OsType::Unix, Some(ts)) | (OsType::Osk, Some(ts)) => ts as i64,
                _ => msdos_datetime_to_epoch(last_modified).unwrap_or(0),
            }
        } else {
            u32::from_le_bytes(raw.last_modified) as i64
        };

        Ok(Some(FileHeader {
            path,
            filename,
            compress_method: compression,
            length: original_size,
            compressed_size,
            crc: file_crc,
            os_type,
            symlink_target,
            timestamp,
            extra_flags,
            unix_uid,
            unix_gid,
            unix_perms,
            win_created,
            win_modified,
            win_accessed,
        }))
    }
}

fn read_u16(slice: &[u8]) -> Option<u16> {
    match slice {
        &[lo, hi] => Some(u16::from_le_bytes([lo, hi])),
        _ => None
    }
}

fn read_u32(slice: &[u8]) -> Option<u32> {
    match slice {
        &[b0, b1, b2, b3] => Some(u32::from_le_bytes([b0, b1, b2, b3])),
        _ => None
    }
}

fn read_u64(slice: &[u8]) -> Option<u64> {
    match slice {
        &[b0, b1, b2, b3, b4, b5, b6, b7] => Some(u64::from_le_bytes([b0, b1, b2, b3, b4, b5, b6, b7])),
        _ => None
    }
}

fn wrapping_csum(init: Wrapping<u8>, data: &[u8]) -> Wrapping<u8> {
    let sum: Wrapping<u8> = data.iter().copied().map(Wrapping).sum();
    sum + init
}

/// Converts a directory-separated byte string into a `/`-joined path, dropping `.`, `..` and
/// empty components the way the archiver's own unpacker would.
fn parse_path_to_str(data: &[u8]) -> String {
    let mut path = String::with_capacity(data.len());
    for part in data.split(|&c| c == 0xFF || c == b'/' || c == b'\\') {
        match part {
            b"." | b".." | [] => {}
            name => {
                if !path.is_empty() {
                    path.push('/');
                }
                path.push_str(&parse_str(name));
            }
        }
    }
    path
}

/// Converts a raw byte string into a displayable `String`, percent-encoding control and
/// non-ASCII bytes and replacing path separators with `_`.
fn parse_str(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &byte in data {
        match byte {
            0x00..=0x1f | 0x7f..=0xff => {
                write!(out, "%{:02x}", byte).unwrap();
            }
            b'/' | b'\\' => out.push('_'),
            ch => out.push(ch as char),
        }
    }
    out
}

/// # Safety
/// Only safe to call with `#[repr(packed)]` structs consisting solely of `u8`/byte-array fields.
unsafe fn struct_slice_mut<T: Copy>(obj: &mut T) -> &mut [u8] {
    let len = core::mem::size_of::<T>();
    core::slice::from_raw_parts_mut(obj as *mut T as *mut u8, len)
}
