//! Archive iteration state machine (component E).
use std::io::{Read, Take};
use std::rc::Rc;

use crate::crc::Crc16;
use crate::decode::macbinary::MacBinaryDecoder;
use crate::decode::{Decoder, DecoderAny};
use crate::dirstack::{DirPolicy, DirStack};
use crate::error::{Error, Result};
use crate::header::{FileHeader, OsType};

/// The source of headers an [`ArchiveReader`] pulls from, abstracted so tests can drive the
/// state machine without a real LHA byte stream.
pub trait HeaderSource<R> {
    /// Parses and returns the next header from `rd`, or `None` at a clean end of archive.
    fn next_header(&mut self, rd: &mut R) -> Result<Option<FileHeader>>;
}

/// The default [`HeaderSource`]: parses real LHA/LZH headers via [`FileHeader::read`].
#[derive(Debug, Default)]
pub struct LhaBasicReader;

impl<R: Read> HeaderSource<R> for LhaBasicReader {
    fn next_header(&mut self, rd: &mut R) -> Result<Option<FileHeader>> {
        FileHeader::read(rd)
    }
}

/// Reads `rd` to exhaustion and throws the bytes away, used to skip whatever of an entry's
/// compressed content a caller never consumed before advancing past it.
fn discard_to_end<R: Read>(rd: &mut Take<R>) -> Result<()> {
    let mut buf = [0u8; 8192];
    loop {
        match rd.read(&mut buf)? {
            0 => return Ok(()),
            _ => continue,
        }
    }
}

#[derive(Debug)]
enum ActiveDecoder<T> {
    Plain(DecoderAny<T>),
    MacBinary(MacBinaryDecoder<DecoderAny<T>>),
}

impl<T: Read> ActiveDecoder<T> {
    fn into_inner(self) -> T {
        match self {
            ActiveDecoder::Plain(d) => d.into_inner(),
            ActiveDecoder::MacBinary(d) => d.into_inner(),
        }
    }
    fn fill_buffer(&mut self, buf: &mut [u8]) -> Result<()> {
        match self {
            ActiveDecoder::Plain(d) => d.fill_buffer(buf),
            ActiveDecoder::MacBinary(d) => d.fill_buffer(buf),
        }
    }
    fn is_supported(&self) -> bool {
        match self {
            ActiveDecoder::Plain(d) => d.is_supported(),
            ActiveDecoder::MacBinary(d) => d.get_ref().is_supported(),
        }
    }
    fn progress_block_size(&self) -> u64 {
        match self {
            ActiveDecoder::Plain(d) => d.progress_block_size(),
            ActiveDecoder::MacBinary(d) => d.progress_block_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterState {
    Start,
    Normal,
    FakeDir,
    Eof,
}

/// An entry yielded by [`ArchiveReader::next_entry`].
#[derive(Debug, Clone)]
pub enum Entry {
    /// A real archive entry: file, directory, or symlink header.
    Normal(Rc<FileHeader>),
    /// A directory header re-yielded once its deferred subtree has ended, per the reader's
    /// [`DirPolicy`]. Carries no content; only its metadata still needs applying.
    FakeDir(Rc<FileHeader>),
}

impl Entry {
    pub fn header(&self) -> &Rc<FileHeader> {
        match self {
            Entry::Normal(h) | Entry::FakeDir(h) => h,
        }
    }
    pub fn is_fake_dir(&self) -> bool {
        matches!(self, Entry::FakeDir(_))
    }
}

/// Walks an LHA/LZH archive stream, yielding one [`Entry`] at a time.
///
/// Directory metadata application can be deferred relative to the directory's contents (see
/// [`DirPolicy`]); when it is, a directory header is yielded a second time, as
/// [`Entry::FakeDir`], once its subtree is known to have ended.
#[derive(Debug)]
pub struct ArchiveReader<H, R> {
    header_source: H,
    rd: Option<R>,
    active: Option<ActiveDecoder<Take<R>>>,
    state: IterState,
    curr: Option<Rc<FileHeader>>,
    pending_header: Option<FileHeader>,
    dir_stack: DirStack,
    dir_policy: DirPolicy,
    crc: Crc16,
    bytes_read: u64,
}

impl<H, R: Read> ArchiveReader<H, R> {
    pub fn new(rd: R, header_source: H, dir_policy: DirPolicy) -> Self {
        ArchiveReader {
            header_source,
            rd: Some(rd),
            active: None,
            state: IterState::Start,
            curr: None,
            pending_header: None,
            dir_stack: DirStack::new(),
            dir_policy,
            crc: Crc16::new(),
            bytes_read: 0,
        }
    }

    /// The header of the entry currently exposed, if any.
    pub fn current_header(&self) -> Option<&Rc<FileHeader>> {
        self.curr.as_ref()
    }

    /// Whether the current decoder (if any) is able to decode this entry's content.
    pub fn is_decoder_supported(&self) -> bool {
        self.active.as_ref().map_or(false, ActiveDecoder::is_supported)
    }

    /// Retains `header` for deferred metadata application, per this reader's [`DirPolicy`].
    pub fn defer_directory(&mut self, header: Rc<FileHeader>) {
        self.dir_stack.push(header, self.dir_policy);
    }

    /// Changes the directory-metadata deferral policy applied to directories retained from now
    /// on. Directories already sitting on the stack keep whatever behavior governed their push.
    pub fn set_dir_policy(&mut self, policy: DirPolicy) {
        self.dir_policy = policy;
    }

    /// The current entry's progress-callback block size, in decoded bytes, or `None` if there is
    /// no active decoder (directories, symlinks, `START`/`EOF`).
    pub fn progress_block_size(&self) -> Option<u64> {
        self.active.as_ref().map(ActiveDecoder::progress_block_size)
    }
}

impl<H: HeaderSource<R>, R: Read> ArchiveReader<H, R> {
    fn begin_entry(&mut self, header: FileHeader) -> Result<()> {
        let compressed_size = header.compressed_size;
        let compress_method = header.compress_method;
        let needs_macbinary = header.os_type == OsType::MacOs && !header.is_directory();
        let rc = Rc::new(header);
        self.curr = Some(rc);
        self.crc = Crc16::new();
        self.bytes_read = 0;

        let rd = self.rd.take().expect("reader body must be idle between entries");
        let limited = rd.take(compressed_size);
        let decoder = DecoderAny::new_from_compression(compress_method, limited);
        self.active = Some(if needs_macbinary {
            let mut mb = MacBinaryDecoder::new(decoder);
            mb.strip_header(&mut self.crc)?;
            self.bytes_read += crate::decode::macbinary::MACBINARY_HEADER_LEN as u64;
            ActiveDecoder::MacBinary(mb)
        } else {
            ActiveDecoder::Plain(decoder)
        });
        Ok(())
    }

    /// Releases the current entry's decoder, discarding any of its compressed content that was
    /// never read (e.g. an unsupported method, or a caller that only lists entries) so the next
    /// header is parsed from the right offset instead of the middle of leftover entry data.
    fn finish_decoder(&mut self) -> Result<()> {
        if let Some(active) = self.active.take() {
            let mut limited = active.into_inner();
            discard_to_end(&mut limited)?;
            self.rd = Some(limited.into_inner());
        }
        Ok(())
    }

    /// Shared transition logic for leaving `Normal` or `FakeDir`: pulls the next header (or the
    /// one buffered from a prior call that turned out to end a deferred directory) and decides
    /// whether it can be exposed directly or must wait behind a `FAKE_DIR` pop first.
    fn advance_past_entry(&mut self) -> Result<()> {
        let next_header = match self.pending_header.take() {
            Some(h) => Some(h),
            None => {
                let rd = self.rd.as_mut().expect("reader body must be idle between entries");
                self.header_source.next_header(rd)?
            }
        };
        match next_header {
            Some(header) => {
                if let Some(popped) = self.dir_stack.pop_ended(&header.full_path(), self.dir_policy) {
                    self.pending_header = Some(header);
                    self.curr = Some(popped);
                    self.state = IterState::FakeDir;
                } else {
                    self.begin_entry(header)?;
                    self.state = IterState::Normal;
                }
            }
            None => {
                if let Some(popped) = self.dir_stack.pop_all() {
                    self.curr = Some(popped);
                    self.state = IterState::FakeDir;
                } else {
                    self.curr = None;
                    self.state = IterState::Eof;
                }
            }
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        match self.state {
            IterState::Start => {
                let rd = self.rd.as_mut().expect("reader body present at start");
                match self.header_source.next_header(rd)? {
                    Some(header) => {
                        self.begin_entry(header)?;
                        self.state = IterState::Normal;
                    }
                    None => {
                        self.curr = None;
                        self.state = IterState::Eof;
                    }
                }
            }
            IterState::Normal => {
                self.finish_decoder()?;
                self.advance_past_entry()?;
            }
            IterState::FakeDir => {
                self.advance_past_entry()?;
            }
            IterState::Eof => {
                if let Some(popped) = self.dir_stack.pop_all() {
                    self.curr = Some(popped);
                    self.state = IterState::FakeDir;
                }
            }
        }
        Ok(())
    }

    /// Advances to and returns the next entry, or `None` once the archive (and any deferred
    /// directories) have been fully consumed.
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        self.advance()?;
        Ok(match (self.state, self.curr.clone()) {
            (IterState::Normal, Some(h)) => Some(Entry::Normal(h)),
            (IterState::FakeDir, Some(h)) => Some(Entry::FakeDir(h)),
            _ => None,
        })
    }

    /// Reads and CRC-accumulates exactly `buf.len()` bytes of the current entry's decompressed
    /// content. Only valid while positioned on an [`Entry::Normal`] entry.
    pub fn read_content(&mut self, buf: &mut [u8]) -> Result<()> {
        let active = self
            .active
            .as_mut()
            .ok_or(Error::Decompress("no active entry content to read"))?;
        active.fill_buffer(buf)?;
        self.crc.digest(buf);
        self.bytes_read += buf.len() as u64;
        Ok(())
    }

    /// The number of decompressed content bytes read so far for the current entry.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Whether the content read so far matches the header's recorded length and CRC-16.
    ///
    /// Only meaningful once the entry's full content has been read via [`Self::read_content`].
    pub fn content_verified(&self) -> bool {
        self.curr.as_ref().map_or(false, |h| {
            h.length == self.bytes_read && h.crc == self.crc.sum16()
        })
    }
}
