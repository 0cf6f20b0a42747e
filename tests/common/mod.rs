//! Shared byte-building helpers for the integration tests. Not a test binary itself (cargo only
//! treats direct children of `tests/` that way); each test module pulls this in via `mod common;`.
#![allow(dead_code)]

/// Packs individual bit groups MSB-first into bytes, zero-padding the final byte on [`finish`].
pub struct BitWriter {
    bytes: Vec<u8>,
    cur: u8,
    nbits: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter { bytes: Vec::new(), cur: 0, nbits: 0 }
    }

    /// Appends the low `n` bits of `value`, most-significant bit first.
    pub fn push_bits(&mut self, value: u32, n: u32) {
        for i in (0..n).rev() {
            let bit = ((value >> i) & 1) as u8;
            self.cur = (self.cur << 1) | bit;
            self.nbits += 1;
            if self.nbits == 8 {
                self.bytes.push(self.cur);
                self.cur = 0;
                self.nbits = 0;
            }
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.cur <<= 8 - self.nbits;
            self.bytes.push(self.cur);
        }
        self.bytes
    }
}

/// Builds a level-0 LHA header: no extra-header chain, filename carried inline.
pub fn build_level0_header(
    compression: &[u8; 5],
    compressed_size: u32,
    original_size: u32,
    last_modified: u32,
    filename: &[u8],
    file_crc: u16,
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(compression);
    body.extend_from_slice(&compressed_size.to_le_bytes());
    body.extend_from_slice(&original_size.to_le_bytes());
    body.extend_from_slice(&last_modified.to_le_bytes());
    body.push(0); // msdos_attrs
    body.push(0); // lha_level
    body.push(filename.len() as u8);
    body.extend_from_slice(filename);
    body.extend_from_slice(&file_crc.to_le_bytes());

    let header_len = body.len() as u8;
    let csum = body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));

    let mut out = Vec::with_capacity(2 + body.len());
    out.push(header_len);
    out.push(csum);
    out.extend_from_slice(&body);
    out
}

/// Builds a level-1 LHA header, with an optional chain of extra-header records.
///
/// Each record is `(tag, data)`; the trailing 2-byte "next link length" field and the chain
/// termination (`0`) are filled in automatically.
pub fn build_level1_header(
    compression: &[u8; 5],
    compressed_size: u32,
    original_size: u32,
    filename: &[u8],
    file_crc: u16,
    os_type: u8,
    extra_records: &[(u8, Vec<u8>)],
) -> Vec<u8> {
    let lengths: Vec<u16> = extra_records.iter().map(|(_, data)| (1 + data.len() + 2) as u16).collect();
    let mut chain_bytes = Vec::new();
    for (i, (tag, data)) in extra_records.iter().enumerate() {
        chain_bytes.push(*tag);
        chain_bytes.extend_from_slice(data);
        let next_len = lengths.get(i + 1).copied().unwrap_or(0);
        chain_bytes.extend_from_slice(&next_len.to_le_bytes());
    }
    let first_header_len: u16 = lengths.first().copied().unwrap_or(0);
    let extra_total_len = chain_bytes.len() as u32;

    let mut body = Vec::new();
    body.extend_from_slice(compression);
    body.extend_from_slice(&(compressed_size + extra_total_len).to_le_bytes());
    body.extend_from_slice(&original_size.to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes()); // last_modified, superseded by a unix-time extra header
    body.push(0); // msdos_attrs
    body.push(1); // lha_level
    body.push(filename.len() as u8);
    body.extend_from_slice(filename);
    body.extend_from_slice(&file_crc.to_le_bytes());
    body.push(os_type);
    body.extend_from_slice(&first_header_len.to_le_bytes());

    let header_len = body.len() as u8;
    let csum = body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));

    let mut out = Vec::with_capacity(2 + body.len() + chain_bytes.len());
    out.push(header_len);
    out.push(csum);
    out.extend_from_slice(&body);
    out.extend_from_slice(&chain_bytes);
    out
}

/// The single byte marking the end of an archive's header stream.
pub const END_OF_ARCHIVE: u8 = 0;

pub const EXT_HEADER_UNIX_PERM: u8 = 0x50;
pub const EXT_HEADER_UNIX_UIDGID: u8 = 0x51;
pub const EXT_HEADER_UNIX_TIME: u8 = 0x54;

/// Builds a degenerate (`-lh5-`/`-lh6-`-family) single-command block: a 16-bit block length of
/// `1`, a degenerate temp/offset tree (unused by a literal command), a degenerate command tree
/// fixed to `command`, and a degenerate offset tree fixed to `offset_code`.
pub fn lhnew_single_command_block(w: &mut BitWriter, command: u32, offset_bits: u32, offset_code: u32) {
    w.push_bits(1, 16); // block_len
    w.push_bits(0, 5); // nt = 0 (degenerate temp tree, unused since nc = 0)
    w.push_bits(0, 5); // skip_code (irrelevant, never read back)
    w.push_bits(0, 9); // nc = 0 (degenerate command tree)
    w.push_bits(command, 9);
    w.push_bits(0, offset_bits); // no = 0 (degenerate offset tree)
    w.push_bits(offset_code, offset_bits);
}

/// Builds a degenerate block emitting `block_len` repeats of a single literal byte.
pub fn lhnew_literal_run_block(w: &mut BitWriter, literal: u8, block_len: u32, offset_bits: u32) {
    w.push_bits(block_len, 16);
    w.push_bits(0, 5);
    w.push_bits(0, 5);
    w.push_bits(0, 9);
    w.push_bits(literal as u32, 9);
    w.push_bits(0, offset_bits);
    w.push_bits(0, offset_bits);
}
