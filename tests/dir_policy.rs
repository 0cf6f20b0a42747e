//! Integration coverage for the deferred directory-metadata policies, driven through the public
//! [`ArchiveReader`] API rather than `DirStack` directly.
use std::io::Cursor;

use lharch::header::{CompressionMethod, ExtraFlags, FileHeader, OsType};
use lharch::{ArchiveReader, DirPolicy, HeaderSource};

struct ScriptedSource {
    headers: std::vec::IntoIter<FileHeader>,
}

impl HeaderSource<Cursor<Vec<u8>>> for ScriptedSource {
    fn next_header(&mut self, _rd: &mut Cursor<Vec<u8>>) -> lharch::Result<Option<FileHeader>> {
        Ok(self.headers.next())
    }
}

fn header(path: &str, filename: &str, is_dir: bool) -> FileHeader {
    FileHeader {
        path: path.to_string(),
        filename: filename.to_string(),
        compress_method: if is_dir { CompressionMethod::Lhd } else { CompressionMethod::Lh0 },
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

fn reader(headers: Vec<FileHeader>, policy: DirPolicy) -> ArchiveReader<ScriptedSource, Cursor<Vec<u8>>> {
    let source = ScriptedSource { headers: headers.into_iter() };
    ArchiveReader::new(Cursor::new(Vec::new()), source, policy)
}

/// `-lhd- sub/` then `-lh5- sub/f`, under `EndOfDir`: the directory is re-yielded as a `FakeDir`
/// as soon as an entry outside its subtree appears.
#[test]
fn end_of_dir_reyields_directory_once_its_subtree_ends() {
    let headers = vec![header("sub/", "", true), header("sub/", "f", false), header("", "other", false)];
    let mut archive = reader(headers, DirPolicy::EndOfDir);

    let e1 = archive.next_entry().unwrap().unwrap();
    assert!(!e1.is_fake_dir());
    archive.defer_directory(e1.header().clone());

    let e2 = archive.next_entry().unwrap().unwrap();
    assert_eq!(e2.header().full_path(), "sub/f");
    assert!(!e2.is_fake_dir());

    let e3 = archive.next_entry().unwrap().unwrap();
    assert!(e3.is_fake_dir());
    assert_eq!(e3.header().full_path(), "sub/");

    let e4 = archive.next_entry().unwrap().unwrap();
    assert!(!e4.is_fake_dir());
    assert_eq!(e4.header().full_path(), "other");

    assert!(archive.next_entry().unwrap().is_none());
}

#[test]
fn nested_directories_pop_in_lifo_order_under_end_of_dir() {
    let headers = vec![
        header("a/", "", true),
        header("a/b/", "", true),
        header("a/b/", "f", false),
        header("", "top", false),
    ];
    let mut archive = reader(headers, DirPolicy::EndOfDir);

    let a = archive.next_entry().unwrap().unwrap();
    archive.defer_directory(a.header().clone());
    let ab = archive.next_entry().unwrap().unwrap();
    assert_eq!(ab.header().full_path(), "a/b/");
    archive.defer_directory(ab.header().clone());
    let f = archive.next_entry().unwrap().unwrap();
    assert_eq!(f.header().full_path(), "a/b/f");

    // "top" is outside both a/b/ and a/, so both directories pop, innermost first
    let pop1 = archive.next_entry().unwrap().unwrap();
    assert!(pop1.is_fake_dir());
    assert_eq!(pop1.header().full_path(), "a/b/");
    let pop2 = archive.next_entry().unwrap().unwrap();
    assert!(pop2.is_fake_dir());
    assert_eq!(pop2.header().full_path(), "a/");
    let top = archive.next_entry().unwrap().unwrap();
    assert!(!top.is_fake_dir());
    assert_eq!(top.header().full_path(), "top");
}

#[test]
fn end_of_file_defers_every_directory_until_the_archive_is_exhausted() {
    let headers = vec![header("a/", "", true), header("b/", "", true), header("", "f", false)];
    let mut archive = reader(headers, DirPolicy::EndOfFile);

    let a = archive.next_entry().unwrap().unwrap();
    archive.defer_directory(a.header().clone());
    let b = archive.next_entry().unwrap().unwrap();
    archive.defer_directory(b.header().clone());
    let f = archive.next_entry().unwrap().unwrap();
    assert!(!f.is_fake_dir());
    assert_eq!(f.header().full_path(), "f");

    // both directories flush only now, in LIFO order
    let pop1 = archive.next_entry().unwrap().unwrap();
    assert!(pop1.is_fake_dir());
    assert_eq!(pop1.header().full_path(), "b/");
    let pop2 = archive.next_entry().unwrap().unwrap();
    assert!(pop2.is_fake_dir());
    assert_eq!(pop2.header().full_path(), "a/");
    assert!(archive.next_entry().unwrap().is_none());
}

#[test]
fn plain_policy_never_yields_a_fake_dir() {
    let headers = vec![header("sub/", "", true), header("", "other", false)];
    let mut archive = reader(headers, DirPolicy::Plain);

    let e1 = archive.next_entry().unwrap().unwrap();
    archive.defer_directory(e1.header().clone()); // no-op under Plain

    let e2 = archive.next_entry().unwrap().unwrap();
    assert!(!e2.is_fake_dir());
    assert_eq!(e2.header().full_path(), "other");
    assert!(archive.next_entry().unwrap().is_none());
}

/// `pop_ended` consults the reader's *current* policy, not the one a directory was pushed
/// under: switching to `Plain` mid-stream flushes whatever is already retained on the very
/// next entry, and nothing pushed afterwards is retained at all.
#[test]
fn switching_to_plain_mid_stream_flushes_the_stack_on_the_next_entry() {
    let headers = vec![header("a/", "", true), header("", "other", false)];
    let mut archive = reader(headers, DirPolicy::EndOfDir);

    let a = archive.next_entry().unwrap().unwrap();
    archive.defer_directory(a.header().clone());
    archive.set_dir_policy(DirPolicy::Plain);

    let popped = archive.next_entry().unwrap().unwrap();
    assert!(popped.is_fake_dir());
    assert_eq!(popped.header().full_path(), "a/");

    let other = archive.next_entry().unwrap().unwrap();
    assert!(!other.is_fake_dir());
    assert_eq!(other.header().full_path(), "other");
    assert!(archive.next_entry().unwrap().is_none());
}
