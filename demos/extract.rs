//! Extracts every entry of an archive given on the command line into a destination directory,
//! printing each entry's path and a progress bar driven by the decoder's own block size.
use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use lharch::{DirPolicy, Entry, Extractor, UnixPlatform};

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args_os().skip(1);
    let (archive_path, dest_root) = match (args.next(), args.next()) {
        (Some(a), Some(d)) => (PathBuf::from(a), PathBuf::from(d)),
        _ => {
            eprintln!("usage: extract <archive.lzh> <dest-dir>");
            return ExitCode::FAILURE;
        }
    };

    match run(&archive_path, &dest_root) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(archive_path: &std::path::Path, dest_root: &std::path::Path) -> io::Result<()> {
    std::fs::create_dir_all(dest_root)?;
    let mut archive = lharch::open_file(archive_path)?;
    archive.set_dir_policy(DirPolicy::EndOfDir);
    let extractor = Extractor::new(UnixPlatform);

    while let Some(entry) = archive.next_entry().map_err(io::Error::from)? {
        match entry {
            Entry::Normal(header) => {
                println!("{}", header.full_path());
                if !archive.is_decoder_supported() {
                    eprintln!("  skipping: unsupported compression method {}", header.compress_method);
                    continue;
                }
                let defer = header.is_directory();
                let mut last_pct = u64::MAX;
                extractor
                    .extract_normal(
                        &mut archive,
                        &header,
                        dest_root,
                        defer,
                        Some(&mut |done, total| {
                            let pct = if total == 0 { 100 } else { done * 100 / total };
                            if pct != last_pct {
                                eprint!("\r  {:>3}%", pct);
                                last_pct = pct;
                            }
                        }),
                    )
                    .map_err(io::Error::from)?;
                if !defer {
                    eprintln!();
                }
                if defer {
                    archive.defer_directory(header);
                }
            }
            Entry::FakeDir(header) => {
                extractor.apply_fake_dir(&header, dest_root).map_err(io::Error::from)?;
            }
        }
    }
    Ok(())
}
