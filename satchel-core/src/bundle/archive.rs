//! ZIP extraction into a bundle workspace.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Error, Result};

const COPY_BUF_SIZE: usize = 16 * 1024;

/// Extracts `archive` into `dest`, preserving relative paths.
///
/// The output directory is created if missing. Entries that would escape
/// `dest` are rejected. Every failure, including I/O while streaming entry
/// contents, surfaces as [`Error::ArchiveCorrupt`].
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).map_err(|err| {
        corrupt(format!(
            "cannot create output directory {}: {err}",
            dest.display()
        ))
    })?;

    let file = File::open(archive)
        .map_err(|err| corrupt(format!("cannot open archive {}: {err}", archive.display())))?;
    let mut zip = ZipArchive::new(file)
        .map_err(|err| corrupt(format!("cannot read archive {}: {err}", archive.display())))?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|err| corrupt(format!("cannot read entry {index}: {err}")))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(corrupt(format!(
                "entry '{}' escapes the output directory",
                entry.name()
            )));
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|err| {
                corrupt(format!("cannot create {}: {err}", target.display()))
            })?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                corrupt(format!("cannot create {}: {err}", parent.display()))
            })?;
        }

        let mut out = File::create(&target)
            .map_err(|err| corrupt(format!("cannot create {}: {err}", target.display())))?;
        let mut buf = [0u8; COPY_BUF_SIZE];
        loop {
            let read = entry
                .read(&mut buf)
                .map_err(|err| corrupt(format!("cannot read '{}': {err}", entry.name())))?;
            if read == 0 {
                break;
            }
            out.write_all(&buf[..read])
                .map_err(|err| corrupt(format!("cannot write {}: {err}", target.display())))?;
        }
    }

    Ok(())
}

fn corrupt(message: String) -> Error {
    Error::ArchiveCorrupt { message }
}
