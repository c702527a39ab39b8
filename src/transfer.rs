use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const BUFFER_SIZE: usize = 256 * 1024; // 256 KB

/// How a batch reacts when a single file cannot be opened or copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop dispatching new copies and fail the batch once in-flight copies finish
    Abort,
    /// Log the failure and carry on with the rest of the batch
    Skip,
}

/// Copy `src` to `dest`, returning the number of bytes written.
///
/// Data goes to a hidden `.part` file next to `dest` which is linked into
/// place only once fully written, so `dest` never exists half-written. An
/// existing `dest` is never replaced. The partial file is removed either way.
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64> {
    let part = part_path(dest)?;
    match copy_into(src, &part) {
        Ok(bytes) => {
            let placed = publish(&part, dest);
            let _ = fs::remove_file(&part);
            placed.with_context(|| format!("Cannot move {} into place", dest.display()))?;
            debug!("Copied {} -> {} ({} bytes)", src.display(), dest.display(), bytes);
            Ok(bytes)
        }
        Err(e) => {
            let _ = fs::remove_file(&part);
            Err(e)
        }
    }
}

/// Hard-link `part` to `dest`, failing if `dest` exists. Filesystems without
/// hard links fall back to a rename guarded by an existence check.
fn publish(part: &Path, dest: &Path) -> io::Result<()> {
    match fs::hard_link(part, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            debug!("Hard link to {} failed ({}), renaming instead", dest.display(), e);
            if dest.exists() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", dest.display()),
                ));
            }
            fs::rename(part, dest)
        }
    }
}

fn part_path(dest: &Path) -> Result<PathBuf> {
    let name = dest
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Destination has no file name: {}", dest.display()))?;
    let mut part = std::ffi::OsString::from(".");
    part.push(name);
    part.push(".part");
    Ok(dest.with_file_name(part))
}

fn copy_into(src: &Path, part: &Path) -> Result<u64> {
    let mut source =
        fs::File::open(src).with_context(|| format!("Cannot read file {}", src.display()))?;
    let mut destination =
        fs::File::create(part).with_context(|| format!("Cannot write file {}", part.display()))?;
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = source
            .read(&mut buffer)
            .with_context(|| format!("Cannot read file {}", src.display()))?;
        if bytes_read == 0 {
            break;
        }
        destination
            .write_all(&buffer[..bytes_read])
            .with_context(|| format!("Cannot write file {}", part.display()))?;
        total += bytes_read as u64;
    }
    destination
        .flush()
        .with_context(|| format!("Cannot write file {}", part.display()))?;

    // Preserve modified time
    match source.metadata().and_then(|m| m.modified()) {
        Ok(mtime) => {
            if let Err(e) = destination.set_modified(mtime) {
                debug!("Cannot set modified time on {}: {}", part.display(), e);
            }
        }
        Err(e) => debug!("Cannot read modified time of {}: {}", src.display(), e),
    }

    Ok(total)
}
