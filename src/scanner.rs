use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Ignored,
}

/// Extension sets (lowercase, no leading dot) that make a file part of a batch.
#[derive(Debug, Clone)]
pub struct Extensions {
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

impl Default for Extensions {
    fn default() -> Self {
        let owned = |list: &[&str]| -> Vec<String> { list.iter().map(|e| e.to_string()).collect() };
        Self {
            images: owned(&[
                "jpg", "jpeg", "tif", "tiff", "png", "webp", "heic", "heif", "gif", "bmp",
            ]),
            videos: owned(&["mp4", "mov", "m4v", "avi", "mkv", "3gp"]),
        }
    }
}

impl Extensions {
    pub fn classify(&self, ext: &str) -> MediaKind {
        let ext = ext.to_ascii_lowercase();
        if self.images.iter().any(|e| *e == ext) {
            MediaKind::Image
        } else if self.videos.iter().any(|e| *e == ext) {
            MediaKind::Video
        } else {
            MediaKind::Ignored
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    /// Path relative to the scanned root.
    pub relative: PathBuf,
    /// Lowercased extension without the dot.
    pub extension: String,
    pub kind: MediaKind,
}

impl CandidateFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }
}

/// Lazy walk over the files directly inside a source directory.
///
/// Entries come out sorted by file name. Sub-directories are never descended
/// into, and entries that fail to read are logged and skipped. The iterator is
/// one-shot.
pub struct Candidates {
    root: PathBuf,
    walker: walkdir::IntoIter,
    extensions: Extensions,
}

pub fn scan_files(input_dir: &Path, extensions: Extensions) -> Candidates {
    Candidates {
        root: input_dir.to_path_buf(),
        walker: WalkDir::new(input_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter(),
        extensions,
    }
}

impl Iterator for Candidates {
    type Item = CandidateFile;

    fn next(&mut self) -> Option<CandidateFile> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if entry.depth() > 0 {
                    info!("Skipping dir: {}", entry.path().display());
                    self.walker.skip_current_dir();
                }
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();

            let kind = self.extensions.classify(&extension);
            if kind == MediaKind::Ignored {
                debug!("Ignoring {}", path.display());
                continue;
            }

            let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
            return Some(CandidateFile {
                path: path.to_path_buf(),
                relative,
                extension,
                kind,
            });
        }
    }
}
