use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

pub enum FileContent {
    Mapped(Mmap),
    Buffered(String),
}

impl FileContent {
    /// Owned UTF-8 text; mapped files are validated here
    pub fn into_string(self) -> io::Result<String> {
        match self {
            FileContent::Mapped(mmap) => std::str::from_utf8(&mmap)
                .map(str::to_string)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            FileContent::Buffered(s) => Ok(s),
        }
    }
}

pub fn read_file_smart<P: AsRef<Path>>(path: P) -> Result<FileContent> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

    if metadata.len() > MMAP_THRESHOLD {
        let file =
            File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;

        // Safety: read-only mapping, dropped before any write to the same path
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map {}", path.display()))?;

        Ok(FileContent::Mapped(mmap))
    } else {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file {}", path.display()))?;

        Ok(FileContent::Buffered(content))
    }
}

/// What a path currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Dir,
    Missing,
}

/// Filesystem operations the patch tool needs
pub trait Filesystem: Send + Sync {
    fn stat(&self, path: &Path) -> io::Result<PathKind>;
    fn read(&self, path: &Path) -> io::Result<String>;
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;
    fn mkdir_all(&self, dir: &Path) -> io::Result<()>;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// `std::fs`-backed filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn stat(&self, path: &Path) -> io::Result<PathKind> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(PathKind::Dir),
            Ok(_) => Ok(PathKind::File),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PathKind::Missing),
            Err(e) => Err(e),
        }
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        read_file_smart(path)
            .map_err(|e| match e.downcast::<io::Error>() {
                Ok(io_err) => io_err,
                Err(other) => io::Error::other(format!("{other:#}")),
            })?
            .into_string()
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn mkdir_all(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Resolve a patch path against `root`; absolute paths pass through.
pub fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}
