//! Per-path advisory locks for the write phase.
//!
//! Each target path maps to one lock file under the lock directory, named
//! by the blake3 hash of the resolved path. Locks are taken in sorted
//! order so two writers over overlapping path sets cannot deadlock.

use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use fd_lock::RwLock;
use tracing::debug;

/// Lock directory handle
#[derive(Debug, Clone)]
pub struct PathLocks
{
    dir: PathBuf,
}

impl PathLocks
{
    pub fn new(dir: impl Into<PathBuf>) -> Self
    {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path
    {
        &self.dir
    }

    /// Lock file backing `target`
    pub fn lock_file_for(
        &self,
        target: &Path,
    ) -> PathBuf
    {
        let hash = blake3::hash(
            target
                .to_string_lossy()
                .as_bytes(),
        );
        self.dir
            .join(format!("{}.lock", &hash.to_hex()[..16]))
    }

    /// Run `f` while holding exclusive locks on every path in `targets`.
    ///
    /// Errors carry the lock file that could not be opened or locked.
    pub fn with_locked<T>(
        &self,
        targets: &[PathBuf],
        f: impl FnOnce() -> T,
    ) -> Result<T, (PathBuf, io::Error)>
    {
        fs::create_dir_all(&self.dir).map_err(|e| (self.dir.clone(), e))?;

        let mut lock_paths: Vec<PathBuf> = targets
            .iter()
            .map(|t| self.lock_file_for(t))
            .collect();
        lock_paths.sort();
        lock_paths.dedup();

        let mut locks = Vec::with_capacity(lock_paths.len());
        for path in &lock_paths
        {
            let file = open_lock_file(path).map_err(|e| (path.clone(), e))?;
            locks.push(RwLock::new(file));
        }

        let mut guards = Vec::with_capacity(locks.len());
        for (lock, path) in locks
            .iter_mut()
            .zip(&lock_paths)
        {
            guards.push(
                lock.write()
                    .map_err(|e| (path.clone(), e))?,
            );
        }
        debug!(count = guards.len(), dir = %self.dir.display(), "acquired path locks");

        let out = f();
        drop(guards);
        Ok(out)
    }
}

fn open_lock_file(path: &Path) -> io::Result<File>
{
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn lock_names_are_stable_and_distinct()
    {
        let locks = PathLocks::new("/tmp/locks");
        let a = locks.lock_file_for(Path::new("/w/a.txt"));
        assert_eq!(a, locks.lock_file_for(Path::new("/w/a.txt")));
        assert_ne!(a, locks.lock_file_for(Path::new("/w/b.txt")));
        assert!(a.starts_with("/tmp/locks"));
    }

    #[test]
    fn runs_closure_under_lock()
    {
        let dir = tempfile::tempdir().unwrap();
        let locks = PathLocks::new(dir.path().join("locks"));
        let targets = vec![PathBuf::from("/w/a.txt"), PathBuf::from("/w/a.txt"), PathBuf::from("/w/b.txt")];

        let out = locks
            .with_locked(&targets, || 42)
            .unwrap();
        assert_eq!(out, 42);

        let created = fs::read_dir(locks.dir())
            .unwrap()
            .count();
        assert_eq!(created, 2);

        // released on return, so a second round succeeds
        assert!(
            locks
                .with_locked(&targets, || ())
                .is_ok()
        );
    }
}
