//! Shared test utilities for integration tests
//!
//! In-memory filesystem and a recording permission service for driving
//! `PatchTool` without touching disk, plus patch text helpers.

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, BTreeSet},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use patchgate::{
    core::permission::{PermissionRequest, PermissionService},
    infra::io::{Filesystem, PathKind},
};

/// Wrap directive lines in the patch envelope
pub fn patch(body: &str) -> String
{
    format!("*** Begin Patch\n{}\n*** End Patch", body.trim_end_matches('\n'))
}

/// Filesystem held in memory; records every mutation in order
#[derive(Default)]
pub struct MemFs
{
    files: Mutex<BTreeMap<PathBuf, String>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    log: Mutex<Vec<String>>,
    fail_writes: Mutex<BTreeSet<PathBuf>>,
}

impl MemFs
{
    pub fn with_files(files: &[(&str, &str)]) -> Self
    {
        let fs = Self::default();
        for (path, content) in files
        {
            fs.put(path, content);
        }
        fs
    }

    pub fn put(
        &self,
        path: &str,
        content: &str,
    )
    {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), content.to_string());
    }

    pub fn add_dir(
        &self,
        path: &str,
    )
    {
        self.dirs
            .lock()
            .unwrap()
            .insert(PathBuf::from(path));
    }

    /// Make writes to and removals of `path` fail with an I/O error
    pub fn fail_writes_to(
        &self,
        path: &str,
    )
    {
        self.fail_writes
            .lock()
            .unwrap()
            .insert(PathBuf::from(path));
    }

    pub fn get(
        &self,
        path: &str,
    ) -> Option<String>
    {
        self.files
            .lock()
            .unwrap()
            .get(Path::new(path))
            .cloned()
    }

    /// Mutations as "write <path>" / "remove <path>" / "mkdir <path>"
    pub fn mutations(&self) -> Vec<String>
    {
        self.log
            .lock()
            .unwrap()
            .clone()
    }

    fn record(
        &self,
        op: &str,
        path: &Path,
    )
    {
        self.log
            .lock()
            .unwrap()
            .push(format!("{op} {}", path.display()));
    }
}

impl Filesystem for MemFs
{
    fn stat(
        &self,
        path: &Path,
    ) -> io::Result<PathKind>
    {
        if self
            .dirs
            .lock()
            .unwrap()
            .contains(path)
        {
            return Ok(PathKind::Dir);
        }
        let kind = if self
            .files
            .lock()
            .unwrap()
            .contains_key(path)
        {
            PathKind::File
        }
        else
        {
            PathKind::Missing
        };
        Ok(kind)
    }

    fn read(
        &self,
        path: &Path,
    ) -> io::Result<String>
    {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn write(
        &self,
        path: &Path,
        content: &str,
    ) -> io::Result<()>
    {
        if self
            .fail_writes
            .lock()
            .unwrap()
            .contains(path)
        {
            return Err(io::Error::other("disk full"));
        }
        self.record("write", path);
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn mkdir_all(
        &self,
        dir: &Path,
    ) -> io::Result<()>
    {
        self.record("mkdir", dir);
        self.dirs
            .lock()
            .unwrap()
            .insert(dir.to_path_buf());
        Ok(())
    }

    fn remove(
        &self,
        path: &Path,
    ) -> io::Result<()>
    {
        if self
            .fail_writes
            .lock()
            .unwrap()
            .contains(path)
        {
            return Err(io::Error::other("read-only"));
        }
        self.record("remove", path);
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

/// Grants everything except the listed paths; keeps every request
#[derive(Default)]
pub struct RecordingPermissions
{
    deny: BTreeSet<String>,
    seen: Mutex<Vec<PermissionRequest>>,
}

impl RecordingPermissions
{
    pub fn denying(paths: &[&str]) -> Self
    {
        Self {
            deny: paths
                .iter()
                .map(|p| p.to_string())
                .collect(),
            seen: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<PermissionRequest>
    {
        self.seen
            .lock()
            .unwrap()
            .clone()
    }
}

impl PermissionService for RecordingPermissions
{
    fn request(
        &self,
        req: &PermissionRequest,
    ) -> bool
    {
        self.seen
            .lock()
            .unwrap()
            .push(req.clone());
        !self
            .deny
            .contains(&req.path)
    }
}
