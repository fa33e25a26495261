//! Non-destructive directory merge and recursive ownership fix.
//!
//! Both operations inspect the destination before acting, so interrupting a
//! run and starting again never loses or rewrites recovered data.

use crate::error::{DrError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::os::unix::fs::{lchown, MetadataExt};
use std::path::Path;
use tracing::{debug, warn};

/// Merge policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Skip any entry whose name starts with `.`, at every depth.
    pub skip_hidden: bool,
    /// Replace files that already exist at the destination.
    pub overwrite: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            skip_hidden: true,
            overwrite: false,
        }
    }
}

/// Counters from one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Files (and symlinks) copied to the destination.
    pub files_copied: u64,
    /// Files left alone because the destination already had them.
    pub files_kept: u64,
    /// Directories created at the destination.
    pub dirs_created: u64,
    /// Hidden entries skipped.
    pub excluded: u64,
    /// Entries skipped because the destination held a different kind of entry.
    pub type_conflicts: u64,
    /// Sockets, fifos and device nodes, which are never copied.
    pub special_skipped: u64,
}

impl MergeStats {
    /// Returns true if the merge changed nothing.
    pub fn is_noop(&self) -> bool {
        self.files_copied == 0 && self.dirs_created == 0
    }
}

/// Counters from one ownership fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChownStats {
    /// Paths whose owner or group was changed.
    pub changed: u64,
    /// Paths already owned correctly.
    pub unchanged: u64,
}

/// Filesystem operations the recovery synchronizer performs on mounted trees.
///
/// All methods block; callers in async context run them on a blocking thread.
pub trait WorkspaceFs: Send + Sync {
    /// Returns true if `path` exists (without following a final symlink).
    fn exists(&self, path: &Path) -> bool;

    /// Names of the direct children of `path`, sorted.
    fn list(&self, path: &Path) -> Result<Vec<String>>;

    /// Create the directory `path`. Its parent must exist.
    fn mkdir(&self, path: &Path) -> Result<()>;

    /// Merge `src` into `dst` recursively under `opts`.
    fn merge_copy(&self, src: &Path, dst: &Path, opts: &MergeOptions) -> Result<MergeStats>;

    /// Set owner and group of `path` and everything below it.
    fn chown_recursive(&self, path: &Path, uid: u32, gid: u32) -> Result<ChownStats>;

    /// Owner and group of `path`.
    fn owner(&self, path: &Path) -> Result<(u32, u32)>;
}

/// [`WorkspaceFs`] over the local (mounted) filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    /// Create a local filesystem handle.
    pub fn new() -> Self {
        Self
    }

    fn merge_dir(
        &self,
        src: &Path,
        dst: &Path,
        opts: &MergeOptions,
        stats: &mut MergeStats,
    ) -> Result<()> {
        let mut entries = fs::read_dir(src)
            .map_err(|e| DrError::fs(src, e))?
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| DrError::fs(src, e))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name();
            if opts.skip_hidden && name.to_string_lossy().starts_with('.') {
                stats.excluded += 1;
                continue;
            }
            let from = entry.path();
            let to = dst.join(&name);
            let file_type = entry.file_type().map_err(|e| DrError::fs(&from, e))?;
            let existing = fs::symlink_metadata(&to).ok();

            if file_type.is_dir() {
                match existing {
                    Some(meta) if meta.is_dir() => {}
                    Some(_) => {
                        warn!(path = %to.display(), "destination is not a directory, skipping subtree");
                        stats.type_conflicts += 1;
                        continue;
                    }
                    None => {
                        fs::create_dir(&to).map_err(|e| DrError::fs(&to, e))?;
                        let meta = fs::metadata(&from).map_err(|e| DrError::fs(&from, e))?;
                        fs::set_permissions(&to, meta.permissions())
                            .map_err(|e| DrError::fs(&to, e))?;
                        stats.dirs_created += 1;
                        self.merge_dir(&from, &to, opts, stats)?;
                        // after the subtree, whose writes bump the mtime
                        copy_times(&meta, &to)?;
                        continue;
                    }
                }
                self.merge_dir(&from, &to, opts, stats)?;
            } else if file_type.is_symlink() {
                match existing {
                    Some(meta) if meta.is_dir() => {
                        warn!(path = %to.display(), "destination is a directory, skipping link");
                        stats.type_conflicts += 1;
                        continue;
                    }
                    Some(_) if !opts.overwrite => {
                        stats.files_kept += 1;
                        continue;
                    }
                    Some(_) => fs::remove_file(&to).map_err(|e| DrError::fs(&to, e))?,
                    None => {}
                }
                let target = fs::read_link(&from).map_err(|e| DrError::fs(&from, e))?;
                std::os::unix::fs::symlink(&target, &to).map_err(|e| DrError::fs(&to, e))?;
                stats.files_copied += 1;
            } else if file_type.is_file() {
                match existing {
                    Some(meta) if meta.is_dir() => {
                        warn!(path = %to.display(), "destination is a directory, skipping file");
                        stats.type_conflicts += 1;
                    }
                    Some(_) if !opts.overwrite => {
                        debug!(path = %to.display(), "exists, kept");
                        stats.files_kept += 1;
                    }
                    existing => {
                        if existing.is_some_and(|meta| meta.file_type().is_symlink()) {
                            // replace the link itself, never the file it points at
                            fs::remove_file(&to).map_err(|e| DrError::fs(&to, e))?;
                        }
                        let meta = entry.metadata().map_err(|e| DrError::fs(&from, e))?;
                        fs::copy(&from, &to).map_err(|e| DrError::fs(&to, e))?;
                        copy_times(&meta, &to)?;
                        stats.files_copied += 1;
                    }
                }
            } else {
                warn!(path = %from.display(), "special file skipped");
                stats.special_skipped += 1;
            }
        }
        Ok(())
    }

    fn chown_tree(&self, path: &Path, uid: u32, gid: u32, stats: &mut ChownStats) -> Result<()> {
        let meta = fs::symlink_metadata(path).map_err(|e| DrError::fs(path, e))?;
        if meta.uid() == uid && meta.gid() == gid {
            stats.unchanged += 1;
        } else {
            lchown(path, Some(uid), Some(gid)).map_err(|e| DrError::fs(path, e))?;
            stats.changed += 1;
        }
        if meta.is_dir() {
            for entry in fs::read_dir(path).map_err(|e| DrError::fs(path, e))? {
                let entry = entry.map_err(|e| DrError::fs(path, e))?;
                self.chown_tree(&entry.path(), uid, gid, stats)?;
            }
        }
        Ok(())
    }
}

/// Give `to` the access and modification times recorded in `meta`.
fn copy_times(meta: &fs::Metadata, to: &Path) -> Result<()> {
    let accessed = meta.accessed().map_err(|e| DrError::fs(to, e))?;
    let modified = meta.modified().map_err(|e| DrError::fs(to, e))?;
    let times = fs::FileTimes::new()
        .set_accessed(accessed)
        .set_modified(modified);
    fs::File::open(to)
        .and_then(|f| f.set_times(times))
        .map_err(|e| DrError::fs(to, e))
}

impl WorkspaceFs for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn list(&self, path: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| DrError::fs(path, e))? {
            let entry = entry.map_err(|e| DrError::fs(path, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn mkdir(&self, path: &Path) -> Result<()> {
        fs::create_dir(path).map_err(|e| DrError::fs(path, e))
    }

    fn merge_copy(&self, src: &Path, dst: &Path, opts: &MergeOptions) -> Result<MergeStats> {
        let mut stats = MergeStats::default();
        self.merge_dir(src, dst, opts, &mut stats)?;
        Ok(stats)
    }

    fn chown_recursive(&self, path: &Path, uid: u32, gid: u32) -> Result<ChownStats> {
        let mut stats = ChownStats::default();
        self.chown_tree(path, uid, gid, &mut stats)?;
        Ok(stats)
    }

    fn owner(&self, path: &Path) -> Result<(u32, u32)> {
        let meta = fs::symlink_metadata(path).map_err(|e| DrError::fs(path, e))?;
        Ok((meta.uid(), meta.gid()))
    }
}
