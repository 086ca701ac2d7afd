//! One file path opened by every worker of a group.
//!
//! Open and close are collective: every worker calls them, and if any
//! worker fails the call fails on all of them. Reads and writes are
//! positioned, so workers never share a cursor.

use crate::error::{BenchError, Result};
use crate::group::ProcessGroup;
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Access mode for a collective open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create if missing, write only. Existing contents are kept.
    CreateWrite,
    /// Read only; the file must exist.
    ReadOnly,
}

impl OpenMode {
    fn options(self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        match self {
            Self::CreateWrite => opts.write(true).create(true),
            Self::ReadOnly => opts.read(true),
        };
        opts
    }
}

/// A worker's handle on the shared file.
#[derive(Debug)]
pub struct SharedFile {
    file: File,
    path: PathBuf,
    mode: OpenMode,
}

impl SharedFile {
    /// Collective open.
    pub fn open<G: ProcessGroup + ?Sized>(group: &G, path: &Path, mode: OpenMode) -> Result<Self> {
        let local = mode.options().open(path);
        let everyone = group.all_agree(local.is_ok());

        match local {
            Err(source) => Err(BenchError::Open {
                path: path.to_path_buf(),
                source,
            }),
            Ok(_) if !everyone => {
                warn!(
                    "rank {}: open of {} failed on another worker",
                    group.identity().rank,
                    path.display()
                );
                Err(BenchError::PeerOpen {
                    path: path.to_path_buf(),
                })
            }
            Ok(file) => Ok(Self {
                file,
                path: path.to_path_buf(),
                mode,
            }),
        }
    }

    /// Write `buf` at `offset`, retrying until done or the OS stops accepting bytes.
    ///
    /// Returns the number of bytes actually written.
    pub fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize> {
        let mut done = 0;
        while done < buf.len() {
            let pos = offset + done as u64;
            match pwrite(&self.file, &buf[done..], pos) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(source) => return Err(BenchError::Io { offset: pos, source }),
            }
        }
        Ok(done)
    }

    /// Read into `buf` from `offset` until it is full or end of file.
    ///
    /// Returns the number of bytes actually read.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut done = 0;
        while done < buf.len() {
            let pos = offset + done as u64;
            match pread(&self.file, &mut buf[done..], pos) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(source) => return Err(BenchError::Io { offset: pos, source }),
            }
        }
        Ok(done)
    }

    /// Collective close. Written data is synced before the handle is released.
    pub fn close<G: ProcessGroup + ?Sized>(self, group: &G) -> Result<()> {
        let local = match self.mode {
            OpenMode::CreateWrite => self.file.sync_all(),
            OpenMode::ReadOnly => Ok(()),
        };
        if let Err(e) = &local {
            warn!(
                "rank {}: sync of {} failed: {e}",
                group.identity().rank,
                self.path.display()
            );
        }
        let path = self.path;
        drop(self.file);

        if group.all_agree(local.is_ok()) {
            Ok(())
        } else {
            Err(BenchError::Close { path })
        }
    }
}

/// Collective delete: rank 0 removes the file, then everyone waits.
///
/// Returns `false` on the coordinator when removal failed. Failure is
/// logged and otherwise ignored.
pub fn delete<G: ProcessGroup + ?Sized>(group: &G, path: &Path) -> bool {
    let mut removed = true;
    if group.identity().is_coordinator() {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("deleted {}", path.display()),
            Err(e) => {
                warn!("failed to delete {}: {e}", path.display());
                removed = false;
            }
        }
    }
    group.barrier();
    removed
}

#[cfg(unix)]
fn pwrite(file: &File, buf: &[u8], offset: u64) -> std::io::Result<usize> {
    std::os::unix::fs::FileExt::write_at(file, buf, offset)
}

#[cfg(unix)]
fn pread(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, offset)
}

#[cfg(windows)]
fn pwrite(file: &File, buf: &[u8], offset: u64) -> std::io::Result<usize> {
    std::os::windows::fs::FileExt::seek_write(file, buf, offset)
}

#[cfg(windows)]
fn pread(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, buf, offset)
}
