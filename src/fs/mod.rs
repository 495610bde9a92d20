use std::io;
use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::AsyncRead;

pub mod disk;

#[derive(Debug, Clone)]
pub struct Metadata {
    pub modified: Option<SystemTime>,
    pub len: u64,
    pub is_dir: bool,
}

/// One immediate child of a directory, as shown in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
}

#[async_trait]
pub trait FileExt {
    async fn metadata(&self) -> io::Result<Metadata>;
}

/// Read-only storage the server resolves request paths against.
///
/// Paths handed to a `Filesystem` are relative to its root. Implementations must refuse
/// (with [`io::ErrorKind::PermissionDenied`]) any path that resolves outside the root.
#[async_trait]
pub trait Filesystem {
    type File: AsyncRead + FileExt + Send + Sync + Unpin;

    async fn open(&self, path: &Path) -> io::Result<Self::File>;

    async fn metadata(&self, path: &Path) -> io::Result<Metadata>;

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}
