use std::io;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::fs;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

use crate::fs::{DirEntry, FileExt, Filesystem, Metadata};

#[derive(Debug)]
pub struct DiskFile(File);

impl AsyncRead for DiskFile {
    #[inline]
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_read(cx, buf)
    }
}

#[async_trait]
impl FileExt for DiskFile {
    async fn metadata(&self) -> io::Result<Metadata> {
        let raw_metadata = self.0.metadata().await?;

        Ok(Metadata {
            modified: raw_metadata.modified().ok(),
            len: raw_metadata.len(),
            is_dir: raw_metadata.is_dir(),
        })
    }
}

/// A [`Filesystem`] rooted at a directory on disk.
///
/// Every lookup is joined onto the root, canonicalized, and checked to still lie under the
/// canonical root, so neither `..` segments nor symlinks can reach outside it.
#[derive(Debug, Clone)]
pub struct DiskFilesystem {
    base: PathBuf,
}

impl DiskFilesystem {
    /// Canonicalizes `base` and uses it as the root. Fails if `base` does not exist.
    pub fn new(base: impl AsRef<Path>) -> io::Result<Self> {
        let base = std::fs::canonicalize(base)?;

        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    async fn build_and_validate_path(&self, path: &Path) -> io::Result<PathBuf> {
        let mut path_to_file = self.base.clone();
        for component in path.components() {
            match component {
                Component::Normal(comp) => {
                    // protect against paths like `/foo/c:/bar/baz`
                    if Path::new(&comp)
                        .components()
                        .all(|c| matches!(c, Component::Normal(_)))
                    {
                        path_to_file.push(comp)
                    } else {
                        return Err(escapes_root());
                    }
                }
                Component::CurDir => {}
                Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                    return Err(escapes_root());
                }
            }
        }

        let canonical = fs::canonicalize(&path_to_file).await?;
        if !canonical.starts_with(&self.base) {
            return Err(escapes_root());
        }

        Ok(canonical)
    }
}

fn escapes_root() -> io::Error {
    io::Error::new(ErrorKind::PermissionDenied, "path escapes the served root")
}

#[async_trait]
impl Filesystem for DiskFilesystem {
    type File = DiskFile;

    async fn open(&self, path: &Path) -> io::Result<Self::File> {
        let path = self.build_and_validate_path(path).await?;
        let file = File::open(&path).await?;

        Ok(DiskFile(file))
    }

    async fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        let path = self.build_and_validate_path(path).await?;
        let raw_metadata = fs::metadata(&path).await?;

        Ok(Metadata {
            modified: raw_metadata.modified().ok(),
            len: raw_metadata.len(),
            is_dir: raw_metadata.is_dir(),
        })
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let path = self.build_and_validate_path(path).await?;
        let mut read_dir = fs::read_dir(&path).await?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let is_symlink = entry
                .file_type()
                .await
                .map(|file_type| file_type.is_symlink())
                .unwrap_or(false);
            // follows symlinks, a link to a directory is listed as one
            let is_dir = fs::metadata(entry.path())
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);

            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
                is_symlink,
            });
        }

        Ok(entries)
    }
}
