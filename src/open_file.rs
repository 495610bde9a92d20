use std::io;
use std::path::{Path, PathBuf};

use http::{HeaderValue, Method, Uri};

use crate::fs::{DirEntry, FileExt, Filesystem, Metadata};
use crate::headers::{IfModifiedSince, LastModified};
use crate::path::RequestPath;

/// Looked up, in order, when a directory is requested.
const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

pub(crate) enum OpenFileOutput<IO> {
    FileOpened(Box<FileOpened<IO>>),
    Listing(Vec<DirEntry>),
    Redirect { location: HeaderValue },
    FileNotFound,
    NotModified,
}

pub(crate) struct FileOpened<IO> {
    pub(crate) extent: FileRequestExtent<IO>,
    pub(crate) mime_header_value: HeaderValue,
    pub(crate) last_modified: Option<LastModified>,
}

pub(crate) enum FileRequestExtent<IO> {
    Full(IO, Metadata),
    Head(Metadata),
}

/// Resolves `path` against the filesystem.
///
/// `io::ErrorKind::NotFound` and `PermissionDenied` are left for the caller to turn into
/// status codes, so are any other I/O errors.
pub(crate) async fn open_file<FS: Filesystem>(
    filesystem: &FS,
    path: &RequestPath,
    method: &Method,
    uri: &Uri,
    if_modified_since: Option<IfModifiedSince>,
) -> io::Result<OpenFileOutput<FS::File>> {
    let meta = filesystem.metadata(&path.relative).await?;

    let path_to_file = if meta.is_dir {
        if !path.trailing_slash {
            return Ok(OpenFileOutput::Redirect {
                location: append_slash_on_path(uri),
            });
        }

        match find_index(filesystem, &path.relative).await {
            Some(index) => index,
            None => {
                let entries = filesystem.read_dir(&path.relative).await?;
                return Ok(OpenFileOutput::Listing(entries));
            }
        }
    } else if path.trailing_slash {
        // `/file.txt/` names a directory that isn't there
        return Ok(OpenFileOutput::FileNotFound);
    } else {
        path.relative.clone()
    };

    let mime = mime_guess::from_path(&path_to_file)
        .first_raw()
        .map(HeaderValue::from_static)
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    if *method == Method::HEAD {
        let meta = filesystem.metadata(&path_to_file).await?;
        let last_modified = meta.modified.map(LastModified::from);
        if is_not_modified(last_modified.as_ref(), if_modified_since) {
            return Ok(OpenFileOutput::NotModified);
        }

        Ok(OpenFileOutput::FileOpened(Box::new(FileOpened {
            extent: FileRequestExtent::Head(meta),
            mime_header_value: mime,
            last_modified,
        })))
    } else {
        let file = filesystem.open(&path_to_file).await?;
        let meta = file.metadata().await?;
        let last_modified = meta.modified.map(LastModified::from);
        if is_not_modified(last_modified.as_ref(), if_modified_since) {
            return Ok(OpenFileOutput::NotModified);
        }

        Ok(OpenFileOutput::FileOpened(Box::new(FileOpened {
            extent: FileRequestExtent::Full(file, meta),
            mime_header_value: mime,
            last_modified,
        })))
    }
}

async fn find_index<FS: Filesystem>(filesystem: &FS, dir: &Path) -> Option<PathBuf> {
    for name in INDEX_FILES {
        let candidate = dir.join(name);
        if let Ok(meta) = filesystem.metadata(&candidate).await {
            if !meta.is_dir {
                return Some(candidate);
            }
        }
    }

    None
}

fn is_not_modified(
    modified: Option<&LastModified>,
    if_modified_since: Option<IfModifiedSince>,
) -> bool {
    match (modified, if_modified_since) {
        (Some(modified), Some(since)) => !since.is_modified(modified),
        // no last_modified means its always modified
        _ => false,
    }
}

fn append_slash_on_path(uri: &Uri) -> HeaderValue {
    // `//host/dir` must not become a protocol-relative redirect
    let path = format!("/{}", uri.path().trim_start_matches('/'));
    let location = match uri.query() {
        Some(query) => format!("{path}/?{query}"),
        None => format!("{path}/"),
    };

    // built from an already valid request target
    HeaderValue::from_str(&location).unwrap_or_else(|_| HeaderValue::from_static("/"))
}
