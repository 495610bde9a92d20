use std::path::{Component, Path, PathBuf};

use http::StatusCode;
use percent_encoding::percent_decode_str;

/// A request path that has been percent-decoded and checked segment by segment.
///
/// `relative` never contains `..`, a root, or a drive prefix, so joining it onto the served
/// root cannot climb out lexically. Symlinks are dealt with by the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestPath {
    pub(crate) decoded: String,
    pub(crate) relative: PathBuf,
    pub(crate) trailing_slash: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathRejection {
    /// Not valid percent-encoded UTF-8.
    BadEncoding,
    /// Tries to reach outside the root.
    Traversal,
}

impl PathRejection {
    pub(crate) fn status(self) -> StatusCode {
        match self {
            PathRejection::BadEncoding => StatusCode::BAD_REQUEST,
            PathRejection::Traversal => StatusCode::FORBIDDEN,
        }
    }
}

impl RequestPath {
    /// Parses the path component of a request URI (no query string).
    pub(crate) fn parse(uri_path: &str) -> Result<Self, PathRejection> {
        let decoded = percent_decode_str(uri_path)
            .decode_utf8()
            .map_err(|_| PathRejection::BadEncoding)?
            .into_owned();

        let mut relative = PathBuf::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => return Err(PathRejection::Traversal),
                segment if segment.contains('\\') || segment.contains('\0') => {
                    return Err(PathRejection::Traversal)
                }
                segment => {
                    if !Path::new(segment)
                        .components()
                        .all(|c| matches!(c, Component::Normal(_)))
                    {
                        return Err(PathRejection::Traversal);
                    }
                    relative.push(segment);
                }
            }
        }

        let trailing_slash = decoded.ends_with('/');
        let decoded = if decoded.starts_with('/') {
            decoded
        } else {
            format!("/{decoded}")
        };

        Ok(Self {
            decoded,
            relative,
            trailing_slash,
        })
    }
}
