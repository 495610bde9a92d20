use std::convert::Infallible;
use std::io;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::header::ALLOW;
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use http_body::{Body, Empty, Full};
use tokio::io::AsyncRead;
use tower_service::Service;

use crate::async_body::AsyncReadBody;
use crate::fs::Filesystem;
use crate::headers::IfModifiedSince;
use crate::listing::{render_error, render_listing, HTML_UTF8};
use crate::open_file::{open_file, FileOpened, FileRequestExtent, OpenFileOutput};
use crate::path::{PathRejection, RequestPath};
use crate::ResponseBody;

// default capacity 64KiB
const DEFAULT_CAPACITY: usize = 65536;

/// Service that serves files from a given directory and all its sub directories.
///
/// The `Content-Type` will be guessed from the file extension. Requesting a directory serves
/// its `index.html` (or `index.htm`), or an HTML listing of its children when there is none.
///
/// | Request | Response |
/// |---|---|
/// | method other than `GET` / `HEAD` | `501 Not Implemented` |
/// | path that is not valid percent-encoded UTF-8 | `400 Bad Request` |
/// | path with a `..` segment, a backslash, or leaving the root through a symlink | `403 Forbidden` |
/// | file we don't have permission to read | `403 Forbidden` |
/// | missing file | `404 Not Found` |
/// | directory without a trailing slash | `301 Moved Permanently` |
/// | any other I/O failure | `500 Internal Server Error` |
///
/// The service never fails: errors are turned into responses, so layers wrapped around it
/// see every response.
///
/// # Example
///
/// ```no_run
/// use nocache_serve::ServeDir;
/// use nocache_serve::fs::disk::DiskFilesystem;
///
/// # async {
/// // This will serve files in the "assets" directory and
/// // its subdirectories
/// let service = ServeDir::new(DiskFilesystem::new("assets").unwrap());
///
/// // Run our service using `hyper`
/// let addr = std::net::SocketAddr::from(([127, 0, 0, 1], 3000));
/// hyper::Server::bind(&addr)
///     .serve(tower::make::Shared::new(service))
///     .await
///     .expect("server error");
/// # };
/// ```
#[derive(Debug, Clone)]
pub struct ServeDir<FS> {
    buf_chunk_size: usize,
    filesystem: FS,
}

impl<FS> ServeDir<FS> {
    /// Create a new [`ServeDir`].
    pub fn new(filesystem: FS) -> Self {
        Self {
            buf_chunk_size: DEFAULT_CAPACITY,
            filesystem,
        }
    }

    /// Set a specific read buffer chunk size.
    ///
    /// The default capacity is 64kb.
    pub fn with_buf_chunk_size(mut self, chunk_size: usize) -> Self {
        self.buf_chunk_size = chunk_size;
        self
    }
}

impl<ReqBody, FS> Service<Request<ReqBody>> for ServeDir<FS>
where
    FS: Filesystem + Clone + Send + Sync + 'static,
    FS::File: 'static,
{
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    #[inline]
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let this = self.clone();

        // `ServeDir` doesn't care about the request body
        let (parts, _body) = req.into_parts();

        Box::pin(async move {
            let method = parts.method;
            if method != Method::GET && method != Method::HEAD {
                let mut res = error_response(
                    StatusCode::NOT_IMPLEMENTED,
                    &format!("Unsupported method ('{method}')"),
                    false,
                );
                res.headers_mut()
                    .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));

                return Ok(res);
            }
            let head = method == Method::HEAD;

            let path = match RequestPath::parse(parts.uri.path()) {
                Ok(path) => path,
                Err(rejection) => {
                    if rejection == PathRejection::Traversal {
                        tracing::warn!(path = parts.uri.path(), "rejected path outside root");
                    }
                    let message = match rejection {
                        PathRejection::BadEncoding => "Bad request path",
                        PathRejection::Traversal => "Path is outside the served directory",
                    };
                    return Ok(error_response(rejection.status(), message, head));
                }
            };

            let if_modified_since = parts
                .headers
                .get(header::IF_MODIFIED_SINCE)
                .and_then(IfModifiedSince::from_header_value);

            let output = open_file(
                &this.filesystem,
                &path,
                &method,
                &parts.uri,
                if_modified_since,
            )
            .await;

            let res = match output {
                Ok(OpenFileOutput::FileOpened(file_output)) => {
                    build_response(*file_output, this.buf_chunk_size)
                }

                Ok(OpenFileOutput::Listing(entries)) => {
                    html_response(StatusCode::OK, render_listing(&path.decoded, entries), head)
                }

                Ok(OpenFileOutput::Redirect { location }) => {
                    let mut res = response_with_status(StatusCode::MOVED_PERMANENTLY);
                    res.headers_mut().insert(header::LOCATION, location);
                    res.headers_mut()
                        .insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));

                    res
                }

                Ok(OpenFileOutput::FileNotFound) => not_found(head),

                Ok(OpenFileOutput::NotModified) => response_with_status(StatusCode::NOT_MODIFIED),

                Err(err) => match err.kind() {
                    io::ErrorKind::NotFound => not_found(head),
                    io::ErrorKind::PermissionDenied => {
                        tracing::warn!(path = %path.decoded, %err, "access refused");
                        error_response(StatusCode::FORBIDDEN, "Access denied", head)
                    }
                    _ => {
                        tracing::error!(path = %path.decoded, %err, "failed to serve file");
                        error_response(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Internal server error",
                            head,
                        )
                    }
                },
            };

            Ok(res)
        })
    }
}

fn response_with_status(status: StatusCode) -> Response<ResponseBody> {
    let mut res = Response::new(empty_body());
    *res.status_mut() = status;
    res
}

fn empty_body() -> ResponseBody {
    Empty::new().map_err(|err| match err {}).boxed_unsync()
}

fn body_from_bytes(bytes: Bytes) -> ResponseBody {
    Full::from(bytes).map_err(|err| match err {}).boxed_unsync()
}

/// An HTML response. `Content-Length` is always the page length, the body is dropped for
/// `HEAD`.
fn html_response(status: StatusCode, page: String, head: bool) -> Response<ResponseBody> {
    let len = page.len();
    let body = if head {
        empty_body()
    } else {
        body_from_bytes(Bytes::from(page))
    };

    let mut res = Response::new(body);
    *res.status_mut() = status;
    res.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_UTF8));
    res.headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    res
}

fn error_response(status: StatusCode, message: &str, head: bool) -> Response<ResponseBody> {
    html_response(status, render_error(status, message), head)
}

fn not_found(head: bool) -> Response<ResponseBody> {
    error_response(StatusCode::NOT_FOUND, "File not found", head)
}

fn build_response<IO: AsyncRead + Send + 'static>(
    output: FileOpened<IO>,
    chunk_size: usize,
) -> Response<ResponseBody> {
    let (body, size) = match output.extent {
        FileRequestExtent::Full(file, meta) => (
            AsyncReadBody::with_capacity(file, chunk_size, meta.len).boxed_unsync(),
            meta.len,
        ),
        FileRequestExtent::Head(meta) => (empty_body(), meta.len),
    };

    let mut res = Response::new(body);
    let headers = res.headers_mut();
    headers.insert(header::CONTENT_TYPE, output.mime_header_value);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    if let Some(last_modified) = output.last_modified {
        headers.insert(header::LAST_MODIFIED, last_modified.to_header_value());
    }

    res
}
