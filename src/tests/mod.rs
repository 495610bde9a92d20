use std::path::Path;

use http::{header, HeaderMap, Method, Request, Response, StatusCode};
use hyper::Body;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::fs::disk::DiskFilesystem;
use crate::no_cache::{no_cache, NoCache, CACHE_CONTROL_VALUE, EXPIRES_VALUE, PRAGMA_VALUE};
use crate::{ResponseBody, ServeDir};


const INDEX: &str = "<!doctype html><h1>Basic Demo</h1>\n";
const TODO: &str = "<!doctype html><h1>Todo App</h1>\n";

/// A served root with:
///
/// ```text
/// demos/index.html
/// demos/todo.html
/// assets/app.js
/// assets/Style.css
/// assets/fonts/
/// legacy/index.htm
/// blob
/// ```
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::create_dir_all(root.join("demos")).unwrap();
    std::fs::write(root.join("demos/index.html"), INDEX).unwrap();
    std::fs::write(root.join("demos/todo.html"), TODO).unwrap();

    std::fs::create_dir_all(root.join("assets/fonts")).unwrap();
    std::fs::write(root.join("assets/app.js"), "console.log(1);\n").unwrap();
    std::fs::write(root.join("assets/Style.css"), "body {}\n").unwrap();

    std::fs::create_dir_all(root.join("legacy")).unwrap();
    std::fs::write(root.join("legacy/index.htm"), "old").unwrap();

    std::fs::write(root.join("blob"), [0u8, 159, 146, 150]).unwrap();

    dir
}

fn service(root: &Path) -> NoCache<ServeDir<DiskFilesystem>> {
    no_cache(ServeDir::new(DiskFilesystem::new(root).unwrap()))
}

async fn call(root: &Path, method: Method, uri: &str) -> Response<ResponseBody> {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    service(root).oneshot(req).await.unwrap()
}

async fn get(root: &Path, uri: &str) -> Response<ResponseBody> {
    call(root, Method::GET, uri).await
}

async fn body_bytes(res: Response<ResponseBody>) -> Vec<u8> {
    hyper::body::to_bytes(res.into_body())
        .await
        .unwrap()
        .to_vec()
}

async fn body_text(res: Response<ResponseBody>) -> String {
    String::from_utf8(body_bytes(res).await).unwrap()
}

#[track_caller]
fn assert_no_cache(headers: &HeaderMap) {
    assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL_VALUE);
    assert_eq!(headers[header::PRAGMA], PRAGMA_VALUE);
    assert_eq!(headers[header::EXPIRES], EXPIRES_VALUE);
}

#[tokio::test]
async fn basic() {
    let dir = fixture();

    let res = get(dir.path(), "/demos/index.html").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/html");
    assert_eq!(res.headers()["content-length"], INDEX.len().to_string());
    assert!(res.headers().contains_key(header::LAST_MODIFIED));
    assert_no_cache(res.headers());

    assert_eq!(body_text(res).await, INDEX);
}

#[tokio::test]
async fn binary_file_bytes_are_exact() {
    let dir = fixture();

    let res = get(dir.path(), "/blob").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/octet-stream");
    assert_eq!(res.headers()["content-length"], "4");
    assert_eq!(body_bytes(res).await, vec![0u8, 159, 146, 150]);
}

#[tokio::test]
async fn content_type_follows_extension() {
    let dir = fixture();

    let res = get(dir.path(), "/assets/app.js").await;
    let js = mime_guess::from_ext("js").first_raw().unwrap();
    assert_eq!(res.headers()["content-type"], js);

    let res = get(dir.path(), "/assets/Style.css").await;
    assert_eq!(res.headers()["content-type"], "text/css");
}

#[tokio::test]
async fn small_chunks_still_yield_whole_file() {
    let dir = fixture();
    let payload = "0123456789".repeat(1000);
    std::fs::write(dir.path().join("big.txt"), &payload).unwrap();

    let svc = no_cache(
        ServeDir::new(DiskFilesystem::new(dir.path()).unwrap()).with_buf_chunk_size(7),
    );
    let req = Request::builder()
        .uri("/big.txt")
        .body(Body::empty())
        .unwrap();
    let res = svc.oneshot(req).await.unwrap();

    assert_eq!(res.headers()["content-length"], payload.len().to_string());
    assert_eq!(body_text(res).await, payload);
}

#[tokio::test]
async fn head_request() {
    let dir = fixture();

    let res = call(dir.path(), Method::HEAD, "/demos/todo.html").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/html");
    assert_eq!(res.headers()["content-length"], TODO.len().to_string());
    assert_no_cache(res.headers());

    assert!(body_bytes(res).await.is_empty());
}

#[tokio::test]
async fn not_found() {
    let dir = fixture();

    let res = get(dir.path(), "/does/not/exist.html").await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()["content-type"], "text/html; charset=utf-8");
    assert_no_cache(res.headers());

    let body = body_text(res).await;
    assert!(body.contains("Error code: 404"));
}

#[tokio::test]
async fn head_not_found() {
    let dir = fixture();

    let res = call(dir.path(), Method::HEAD, "/nope.html").await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_no_cache(res.headers());
    assert!(body_bytes(res).await.is_empty());
}

#[tokio::test]
async fn file_with_trailing_slash_is_not_found() {
    let dir = fixture();

    let res = get(dir.path(), "/demos/todo.html/").await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_no_cache(res.headers());
}

#[tokio::test]
async fn parent_dir_traversal_is_rejected() {
    let dir = fixture();

    for uri in [
        "/../../etc/passwd",
        "/demos/../../../etc/passwd",
        "/%2e%2e/%2e%2e/etc/passwd",
        "/demos/..%2f..%2f..%2fetc%2fpasswd",
        "/..%5c..%5cwindows%5cwin.ini",
    ] {
        let res = get(dir.path(), uri).await;

        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{uri}");
        assert_no_cache(res.headers());
        assert!(!body_text(res).await.contains("root:"), "{uri}");
    }
}

#[tokio::test]
async fn inner_parent_dir_is_rejected_too() {
    let dir = fixture();

    // stays inside the root, still refused rather than normalized
    let res = get(dir.path(), "/demos/../demos/index.html").await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_out_of_root_is_rejected() {
    let dir = fixture();
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();

    let res = get(dir.path(), "/escape/secret.txt").await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_no_cache(res.headers());
    assert!(!body_text(res).await.contains("secret"));
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_inside_root_is_followed() {
    let dir = fixture();
    std::os::unix::fs::symlink(
        dir.path().join("demos/todo.html"),
        dir.path().join("todo-link.html"),
    )
    .unwrap();

    let res = get(dir.path(), "/todo-link.html").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, TODO);
}

#[tokio::test]
async fn invalid_path_encoding_is_bad_request() {
    let dir = fixture();

    let res = get(dir.path(), "/%ff%fe.html").await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_no_cache(res.headers());
}

#[tokio::test]
async fn unsupported_methods() {
    let dir = fixture();

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS] {
        let res = call(dir.path(), method.clone(), "/demos/index.html").await;

        assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED, "{method}");
        assert_eq!(res.headers()[header::ALLOW], "GET, HEAD");
        assert_no_cache(res.headers());

        let body = body_text(res).await;
        assert!(body.contains("Error code: 501"));
        assert!(body.contains(method.as_str()));
    }

    // the file is untouched
    assert_eq!(
        std::fs::read_to_string(dir.path().join("demos/index.html")).unwrap(),
        INDEX
    );
}

#[tokio::test]
async fn redirect_to_dir_with_trailing_slash() {
    let dir = fixture();

    let res = get(dir.path(), "/demos").await;

    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[header::LOCATION], "/demos/");
    assert_no_cache(res.headers());
}

#[tokio::test]
async fn redirect_keeps_query_string() {
    let dir = fixture();

    let res = get(dir.path(), "/demos?theme=dark").await;

    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[header::LOCATION], "/demos/?theme=dark");
}

#[tokio::test]
async fn redirect_never_leaves_the_host() {
    let dir = fixture();

    for uri in ["//demos", "///demos", "//demos?theme=dark"] {
        let res = get(dir.path(), uri).await;

        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY, "{uri}");
        let location = res.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("/demos/"), "{uri} -> {location}");
        assert_no_cache(res.headers());
    }
}

#[tokio::test]
async fn query_string_is_ignored() {
    let dir = fixture();

    let res = get(dir.path(), "/demos/todo.html?v=2").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, TODO);
}

#[tokio::test]
async fn directory_serves_index_html() {
    let dir = fixture();

    let res = get(dir.path(), "/demos/").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/html");
    assert_eq!(body_text(res).await, INDEX);
}

#[tokio::test]
async fn directory_serves_index_htm() {
    let dir = fixture();

    let res = get(dir.path(), "/legacy/").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "old");
}

#[tokio::test]
async fn directory_without_index_is_listed() {
    let dir = fixture();

    let res = get(dir.path(), "/assets/").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/html; charset=utf-8");
    assert_no_cache(res.headers());
    let len: usize = res.headers()["content-length"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let body = body_text(res).await;
    assert_eq!(body.len(), len);
    assert!(body.contains("Directory listing for /assets/"));

    let js = body.find("<a href=\"app.js\">app.js</a>").unwrap();
    let fonts = body.find("<a href=\"fonts/\">fonts/</a>").unwrap();
    let css = body.find("<a href=\"Style.css\">Style.css</a>").unwrap();
    assert!(js < fonts && fonts < css);
}

#[tokio::test]
async fn root_without_index_is_listed() {
    let dir = fixture();

    let res = get(dir.path(), "/").await;

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_text(res).await;
    assert!(body.contains("<a href=\"demos/\">demos/</a>"));
    assert!(body.contains("<a href=\"blob\">blob</a>"));
}

#[tokio::test]
async fn head_listing_has_length_but_no_body() {
    let dir = fixture();

    let res = call(dir.path(), Method::HEAD, "/assets/").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_ne!(res.headers()["content-length"], "0");
    assert!(body_bytes(res).await.is_empty());
}

#[tokio::test]
async fn not_modified_since_last_modified() {
    let dir = fixture();

    let res = get(dir.path(), "/demos/index.html").await;
    let last_modified = res.headers()[header::LAST_MODIFIED].clone();

    let req = Request::builder()
        .uri("/demos/index.html")
        .header(header::IF_MODIFIED_SINCE, last_modified)
        .body(Body::empty())
        .unwrap();
    let res = service(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert_no_cache(res.headers());
    assert!(body_bytes(res).await.is_empty());
}

#[tokio::test]
async fn modified_since_old_date() {
    let dir = fixture();

    let req = Request::builder()
        .uri("/demos/index.html")
        .header(header::IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:37 GMT")
        .body(Body::empty())
        .unwrap();
    let res = service(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, INDEX);
}

#[tokio::test]
async fn invalid_if_modified_since_is_ignored() {
    let dir = fixture();

    let req = Request::builder()
        .uri("/demos/index.html")
        .header(header::IF_MODIFIED_SINCE, "not a date")
        .body(Body::empty())
        .unwrap();
    let res = service(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn repeated_get_is_identical() {
    let dir = fixture();

    let first = get(dir.path(), "/demos/todo.html").await;
    let second = get(dir.path(), "/demos/todo.html").await;

    assert_eq!(first.status(), second.status());
    assert_eq!(first.headers(), second.headers());
    assert_eq!(body_bytes(first).await, body_bytes(second).await);
}

#[tokio::test]
async fn edits_are_visible_on_next_request() {
    let dir = fixture();

    let res = get(dir.path(), "/demos/todo.html").await;
    assert_eq!(body_text(res).await, TODO);

    std::fs::write(dir.path().join("demos/todo.html"), "edited").unwrap();

    let res = get(dir.path(), "/demos/todo.html").await;
    assert_eq!(res.headers()["content-length"], "6");
    assert_eq!(body_text(res).await, "edited");
}
