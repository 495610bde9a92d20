//! Local development HTTP file server with caching disabled.
//!
//! Files are served from a root directory on disk by [`ServeDir`], a tower service over a
//! [`Filesystem`](fs::Filesystem). [`no_cache`](no_cache::no_cache) wraps it so every response,
//! errors included, carries `Cache-Control: no-cache, no-store, must-revalidate`,
//! `Pragma: no-cache` and `Expires: 0`. [`Server`](server::Server) binds it on a port and
//! runs it until Ctrl+C.
//!
//! # Example
//! ```no_run
//! use nocache_serve::server::{Config, Server};
//!
//! # async {
//! let server = Server::bind(Config::from_current_dir().unwrap()).unwrap();
//! server.run().await.unwrap();
//! # };
//! ```

use std::io;

use bytes::Bytes;
use http_body::combinators::UnsyncBoxBody;
pub use serve_dir::ServeDir;

mod async_body;
pub mod fs;
mod headers;
mod listing;
pub mod logger;
pub mod no_cache;
mod open_file;
mod path;
mod serve_dir;
pub mod server;
#[cfg(test)]
mod tests;

pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;
