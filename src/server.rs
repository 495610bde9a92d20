use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use hyper::server::conn::AddrIncoming;
use thiserror::Error;
use tower::make::Shared;

use crate::fs::disk::DiskFilesystem;
use crate::no_cache::{no_cache, NoCache};
use crate::ServeDir;

pub const DEFAULT_PORT: u16 = 9292;

/// Demo pages advertised in the startup banner.
const DEMO_PAGES: [(&str, &str); 3] = [
    ("Basic Demo", "demos/index.html"),
    ("Todo App", "demos/todo.html"),
    ("Counter Demo", "demos/counter.html"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub port: u16,
}

impl Config {
    /// Serve the current working directory on [`DEFAULT_PORT`].
    pub fn from_current_dir() -> io::Result<Self> {
        Ok(Self {
            root: std::env::current_dir()?,
            port: DEFAULT_PORT,
        })
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("root directory {} is not accessible: {source}", .path.display())]
    RootDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("root {} is not a directory", .path.display())]
    NotADirectory { path: PathBuf },
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: hyper::Error,
    },
}

type NoCacheServeDir = NoCache<ServeDir<DiskFilesystem>>;

/// A bound, not yet running, file server.
pub struct Server {
    root: PathBuf,
    incoming: AddrIncoming,
    local_addr: SocketAddr,
    service: NoCacheServeDir,
}

impl Server {
    /// Checks the root directory and binds the listener on all interfaces.
    pub fn bind(config: Config) -> Result<Self, StartupError> {
        let filesystem =
            DiskFilesystem::new(&config.root).map_err(|source| StartupError::RootDirectory {
                path: config.root.clone(),
                source,
            })?;
        let root = filesystem.base().to_path_buf();

        // read_dir also catches a root we can stat but not list
        match std::fs::read_dir(&root) {
            Ok(_) => {}
            Err(err) if root.is_file() => {
                tracing::debug!(%err, "root is a file");
                return Err(StartupError::NotADirectory { path: root });
            }
            Err(source) => return Err(StartupError::RootDirectory { path: root, source }),
        }

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
        let incoming =
            AddrIncoming::bind(&addr).map_err(|source| StartupError::Bind { addr, source })?;
        let local_addr = incoming.local_addr();

        tracing::info!(%local_addr, root = %root.display(), "listening");

        Ok(Self {
            root,
            incoming,
            local_addr,
            service: no_cache(ServeDir::new(filesystem)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The human readable startup banner: URL, root, and the demo pages.
    pub fn banner(&self) -> String {
        let base = format!("http://localhost:{}", self.local_addr.port());

        let mut banner = format!(
            "🚀 Demo server running at {base}\n📁 Serving from: {}\n\n📋 Available demos:\n",
            self.root.display()
        );
        for (title, path) in DEMO_PAGES {
            let label = format!("{title}:");
            banner.push_str(&format!("   • {label:<15}{base}/{path}\n"));
        }
        banner.push_str("\n🔄 Press Ctrl+C to stop");

        banner
    }

    /// Serves until `signal` completes, then stops accepting connections and waits for
    /// in-flight requests to finish.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> hyper::Result<()>
    where
        F: Future<Output = ()>,
    {
        hyper::Server::builder(self.incoming)
            .serve(Shared::new(self.service))
            .with_graceful_shutdown(signal)
            .await
    }

    /// Prints the banner and serves until Ctrl+C.
    pub async fn run(self) -> hyper::Result<()> {
        println!("{}", self.banner());

        self.serve_with_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "failed to listen for ctrl-c, shutting down");
            }
        })
        .await?;

        println!("\n👋 Server stopped");
        Ok(())
    }
}
