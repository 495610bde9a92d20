use anyhow::Context;
use nocache_serve::logger::init_logger;
use nocache_serve::server::{Config, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let config = Config::from_current_dir().context("failed to read the working directory")?;
    let server = Server::bind(config).context("failed to start the server")?;

    server.run().await.context("server error")?;

    Ok(())
}
