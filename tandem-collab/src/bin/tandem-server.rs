//! Standalone sync server.
//!
//! Usage: `tandem-server [bind_addr]` (default `127.0.0.1:9090`).

use tandem_collab::{ServerConfig, SyncServer};

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut config = ServerConfig::default();
    if let Some(addr) = std::env::args().nth(1) {
        config.bind_addr = addr;
    }

    let server = SyncServer::new(config);
    if let Err(e) = server.run().await {
        log::error!("server failed: {e}");
        std::process::exit(1);
    }
}
