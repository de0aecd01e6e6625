//! Example to run the All Circles server standalone
//!
//! Run with: cargo run -p circles-server --example run_server

use circles_server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig {
        port: 8002,
        ..Default::default()
    };

    println!("Starting All Circles server on port {}", config.port);
    println!("Static files from: {}", config.static_dir);
    println!("Start a game with: curl -X POST localhost:{}/api/game/new", config.port);

    run_server(config).await
}
