//! Server command - start the HTTP game server
//!
//! - run(): orchestration
//! - configure_server(): flags to `ServerConfig`
//! - validate_static_dir(): sanity check on the client directory

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use circles_core::GameConfig;
use circles_server::{run_server, ServerConfig};

// ============================================================================
// COMMAND ARGUMENTS
// ============================================================================

#[derive(Args)]
pub struct ServerArgs {
    /// Port number to listen on
    #[arg(long, default_value = "8002")]
    pub port: u16,

    /// Directory containing static files for the browser client
    #[arg(long, default_value = "client")]
    pub static_dir: PathBuf,

    /// Board radius for new games
    #[arg(long, default_value_t = circles_core::DEFAULT_RADIUS)]
    pub radius: i32,
}

// ============================================================================
// ORCHESTRATION
// ============================================================================

/// Run server command
pub fn run(args: ServerArgs, seed: Option<u64>, catalog: Option<PathBuf>) -> Result<()> {
    let config = configure_server(&args, seed, catalog)?;

    tracing::info!("Starting All Circles server on port {}", config.port);

    start_server(config)
}

/// Configure server from command arguments
fn configure_server(
    args: &ServerArgs,
    seed: Option<u64>,
    catalog: Option<PathBuf>,
) -> Result<ServerConfig> {
    validate_static_dir(&args.static_dir)?;

    let mut game = GameConfig::default().with_radius(args.radius);
    game.seed = seed;
    game.validate()?;

    Ok(ServerConfig {
        port: args.port,
        static_dir: args.static_dir.to_string_lossy().to_string(),
        game,
        catalog_path: catalog,
    })
}

/// Start the server (blocking)
fn start_server(config: ServerConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async { run_server(config).await })
}

/// Missing directory only warns; a file in its place is an error
fn validate_static_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        tracing::warn!(
            "Static directory does not exist: {}. Server will start but may not serve files.",
            path.display()
        );
    } else if !path.is_dir() {
        anyhow::bail!(
            "Static path exists but is not a directory: {}",
            path.display()
        );
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServerArgs {
        ServerArgs {
            port: 8002,
            static_dir: PathBuf::from("test_static"),
            radius: 6,
        }
    }

    #[test]
    fn test_configure_server_defaults() {
        let config = configure_server(&args(), Some(9), None).unwrap();
        assert_eq!(config.port, 8002);
        assert_eq!(config.static_dir, "test_static");
        assert_eq!(config.game.seed, Some(9));
        assert_eq!(config.game.radius, 6);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_configure_server_rejects_tiny_board() {
        let mut args = args();
        args.radius = 2;
        assert!(configure_server(&args, None, None).is_err());
    }

    #[test]
    fn test_validate_static_dir_nonexistent() {
        assert!(validate_static_dir(Path::new("/nonexistent/path")).is_ok());
    }
}
