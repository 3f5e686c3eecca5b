//! Embedded HTTP file service.
//!
//! The server runs on its own thread with a dedicated single-threaded tokio
//! runtime, so it can be started and stopped from synchronous plugin code.
//! The listener is bound synchronously before the thread spawns, which makes
//! bind failures surface immediately at start time.

pub mod routes;
pub mod templates;

pub use routes::{build_router, content_type, AppState};
pub use templates::{FileRow, TemplateEngine, Templates};

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener as TokioTcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::storage::SharedDir;

/// Errors that can occur starting the HTTP server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to build server runtime: {0}")]
    RuntimeFailed(#[source] io::Error),

    #[error("Failed to spawn server thread: {0}")]
    SpawnFailed(#[source] io::Error),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Handle to the running HTTP server.
///
/// Stopping the handle signals graceful shutdown and joins the server
/// thread; in-flight requests get up to the configured grace period to
/// finish before the server gives up on them. Dropping the handle stops
/// the server the same way.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// The address the server is bound to
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The base URL of the server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Check if the server thread is still running
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|thread| !thread.is_finished())
            .unwrap_or(false)
    }

    /// Stop the server and wait for its thread to exit.
    ///
    /// Returns within the grace period plus a small delta. Safe to call
    /// more than once.
    pub fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.shutdown_tx.send(());
            if thread.join().is_err() {
                error!("HTTP server thread panicked");
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start the HTTP file server for the given shared directory.
///
/// Binds the listener synchronously, then moves it onto a dedicated server
/// thread. Port 0 binds an ephemeral port; the actual address is available
/// on the returned handle.
pub fn start_server(config: &Config, shared: SharedDir) -> ServerResult<ServerHandle> {
    let addr = config.socket_addr();

    let listener = TcpListener::bind(addr).map_err(|e| ServerError::BindFailed {
        addr,
        source: e,
    })?;
    listener
        .set_nonblocking(true)
        .map_err(|e| ServerError::BindFailed { addr, source: e })?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| ServerError::BindFailed { addr, source: e })?;

    let state = Arc::new(AppState {
        shared,
        template_engine: TemplateEngine::default(),
        title: config.server_string.clone(),
        max_upload_bytes: config.max_upload_bytes,
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ServerError::RuntimeFailed)?;

    let (shutdown_tx, graceful_rx) = broadcast::channel::<()>(1);
    let deadline_rx = shutdown_tx.subscribe();
    let grace = Duration::from_secs(config.shutdown_grace_secs);

    let thread = std::thread::Builder::new()
        .name("cubby-http".to_string())
        .spawn(move || {
            runtime.block_on(serve(listener, state, graceful_rx, deadline_rx, grace));
        })
        .map_err(ServerError::SpawnFailed)?;

    info!(url = %format!("http://{}", local_addr), "HTTP server started");

    Ok(ServerHandle {
        addr: local_addr,
        shutdown_tx,
        thread: Some(thread),
    })
}

/// Serve requests until shutdown is signalled.
///
/// Races graceful completion against the grace deadline so a slow client
/// can't hold the plugin's unload hostage.
async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    mut graceful_rx: broadcast::Receiver<()>,
    mut deadline_rx: broadcast::Receiver<()>,
    grace: Duration,
) {
    let listener = match TokioTcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "Failed to register listener with runtime");
            return;
        }
    };

    let app = build_router(state);

    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = graceful_rx.recv().await;
                debug!("HTTP server received shutdown signal");
            })
            .await
    };

    let deadline = async move {
        let _ = deadline_rx.recv().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            match result {
                Ok(()) => debug!("HTTP server drained and stopped"),
                Err(e) => error!(error = %e, "HTTP server error"),
            }
        }
        _ = deadline => {
            warn!(
                grace_secs = grace.as_secs(),
                "Shutdown grace period expired, dropping in-flight requests"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, TcpStream};
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir, port: u16) -> Config {
        let mut config = Config::default();
        config.shared_dir = temp_dir.path().to_path_buf();
        config.bind_addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.port = port;
        config.shutdown_grace_secs = 1;
        config
    }

    #[test]
    fn test_start_and_stop() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir, 0);

        let mut handle = start_server(&config, SharedDir::new(temp_dir.path())).unwrap();
        assert!(handle.is_running());
        assert_ne!(handle.addr().port(), 0);

        // Listener is bound synchronously, so connections succeed right away
        let conn = TcpStream::connect(handle.addr());
        assert!(conn.is_ok());

        handle.stop();
        assert!(!handle.is_running());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir, 0);

        let mut handle = start_server(&config, SharedDir::new(temp_dir.path())).unwrap();
        handle.stop();
        handle.stop();
        assert!(!handle.is_running());
    }

    #[test]
    fn test_bind_conflict_fails_fast() {
        let temp_dir = TempDir::new().unwrap();

        let blocker = TcpListener::bind("127.0.0.1:0").unwrap();
        let taken_port = blocker.local_addr().unwrap().port();

        let config = test_config(&temp_dir, taken_port);
        let result = start_server(&config, SharedDir::new(temp_dir.path()));
        assert!(matches!(result, Err(ServerError::BindFailed { .. })));
    }

    #[test]
    fn test_url_format() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir, 0);

        let handle = start_server(&config, SharedDir::new(temp_dir.path())).unwrap();
        assert_eq!(handle.url(), format!("http://{}", handle.addr()));
        assert!(handle.url().starts_with("http://127.0.0.1:"));
    }

    #[test]
    fn test_drop_stops_server() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir, 0);

        let addr = {
            let handle = start_server(&config, SharedDir::new(temp_dir.path())).unwrap();
            handle.addr()
            // handle dropped here
        };

        // After drop the listener is gone; a fresh bind on the port succeeds
        let rebind = TcpListener::bind(addr);
        assert!(rebind.is_ok());
    }
}
