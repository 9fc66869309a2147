// Server module entry point
// Accept loop, per-connection serving and shutdown

pub mod connection;
pub mod idle;
pub mod listener;
pub mod signal;

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::AppState;
use crate::logger;
use connection::accept_connection;

pub use listener::create_listener;

/// Serve until SIGTERM or Ctrl+C
pub async fn run(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    run_until(listener, state, signal::shutdown_signal()).await
}

/// Accept connections until `shutdown` resolves.
///
/// Connections already being served are not awaited; they end with the runtime.
pub async fn run_until<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => {
                logger::log_shutdown();
                return Ok(());
            }
        }
    }
}
