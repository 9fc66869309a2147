// Connection handling module
// Accepts one TCP connection and serves HTTP/1.1 on it

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

use super::idle::IdleStream;
use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept a connection, enforcing `performance.max_connections`.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
    );
}

/// Serve a single connection in a spawned task.
///
/// There is no cap on the connection as a whole:
/// * `keep_alive_timeout` bounds the wait for each request head, including the
///   idle gap between keep-alive requests (`read_timeout` when keep-alive is off)
/// * `read_timeout` bounds silence while a request is being handled, e.g.
///   between chunks of an upload
/// * `write_timeout` bounds a stalled response write
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let performance = &state.config.performance;
        let read_timeout = Duration::from_secs(performance.read_timeout);
        let write_timeout = Duration::from_secs(performance.write_timeout);
        let keep_alive = performance.keep_alive_timeout > 0;
        let head_timeout = if keep_alive {
            Duration::from_secs(performance.keep_alive_timeout)
        } else {
            read_timeout
        };

        let busy = Arc::new(AtomicBool::new(false));
        let io = TokioIo::new(IdleStream::new(
            stream,
            Arc::clone(&busy),
            read_timeout,
            write_timeout,
        ));

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .keep_alive(keep_alive)
            .header_read_timeout(head_timeout);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                let busy = Arc::clone(&busy);
                async move {
                    busy.store(true, Ordering::Release);
                    let response = handler::handle_request(req, state, peer_addr).await;
                    busy.store(false, Ordering::Release);
                    response
                }
            }),
        );

        if let Err(err) = conn.await {
            if is_timeout(&err) {
                logger::log_debug(&format!("Connection from {peer_addr} closed: {err}"));
            } else {
                logger::log_connection_error(&err);
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Header timeout from hyper, or a stall reported by [`IdleStream`]
fn is_timeout(err: &hyper::Error) -> bool {
    if err.is_timeout() {
        return true;
    }
    std::error::Error::source(err)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
}
