// Idle timeout stream module
// Closes a connection when reads or writes stop making progress

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Sleep;

/// Stream wrapper with per-operation idle deadlines.
///
/// A deadline only runs while an operation is pending and is cleared by any
/// progress, so a slow but steady transfer is never cut off. Reads are only
/// timed while `busy` is set, i.e. while a request is being handled; the wait
/// for the next request head is left to the HTTP layer.
pub struct IdleStream<S> {
    inner: S,
    busy: Arc<AtomicBool>,
    read_timeout: Duration,
    write_timeout: Duration,
    read_deadline: Option<Pin<Box<Sleep>>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
}

impl<S> IdleStream<S> {
    pub fn new(inner: S, busy: Arc<AtomicBool>, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            inner,
            busy,
            read_timeout,
            write_timeout,
            read_deadline: None,
            write_deadline: None,
        }
    }
}

/// Poll the deadline in `slot`, arming it first if needed
fn stalled(
    slot: &mut Option<Pin<Box<Sleep>>>,
    timeout: Duration,
    what: &str,
    cx: &mut Context<'_>,
) -> Poll<io::Error> {
    let deadline = slot.get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
    match deadline.as_mut().poll(cx) {
        Poll::Ready(()) => {
            *slot = None;
            Poll::Ready(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{what} made no progress for {}s", timeout.as_secs()),
            ))
        }
        Poll::Pending => Poll::Pending,
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for IdleStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.read_deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending if this.busy.load(Ordering::Acquire) => {
                stalled(&mut this.read_deadline, this.read_timeout, "read", cx).map(Err)
            }
            Poll::Pending => {
                this.read_deadline = None;
                Poll::Pending
            }
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for IdleStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => {
                this.write_deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => stalled(&mut this.write_deadline, this.write_timeout, "write", cx).map(Err),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_flush(cx) {
            Poll::Ready(result) => {
                this.write_deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => stalled(&mut this.write_deadline, this.write_timeout, "flush", cx).map(Err),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
