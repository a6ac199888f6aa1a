//! Connection-level I/O stall limits.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{sleep, Sleep};

/// Wraps a stream so a read or write that makes no progress for its
/// timeout fails with [`io::ErrorKind::TimedOut`].
///
/// The clock starts when an operation first returns `Pending` and is
/// cleared as soon as it completes, so idle keep-alive connections are
/// closed after `read_timeout` as well.
pub(crate) struct TimeoutStream<S> {
    inner: S,
    read_timeout: Duration,
    write_timeout: Duration,
    read_deadline: Option<Pin<Box<Sleep>>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
}

impl<S> TimeoutStream<S> {
    pub(crate) fn new(inner: S, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            inner,
            read_timeout,
            write_timeout,
            read_deadline: None,
            write_deadline: None,
        }
    }
}

fn poll_deadline<T>(
    deadline: &mut Option<Pin<Box<Sleep>>>,
    timeout: Duration,
    cx: &mut Context<'_>,
    what: &'static str,
) -> Poll<io::Result<T>> {
    let timer = deadline.get_or_insert_with(|| Box::pin(sleep(timeout)));
    match timer.as_mut().poll(cx) {
        Poll::Ready(()) => {
            *deadline = None;
            Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, what)))
        }
        Poll::Pending => Poll::Pending,
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for TimeoutStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(res) => {
                this.read_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending => poll_deadline(
                &mut this.read_deadline,
                this.read_timeout,
                cx,
                "read timed out",
            ),
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TimeoutStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(res) => {
                this.write_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending => poll_deadline(
                &mut this.write_deadline,
                this.write_timeout,
                cx,
                "write timed out",
            ),
        }
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write_vectored(cx, bufs) {
            Poll::Ready(res) => {
                this.write_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending => poll_deadline(
                &mut this.write_deadline,
                this.write_timeout,
                cx,
                "write timed out",
            ),
        }
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_flush(cx) {
            Poll::Ready(res) => {
                this.write_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending => poll_deadline(
                &mut this.write_deadline,
                this.write_timeout,
                cx,
                "write timed out",
            ),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
