//! X11 Async Event Stream
//!
//! Wakes the tokio event loop when the X11 socket becomes readable. A blocking
//! task polls the connection's file descriptor with mio and signals a
//! [`Notify`]; the loop then drains every queued event without blocking.

use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Notify, oneshot};
use tracing::{info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

const SOCKET_TOKEN: mio::Token = mio::Token(0);

/// How often the polling task checks whether the stream was dropped
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct X11EventStream {
    conn: Arc<RustConnection>,
    notify: Arc<Notify>,
    /// Dropping this stops the polling task
    _task_guard: oneshot::Receiver<()>,
}

impl X11EventStream {
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let notify = Arc::new(Notify::new());
        let task_notify = notify.clone();

        let (guard, task_guard) = oneshot::channel::<()>();
        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let mut events = mio::Events::with_capacity(1);

        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), SOCKET_TOKEN, mio::Interest::READABLE)
            .context("Failed to register X11 socket with mio")?;

        tokio::task::spawn_blocking(move || {
            while !guard.is_closed() {
                if let Err(err) = poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                    warn!("X11 socket poll failed: {:?}", err);
                    continue;
                }
                if events.iter().any(|event| event.token() == SOCKET_TOKEN) {
                    task_notify.notify_one();
                }
            }
            info!("X11 socket polling task stopped");
        });

        Ok(Self {
            conn,
            notify,
            _task_guard: task_guard,
        })
    }

    /// Next already-received event, or `None` once the buffer is drained
    pub fn poll_next_event(&self) -> Result<Option<Event>> {
        Ok(self.conn.poll_for_event()?)
    }

    /// Resolve once the socket has data to read
    pub async fn wait_readable(&self) {
        self.notify.notified().await;
    }
}
