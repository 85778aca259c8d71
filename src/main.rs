//! Perch
//!
//! A small floating X11 window manager written in Rust: windows open under
//! the pointer, move and resize with modifier drags or key bindings, and get
//! colored borders that show which one is active.

mod config;
mod shared;
mod wm;
mod x11_async;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::protocol::Event;

use crate::config::Config;
use crate::wm::WindowManager;
use crate::wm::display::X11Session;
use crate::wm::session::{DisplaySession, SessionError};
use crate::x11_async::X11EventStream;

/// Main application state
struct Perch {
    wm: WindowManager<X11Session>,

    /// X11 async event stream (non-blocking polling)
    x11_stream: X11EventStream,
}

impl Perch {
    fn new(config: &Config) -> Result<Self> {
        let session = X11Session::connect()?;
        let mut wm = WindowManager::new(session, config);
        let x11_stream = X11EventStream::new(wm.session().connection())?;

        let keymap = wm.keymap().clone();
        let drag_modifier = wm.drag_modifier();
        wm.session_mut()
            .grab_input(&keymap, drag_modifier)
            .context("Failed to grab key bindings")?;
        wm.startup()?;

        Ok(Self { wm, x11_stream })
    }

    async fn run(&mut self, shutdown: &mut mpsc::Receiver<()>) -> Result<()> {
        info!("Starting main event loop");

        while self.wm.is_running() {
            // Events may already sit in the connection's buffer without the
            // socket being readable again
            while let Some(event) = self.x11_stream.poll_next_event().context("X11 connection lost")? {
                self.dispatch(event)?;
                if !self.wm.is_running() {
                    break;
                }
            }
            self.wm.session_mut().flush()?;

            if !self.wm.is_running() {
                break;
            }

            tokio::select! {
                () = self.x11_stream.wait_readable() => {}
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, cleaning up...");
                    break;
                }
            }
        }

        self.wm.shutdown()
    }

    fn dispatch(&mut self, event: Event) -> Result<()> {
        let Some(event) = self.wm.session_mut().translate_event(event) else {
            return Ok(());
        };
        let kind = event.kind();
        let window = event.window();

        if let Err(e) = self.wm.handle_event(event) {
            if e.downcast_ref::<SessionError>().is_some_and(SessionError::is_fatal) {
                return Err(e.context(format!("Fatal error while handling {kind}")));
            }
            match window {
                Some(window) => warn!("Failed to handle {} for {:#x}: {:#}", kind, window, e),
                None => warn!("Failed to handle {}: {:#}", kind, e),
            }
        }
        Ok(())
    }
}

fn config_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

fn load_config() -> Config {
    let loaded = match config_arg() {
        Some(path) => Config::load_from(&path),
        None => Config::load(),
    };
    loaded.unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {:#}", e);
        Config::default()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "perch=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Perch window manager");

    let config = load_config();
    debug!("Border width {}, {} key bindings", config.appearance.border_width, config.keybindings.len());

    // Setup signal handlers for graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            }
            let _ = shutdown_tx.send(()).await;
        });
    }

    let mut app = match Perch::new(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start: {:#}", e);
            return Err(e);
        }
    };

    if let Err(e) = app.run(&mut shutdown_rx).await {
        error!("Window manager error: {:#}", e);
        return Err(e);
    }

    info!("Goodbye");
    Ok(())
}
