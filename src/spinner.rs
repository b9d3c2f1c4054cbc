//! A terminal spinner that follows [`RunState::busy`].

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::state::RunState;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Frame interval.
const INTERVAL: Duration = Duration::from_millis(80);

/// Spins on stderr while the watched state is busy, and stays quiet
/// otherwise. Stops when [`Spinner::stop`] is called or the state goes away.
pub struct Spinner {
    handle: JoinHandle<()>,
}

impl Spinner {
    pub fn follow(mut state: watch::Receiver<RunState>, message: &str) -> Self {
        let message = message.to_string();

        let handle = tokio::spawn(async move {
            loop {
                if state.wait_for(|s| s.busy).await.is_err() {
                    break;
                }
                let mut i = 0;
                loop {
                    let busy = state.borrow().busy;
                    if !busy {
                        break;
                    }
                    let frame = FRAMES[i % FRAMES.len()];
                    eprint!("\x1b[2K\r{frame} {message}");
                    let _ = std::io::stderr().flush();

                    tokio::select! {
                        _ = tokio::time::sleep(INTERVAL) => {}
                        changed = state.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                    i += 1;
                }
                clear_line();
                if state.has_changed().is_err() {
                    break;
                }
            }
        });

        Self { handle }
    }

    /// Stop spinning and clear the line.
    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
        clear_line();
    }
}

fn clear_line() {
    eprint!("\x1b[2K\r");
    let _ = std::io::stderr().flush();
}
