use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub const DEFAULT_TRIGGER_PATH: &str = "/tmp/launcher_trigger";
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Consumes the marker file. Returns true when a toggle was requested.
pub fn take_trigger(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => false,
        Err(error) => {
            tracing::warn!("cannot consume trigger {}: {error}", path.display());
            false
        }
    }
}

/// Polls `path` and sends `event` each time the marker appears.
///
/// Stops when the receiving side is gone.
pub fn spawn_watcher<E>(
    path: PathBuf,
    interval: Duration,
    events: Sender<E>,
    event: E,
) -> JoinHandle<()>
where
    E: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!("watching trigger file {}", path.display());
        loop {
            ticker.tick().await;
            if take_trigger(&path) && events.send(event.clone()).await.is_err() {
                break;
            }
            if events.is_closed() {
                break;
            }
        }
    })
}
