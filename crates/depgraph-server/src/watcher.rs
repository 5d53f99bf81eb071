//! Summary directory watcher.
//!
//! Any change to a cached summary schedules a rebuild; a burst of changes
//! is collapsed into one rebuild once the directory has been quiet for the
//! debounce period. Rebuilds always reload the whole cache.

use crate::handle::ServerHandle;
use depgraph_core::SummaryCache;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Collapses bursts of events into one trigger.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_event: None,
        }
    }

    /// Records an event at `now`, restarting the quiet period.
    pub fn touch(&mut self, now: Instant) {
        self.last_event = Some(now);
    }

    /// True once the quiet period has passed since the last event.
    /// Firing clears the pending state.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.last_event {
            Some(last) if now.duration_since(last) >= self.quiet => {
                self.last_event = None;
                true
            }
            _ => false,
        }
    }
}

/// Watches the summary cache and rebuilds on change.
pub struct SummaryWatcher {
    cache: SummaryCache,
    debounce: Duration,
    handle: ServerHandle,
}

impl SummaryWatcher {
    pub fn new(cache: SummaryCache, debounce: Duration, handle: ServerHandle) -> Self {
        Self {
            cache,
            debounce,
            handle,
        }
    }

    /// Runs until the underlying watcher stops.
    pub async fn run(self) -> notify::Result<()> {
        let root = self.cache.root().to_path_buf();
        std::fs::create_dir_all(&root).map_err(notify::Error::io)?;

        let (notify_tx, mut notify_rx) = mpsc::channel::<notify::Result<Event>>(256);
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = notify_tx.blocking_send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::NonRecursive)?;
        info!("Watching summaries in {}", root.display());

        let mut debouncer = Debouncer::new(self.debounce);

        loop {
            if debouncer.fire(Instant::now()) {
                info!("Summaries changed, rebuilding");
                match self.handle.rebuild_from_cache(self.cache.clone()).await {
                    Ok(stats) => debug!(
                        "Rebuilt from {} files ({} rejected)",
                        stats.files, stats.rejected_files
                    ),
                    Err(e) => error!("Rebuild failed: {}", e),
                }
            }

            match tokio::time::timeout(Duration::from_millis(50), notify_rx.recv()).await {
                Ok(Some(Ok(event))) => {
                    if event.paths.iter().any(|p| is_summary_path(p)) {
                        debouncer.touch(Instant::now());
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!("Watch error: {}", e);
                }
                Ok(None) => break,
                Err(_) => {}
            }
        }

        Ok(())
    }
}

/// Summary documents end in `.json`; in-flight temp files do not.
fn is_summary_path(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_summary_path() {
        assert!(is_summary_path(Path::new("cache/ab12.json")));
        assert!(!is_summary_path(Path::new("cache/ab12.json.tmp")));
        assert!(!is_summary_path(Path::new("cache/README")));
    }

    #[test]
    fn test_debouncer_collapses_bursts() {
        let start = Instant::now();
        let quiet = Duration::from_millis(150);
        let mut d = Debouncer::new(quiet);

        assert!(!d.fire(start));
        d.touch(start);
        d.touch(start + Duration::from_millis(100));
        assert!(!d.fire(start + Duration::from_millis(200)));
        assert!(d.fire(start + Duration::from_millis(250)));
        // only once per burst
        assert!(!d.fire(start + Duration::from_millis(400)));
    }
}
