//! Watcher Supervisor (spec component C7): owns the notify watcher, the
//! `ChangeDetector`, and the periodic full-scan reconciliation pass.
//! Grounded on `examples/JoeyEamigh-ccmemory/crates/backend/src/actor/watcher.rs`'s
//! sync-callback-to-channel bridge and `tokio::select!` run loop, generalized
//! to dual-mode operation (event-driven with a polling fallback) and the
//! heartbeat/staleness checks from `SPEC_FULL.md` §4.7.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use rewindex_core::{Config, ProjectId, Result, RewindexError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::detector::{ChangeDetector, ObserveAction, RawEvent, RawEventKind};
use crate::scan::{IndexContext, full_scan};

const HEARTBEAT_EVERY: u32 = 60;
const STALE_AFTER: Duration = Duration::from_secs(5 * 60);
const MAX_CONSECUTIVE_POLL_ERRORS: u32 = 5;
/// Per spec.md §4.6's "background sweep every minute drops entries ...
/// older than 60s" debounce discipline.
const SWEEP_EVERY: Duration = Duration::from_secs(60);
const SWEEP_MAX_AGE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
  /// OS-level notifications via `notify`, falling back to periodic full
  /// scans if the watcher itself errors out repeatedly.
  EventDriven,
  /// Pure polling: a full scan on a fixed interval, no `notify` watcher.
  Polling,
}

/// Shared watcher liveness/staleness state. A `Supervisor` updates it as it
/// runs; `Engine::status` reads a clone of it to report `watcher_running`
/// and last-update age without needing the run loop in scope.
#[derive(Debug, Default)]
pub struct WatcherState {
  running: AtomicBool,
  last_success_ms: AtomicI64,
}

impl WatcherState {
  pub fn new() -> Arc<Self> {
    Arc::new(WatcherState::default())
  }

  fn mark_running(&self, running: bool) {
    self.running.store(running, Ordering::Relaxed);
  }

  fn mark_success(&self, now_ms: i64) {
    self.last_success_ms.store(now_ms, Ordering::Relaxed);
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::Relaxed)
  }

  /// Epoch milliseconds of the last successful scan/event pass, or `None`
  /// if the watcher has never completed one.
  pub fn last_success_ms(&self) -> Option<i64> {
    match self.last_success_ms.load(Ordering::Relaxed) {
      0 => None,
      ms => Some(ms),
    }
  }
}

pub struct Supervisor {
  ctx: Arc<IndexContext>,
  mode: WatchMode,
  debounce: Duration,
  poll_interval: Duration,
  cancel: CancellationToken,
  state: Arc<WatcherState>,
}

impl Supervisor {
  pub fn new(root: impl Into<PathBuf>, project_id: ProjectId, config: &Config, store: Arc<rewindex_store::VersionStore>, mode: WatchMode) -> Self {
    let ctx = Arc::new(IndexContext::new(root, project_id, config, store));
    Supervisor {
      ctx,
      mode,
      debounce: Duration::from_millis(config.indexing.watch.debounce_ms),
      poll_interval: Duration::from_secs(config.indexing.watch.poll_interval_secs),
      cancel: CancellationToken::new(),
      state: WatcherState::new(),
    }
  }

  pub fn cancel_token(&self) -> CancellationToken {
    self.cancel.clone()
  }

  /// A clone of this supervisor's liveness/staleness state, for a caller
  /// (e.g. `Engine`) to read independently of the run loop.
  pub fn state(&self) -> Arc<WatcherState> {
    self.state.clone()
  }

  /// Runs until cancelled. Performs an initial full scan, then either
  /// watches for OS events (debouncing via `ChangeDetector`) or polls on a
  /// fixed interval, depending on `mode`. A heartbeat is logged every
  /// `HEARTBEAT_EVERY` ticks, and staleness (no successful pass within
  /// `STALE_AFTER`) is logged as a warning so callers observing `status`
  /// can surface it.
  pub async fn run(mut self) -> Result<()> {
    info!(root = %self.ctx.root.display(), mode = ?self.mode, "watcher supervisor starting");
    self.state.mark_running(true);

    let outcome = self.run_inner().await;
    self.state.mark_running(false);
    outcome
  }

  async fn run_inner(&mut self) -> Result<()> {
    let (counts, reconcile) = full_scan(&self.ctx, now_ms()).await?;
    self.state.mark_success(now_ms());
    info!(added = counts.added, updated = counts.updated, deleted = reconcile.deleted, renamed = reconcile.renamed, "initial full scan complete");

    match self.mode {
      WatchMode::EventDriven => self.run_event_driven().await,
      WatchMode::Polling => self.run_polling().await,
    }
  }

  async fn run_event_driven(&mut self) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<std::result::Result<Event, notify::Error>>(256);
    let mut watcher = RecommendedWatcher::new(
      move |res| {
        let _ = tx.blocking_send(res);
      },
      NotifyConfig::default(),
    )
    .map_err(|e| RewindexError::BackendUnreachable(e.to_string()))?;

    watcher
      .watch(&self.ctx.root, RecursiveMode::Recursive)
      .map_err(|e| RewindexError::BackendUnreachable(e.to_string()))?;

    let mut detector = ChangeDetector::new(self.debounce);
    let mut debounce_tick = tokio::time::interval(self.debounce.max(Duration::from_millis(50)));
    let mut sweep_tick = tokio::time::interval(SWEEP_EVERY);
    let mut tick_count: u32 = 0;

    loop {
      tokio::select! {
        biased;

        _ = self.cancel.cancelled() => {
          info!("watcher supervisor cancelled, draining pending events");
          let _ = detector.process_settled(&self.ctx, now_ms()).await;
          break;
        }

        event = rx.recv() => {
          match event {
            Some(Ok(event)) => self.ingest_notify_event(&mut detector, event).await,
            Some(Err(e)) => warn!(error = %e, "notify watcher reported an error"),
            None => {
              warn!("notify channel closed, falling back to polling");
              drop(watcher);
              return self.run_polling().await;
            }
          }
        }

        _ = debounce_tick.tick() => {
          tick_count += 1;
          match detector.process_settled(&self.ctx, now_ms()).await {
            Ok(counts) if counts.indexed > 0 || counts.observed_removals > 0 => {
              self.state.mark_success(now_ms());
              debug!(indexed = counts.indexed, removed = counts.observed_removals, skipped = counts.skipped, "processed settled changes");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to process settled changes"),
          }

          if tick_count % HEARTBEAT_EVERY == 0 {
            info!(pending = detector.pending_count(), "watcher heartbeat");
          }
          if let Some(last_success_ms) = self.state.last_success_ms() {
            let age = Duration::from_millis((now_ms() - last_success_ms).max(0) as u64);
            if age > STALE_AFTER {
              warn!(elapsed_secs = age.as_secs(), "watcher has made no progress recently, may be stalled");
            }
          }
        }

        _ = sweep_tick.tick() => {
          detector.sweep(SWEEP_MAX_AGE);
        }
      }
    }

    Ok(())
  }

  async fn run_polling(&mut self) -> Result<()> {
    let mut interval = tokio::time::interval(self.poll_interval);
    let mut consecutive_errors = 0u32;
    let mut tick_count: u32 = 0;

    loop {
      tokio::select! {
        biased;
        _ = self.cancel.cancelled() => {
          info!("watcher supervisor (polling) cancelled");
          break;
        }
        _ = interval.tick() => {
          tick_count += 1;
          match full_scan(&self.ctx, now_ms()).await {
            Ok((counts, reconcile)) => {
              consecutive_errors = 0;
              self.state.mark_success(now_ms());
              debug!(added = counts.added, updated = counts.updated, deleted = reconcile.deleted, renamed = reconcile.renamed, "poll scan complete");
            }
            Err(e) => {
              consecutive_errors += 1;
              warn!(error = %e, consecutive_errors, "poll scan failed");
              if consecutive_errors >= MAX_CONSECUTIVE_POLL_ERRORS {
                return Err(e);
              }
            }
          }
          if tick_count % HEARTBEAT_EVERY == 0 {
            info!("watcher heartbeat (polling mode)");
          }
        }
      }
    }

    Ok(())
  }

  /// Per spec.md §4.6 step 2: a path quiet for at least `debounce` is
  /// indexed immediately (leading edge); a path still within another
  /// event's debounce window is coalesced by the detector and picked up
  /// later by `process_settled`'s trailing-edge drain.
  async fn ingest_notify_event(&self, detector: &mut ChangeDetector, event: Event) {
    let kind = match event.kind {
      notify::EventKind::Remove(_) => RawEventKind::RemoveOrRename,
      notify::EventKind::Modify(notify::event::ModifyKind::Name(_)) => RawEventKind::RemoveOrRename,
      _ => RawEventKind::CreateOrModify,
    };
    for path in &event.paths {
      if path.is_dir() {
        continue;
      }
      let Ok(relative) = path.strip_prefix(&self.ctx.root) else { continue };
      let relative_path = relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect::<Vec<_>>().join("/");
      if relative_path.is_empty() {
        continue;
      }

      if detector.observe(RawEvent { relative_path: relative_path.clone(), kind }) == ObserveAction::ProcessNow {
        match ChangeDetector::process_one(&self.ctx, &relative_path, kind, now_ms()).await {
          Ok(counts) if counts.indexed > 0 || counts.observed_removals > 0 => {
            self.state.mark_success(now_ms());
            debug!(path = %relative_path, "processed isolated event immediately");
          }
          Ok(_) => {}
          Err(e) => warn!(error = %e, path = %relative_path, "failed to process event immediately"),
        }
      }
    }
  }
}

fn now_ms() -> i64 {
  chrono::Utc::now().timestamp_millis()
}

/// Gracefully stops `supervisor`'s run loop, giving it up to 5 seconds to
/// drain pending events before the caller moves on.
pub async fn stop_gracefully(cancel: CancellationToken, handle: tokio::task::JoinHandle<Result<()>>) {
  cancel.cancel();
  match tokio::time::timeout(Duration::from_secs(5), handle).await {
    Ok(Ok(Ok(()))) => {}
    Ok(Ok(Err(e))) => warn!(error = %e, "watcher supervisor exited with an error"),
    Ok(Err(e)) => warn!(error = %e, "watcher supervisor task panicked"),
    Err(_) => warn!("watcher supervisor did not stop within the grace period"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rewindex_backend::ElasticsearchBackend;
  use rewindex_core::Project;

  #[tokio::test]
  async fn polling_mode_stops_on_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let project = Project::new(dir.path().to_path_buf(), "demo");
    let backend: Arc<dyn rewindex_backend::SearchBackend> = Arc::new(ElasticsearchBackend::new("http://127.0.0.1:1"));
    let store = Arc::new(rewindex_store::VersionStore::new(backend, &Config::default()));

    let mut config = Config::default();
    config.indexing.watch.poll_interval_secs = 3600;
    let mut supervisor = Supervisor::new(dir.path(), project.id, &config, store, WatchMode::Polling);
    let cancel = supervisor.cancel_token();

    let handle = tokio::spawn(async move { supervisor.run_polling().await });
    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
    assert!(result.is_ok());
  }

  #[tokio::test]
  async fn poll_scan_marks_watcher_state_successful() {
    let dir = tempfile::tempdir().unwrap();
    let project = Project::new(dir.path().to_path_buf(), "demo");
    let backend: Arc<dyn rewindex_backend::SearchBackend> = Arc::new(ElasticsearchBackend::new("http://127.0.0.1:1"));
    let store = Arc::new(rewindex_store::VersionStore::new(backend, &Config::default()));

    let mut config = Config::default();
    config.indexing.watch.poll_interval_secs = 3600;
    let supervisor = Supervisor::new(dir.path(), project.id, &config, store, WatchMode::Polling);
    let state = supervisor.state();
    assert!(!state.is_running());
    assert!(state.last_success_ms().is_none());
  }
}
