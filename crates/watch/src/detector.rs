//! Change Detector (spec component C6): a per-path leading-edge throttle.
//! Grounded on `original_source/rewindex/indexing.py`'s `_should_process`/
//! `ProjectFileHandler` (process the first event in a quiet period
//! immediately; absorb anything that arrives within `debounce_ms` of the
//! prior event into a pending set, drained once the burst settles). Delete
//! and rename events are recorded but never applied here; they only take
//! effect at the next full-scan reconciliation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rewindex_core::Result;

use crate::scan::{IndexContext, IndexFileOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
  CreateOrModify,
  RemoveOrRename,
}

#[derive(Debug, Clone)]
pub struct RawEvent {
  pub relative_path: String,
  pub kind: RawEventKind,
}

/// What `observe` asks the caller to do with the event it just recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveAction {
  /// The path was quiet for at least `debounce`; act on it now.
  ProcessNow,
  /// A burst is in progress; the event was queued and will surface from
  /// `drain_settled` once the burst quiets down.
  Pending,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DetectorCounts {
  pub indexed: usize,
  pub observed_removals: usize,
  pub skipped: usize,
}

impl DetectorCounts {
  fn add(&mut self, other: DetectorCounts) {
    self.indexed += other.indexed;
    self.observed_removals += other.observed_removals;
    self.skipped += other.skipped;
  }
}

/// Leading-edge throttle per path: an isolated event fires immediately;
/// a burst within `debounce` of the previous event is coalesced and only
/// the latest one is acted on, once the burst settles.
pub struct ChangeDetector {
  debounce: Duration,
  last_event_time: HashMap<String, Instant>,
  pending: HashMap<String, RawEventKind>,
}

impl ChangeDetector {
  pub fn new(debounce: Duration) -> Self {
    ChangeDetector { debounce, last_event_time: HashMap::new(), pending: HashMap::new() }
  }

  /// Records `last_event_time[path] = now`. If the path fired within the
  /// last `debounce`, the event is absorbed into `pending` and the caller
  /// should do nothing; otherwise the caller should act on it immediately.
  pub fn observe(&mut self, event: RawEvent) -> ObserveAction {
    let now = Instant::now();
    let prior = self.last_event_time.insert(event.relative_path.clone(), now);
    if let Some(prior) = prior {
      if now.duration_since(prior) < self.debounce {
        self.pending.insert(event.relative_path, event.kind);
        return ObserveAction::Pending;
      }
    }
    ObserveAction::ProcessNow
  }

  /// Returns pending paths whose burst has quieted down — no further event
  /// within `debounce` of the one that queued them — removing them from
  /// the pending set.
  pub fn drain_settled(&mut self) -> Vec<(String, RawEventKind)> {
    let now = Instant::now();
    let debounce = self.debounce;
    let last_event_time = &self.last_event_time;
    let settled: Vec<String> = self
      .pending
      .keys()
      .filter(|path| last_event_time.get(path.as_str()).is_none_or(|seen| now.duration_since(*seen) >= debounce))
      .cloned()
      .collect();

    settled
      .into_iter()
      .filter_map(|path| self.pending.remove(&path).map(|kind| (path, kind)))
      .collect()
  }

  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }

  /// Drops `last_event_time`/`pending` entries untouched for `max_age`, per
  /// spec.md §4.6's "background sweep every minute" discipline, so a long
  /// idle watch doesn't grow these maps unboundedly.
  pub fn sweep(&mut self, max_age: Duration) {
    let now = Instant::now();
    self.last_event_time.retain(|_, seen| now.duration_since(*seen) < max_age);
    let last_event_time = &self.last_event_time;
    self.pending.retain(|path, _| last_event_time.contains_key(path));
  }

  /// Indexes (or records) a single path right away — used both for an
  /// isolated event's immediate leading edge and for a settled burst's
  /// trailing edge.
  pub async fn process_one(ctx: &IndexContext, relative_path: &str, kind: RawEventKind, now_ms: i64) -> Result<DetectorCounts> {
    let mut counts = DetectorCounts::default();
    match kind {
      RawEventKind::RemoveOrRename => {
        counts.observed_removals += 1;
      }
      RawEventKind::CreateOrModify => {
        let size = std::fs::metadata(ctx.root.join(relative_path)).ok().map(|m| m.len());
        if !ctx.matcher.is_eligible(relative_path, size) {
          counts.skipped += 1;
        } else {
          match ctx.index_one(relative_path, now_ms).await? {
            Some((IndexFileOutcome::Skipped, _)) | None => counts.skipped += 1,
            Some(_) => counts.indexed += 1,
          }
        }
      }
    }
    Ok(counts)
  }

  /// Processes every path whose burst has settled against `ctx`.
  pub async fn process_settled(&mut self, ctx: &IndexContext, now_ms: i64) -> Result<DetectorCounts> {
    let mut counts = DetectorCounts::default();
    for (relative_path, kind) in self.drain_settled() {
      counts.add(Self::process_one(ctx, &relative_path, kind, now_ms).await?);
    }
    Ok(counts)
  }
}
