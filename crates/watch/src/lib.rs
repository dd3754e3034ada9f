//! Change Detector and Watcher Supervisor (spec components C6/C7): watches
//! a project tree for filesystem changes, keeps the Version Store (C5) in
//! sync, and periodically reconciles deletes/renames via full scans.

mod detector;
mod git;
mod scan;
mod supervisor;

pub use detector::{ChangeDetector, DetectorCounts, ObserveAction, RawEvent, RawEventKind};
pub use scan::{IndexContext, IndexFileOutcome, ScanCounts, full_scan};
pub use supervisor::{Supervisor, WatchMode, WatcherState, stop_gracefully};
