//! Query Engine (spec component C8): routes searches between the current-
//! files and versions indices, reconstructs line-anchored match context,
//! and aggregates a version timeline.

mod line_context;
mod search;
mod timeline;
mod types;

pub use line_context::{LineContext, compute_line_context};
pub use search::search;
pub use timeline::{bucket_span_ms, timeline};
pub use types::{MatchContext, MatchSpan, ResultMetadata, SearchFilters, SearchHitResult, SearchOptions, SearchOutcome, TimelineBucket, TimelineOutcome};
