//! Persistence for recovery state.
//!
//! Everything is built on the versioned [`KvStore`] trait: concurrent
//! writers go through compare-and-swap, so two tasks appending to the
//! same collection can never silently drop each other's entries. The
//! [`modify`] helper wraps the read-modify-write retry loop.
//!
//! Three collections live on top of the store:
//! - [`RequestCache`]: failed requests kept for replay, FIFO-bounded
//! - [`OutcomeLog`]: anonymized recovery outcomes, compacted
//! - [`FailurePatternStore`]: fingerprint counters, no content

mod file;
mod kv;
mod outcomes;
mod patterns;
mod requests;

pub use file::FileKvStore;
pub use kv::{modify, KvStore, MemoryKvStore, StoreResult, VersionedValue};
pub use outcomes::{AnonymizedOutcomeRecord, OutcomeLog, OutcomeStats};
pub use patterns::{FailurePatternStore, PatternKey};
pub use requests::{CachedRequest, RequestCache};
