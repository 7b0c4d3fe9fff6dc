//! Kalends: Calendar Event Recovery Engine
//!
//! Turns unreliable natural-language text, plus an optional remote parse,
//! into a trustworthy calendar-event draft: every output carries a
//! calibrated confidence signal, every failure mode has a deterministic
//! recovery path, and no raw fault ever reaches the caller.

pub mod assess;
pub mod config;
pub mod error;
pub mod event;
pub mod fallback;
pub mod metrics;
pub mod pipeline;
pub mod preprocess;
pub mod recovery;
pub mod remote;
pub mod store;
pub mod validate;

pub use assess::{
    ConfidenceAssessment, ConfidenceValidator, FieldAssessment, ImprovementSuggestion,
    Recommendation, SuggestionKind, Warning, WarningSeverity,
};
pub use config::{
    CacheConfig, ConfidenceConfig, ConfigManager, EventConfig, FeatureToggles, NetworkConfig,
    RecoveryConfig, RetryConfig, StorageConfig,
};
pub use error::{ConfigError, KalendsError, Result, StoreError};
pub use event::{EventDraft, EventField, FieldSignal, FieldSource};
pub use fallback::{FallbackEvent, FallbackGenerator, SchedulePlan, TitleExtraction};
pub use metrics::{get_metrics, Metrics, MetricsSnapshot};
pub use pipeline::{
    CancelFlag, EventPipeline, EventRequest, PipelineOutcome, ProcessedEvent, MAX_INPUT_CHARS,
};
pub use preprocess::preprocess;
pub use recovery::{
    classify, select_strategy, FailureContext, FailureKind, RecoveryOrchestrator, RecoveryOutcome,
    RecoveryStrategy, UserAction,
};
pub use remote::{ParserError, RemoteFieldSignal, RemoteParse, RemoteParser, UnavailableParser};
pub use store::{
    AnonymizedOutcomeRecord, CachedRequest, FailurePatternStore, FileKvStore, KvStore,
    MemoryKvStore, OutcomeLog, OutcomeStats, RequestCache, VersionedValue,
};
pub use validate::{parse_timestamp, DataSanitizer, IssueSeverity, ValidationIssue, ValidationOutcome};
