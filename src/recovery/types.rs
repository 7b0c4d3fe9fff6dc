//! Failure taxonomy, recovery strategies, and the context/outcome records
//! exchanged with the orchestrator.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::EventDraft;
use crate::remote::ParserError;

// ============================================================================
// Failure Kinds
// ============================================================================

/// The closed set of failure kinds the classifier can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connectivity loss or unreachable remote service.
    Network,
    /// A single attempt exceeded its deadline.
    Timeout,
    /// The remote service returned an unusable parse.
    ParsingFailure,
    /// A parse arrived but scored below the confidence threshold.
    LowConfidence,
    /// The produced event failed validation.
    ValidationError,
    /// Handing the event to the calendar application failed.
    CalendarLaunchFailure,
    /// The text carries too little signal to build an event from.
    InsufficientData,
    /// The remote service asked us to back off.
    RateLimit,
    /// The remote service failed internally.
    ServerError,
    /// Anything that resisted classification.
    Unknown,
}

impl FailureKind {
    /// Get a human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            FailureKind::Network => "Network Error",
            FailureKind::Timeout => "Timeout",
            FailureKind::ParsingFailure => "Parsing Failure",
            FailureKind::LowConfidence => "Low Confidence",
            FailureKind::ValidationError => "Validation Error",
            FailureKind::CalendarLaunchFailure => "Calendar Launch Failure",
            FailureKind::InsufficientData => "Insufficient Data",
            FailureKind::RateLimit => "Rate Limited",
            FailureKind::ServerError => "Server Error",
            FailureKind::Unknown => "Unknown Error",
        }
    }

    /// Stable lowercase identifier used in persisted keys.
    pub fn slug(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::Timeout => "timeout",
            FailureKind::ParsingFailure => "parsing-failure",
            FailureKind::LowConfidence => "low-confidence",
            FailureKind::ValidationError => "validation-error",
            FailureKind::CalendarLaunchFailure => "calendar-launch-failure",
            FailureKind::InsufficientData => "insufficient-data",
            FailureKind::RateLimit => "rate-limit",
            FailureKind::ServerError => "server-error",
            FailureKind::Unknown => "unknown",
        }
    }

    /// Transient kinds are retried up to the configured budget before
    /// escalating; permanent kinds escalate immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::Network
                | FailureKind::Timeout
                | FailureKind::ServerError
                | FailureKind::RateLimit
        )
    }
}

// ============================================================================
// Recovery Strategies
// ============================================================================

/// The closed set of remediation behaviors the orchestrator can choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// Signal the caller to retry after a computed backoff delay.
    RetryWithBackoff,
    /// Synthesize an event from text heuristics.
    FallbackEventCreation,
    /// Synthesize locally with confidence pinned to the offline floor.
    OfflineMode,
    /// Hand the low-confidence event to the user for confirmation.
    UserConfirmationRequired,
    /// Accept a degraded event rather than failing outright.
    GracefulDegradation,
    /// Ask the caller to try a different calendar application.
    AlternativeCalendarLaunch,
    /// Persist the request and retry once conditions improve.
    CacheAndRetryLater,
    /// Ask the user to rephrase or enter the event manually.
    ManualInputSuggestion,
    /// Terminal: nothing left to try.
    NoRecoveryPossible,
}

impl RecoveryStrategy {
    /// Get a human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            RecoveryStrategy::RetryWithBackoff => "Retry with Backoff",
            RecoveryStrategy::FallbackEventCreation => "Fallback Event Creation",
            RecoveryStrategy::OfflineMode => "Offline Mode",
            RecoveryStrategy::UserConfirmationRequired => "User Confirmation Required",
            RecoveryStrategy::GracefulDegradation => "Graceful Degradation",
            RecoveryStrategy::AlternativeCalendarLaunch => "Alternative Calendar Launch",
            RecoveryStrategy::CacheAndRetryLater => "Cache and Retry Later",
            RecoveryStrategy::ManualInputSuggestion => "Manual Input Suggestion",
            RecoveryStrategy::NoRecoveryPossible => "No Recovery Possible",
        }
    }

    /// Whether executing this strategy can yield an event immediately.
    pub fn produces_event(&self) -> bool {
        matches!(
            self,
            RecoveryStrategy::FallbackEventCreation
                | RecoveryStrategy::OfflineMode
                | RecoveryStrategy::GracefulDegradation
        )
    }
}

// ============================================================================
// User Actions
// ============================================================================

/// What the caller must surface to the user to make progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    /// Review the draft and confirm creation.
    ConfirmEvent,
    /// Pick a different calendar application.
    ChooseAlternativeCalendar,
    /// Rephrase the request or enter details by hand.
    ReviseInput,
}

impl UserAction {
    /// Get a human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            UserAction::ConfirmEvent => "Confirm Event",
            UserAction::ChooseAlternativeCalendar => "Choose Alternative Calendar",
            UserAction::ReviseInput => "Revise Input",
        }
    }
}

// ============================================================================
// Failure Context
// ============================================================================

/// Everything the orchestrator needs to classify and react to one failure.
#[derive(Debug, Clone)]
pub struct FailureContext {
    /// Classified failure kind.
    pub kind: FailureKind,
    /// The raw text of the failing request.
    pub raw_text: String,
    /// A partial draft, when the remote parse got that far.
    pub partial: Option<EventDraft>,
    /// The causing fault, when one was captured.
    pub fault: Option<ParserError>,
    /// Attempts already spent on this request lifecycle.
    pub retry_count: u32,
    /// When the failure was observed.
    pub timestamp: DateTime<Utc>,
    /// Whether the network looked reachable at failure time.
    pub network_available: bool,
    /// Whether the caller can put a dialog in front of the user.
    pub user_interaction_allowed: bool,
    /// Kinds this request has already cycled through.
    pub kind_history: Vec<FailureKind>,
    /// Upstream confidence, when a parse existed.
    pub confidence: Option<f32>,
    /// Processing time spent on this request so far.
    pub elapsed: Duration,
}

impl FailureContext {
    pub fn new(kind: FailureKind, raw_text: impl Into<String>) -> Self {
        Self {
            kind,
            raw_text: raw_text.into(),
            partial: None,
            fault: None,
            retry_count: 0,
            timestamp: Utc::now(),
            network_available: true,
            user_interaction_allowed: true,
            kind_history: Vec::new(),
            confidence: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_partial(mut self, partial: EventDraft) -> Self {
        self.partial = Some(partial);
        self
    }

    pub fn with_fault(mut self, fault: ParserError) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_network_available(mut self, available: bool) -> Self {
        self.network_available = available;
        self
    }

    pub fn with_user_interaction_allowed(mut self, allowed: bool) -> Self {
        self.user_interaction_allowed = allowed;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Record a prior kind this request already failed with.
    pub fn with_prior_kind(mut self, kind: FailureKind) -> Self {
        self.kind_history.push(kind);
        self
    }
}

// ============================================================================
// Recovery Outcome
// ============================================================================

/// The orchestrator's answer: what was decided and what the caller does next.
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    /// Whether recovery produced a usable result.
    pub success: bool,
    /// The strategy that was chosen.
    pub strategy: RecoveryStrategy,
    /// The recovered event, when one was synthesized.
    pub event: Option<EventDraft>,
    /// User-facing message. Never empty.
    pub message: String,
    /// Action the user must take before progress can resume.
    pub required_action: Option<UserAction>,
    /// Whether the caller should schedule another attempt.
    pub retry_recommended: bool,
    /// How long to wait before the next attempt.
    pub retry_delay: Option<Duration>,
    /// Anonymized metrics attached for the caller. Never raw text.
    pub metrics: HashMap<String, serde_json::Value>,
}

impl RecoveryOutcome {
    /// An outcome that carries a recovered event.
    pub fn recovered(
        strategy: RecoveryStrategy,
        event: EventDraft,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            strategy,
            event: Some(event),
            message: message.into(),
            required_action: None,
            retry_recommended: false,
            retry_delay: None,
            metrics: HashMap::new(),
        }
    }

    /// An outcome asking the caller to retry after `delay`.
    pub fn retry_after(delay: Duration, message: impl Into<String>) -> Self {
        Self {
            success: false,
            strategy: RecoveryStrategy::RetryWithBackoff,
            event: None,
            message: message.into(),
            required_action: None,
            retry_recommended: true,
            retry_delay: Some(delay),
            metrics: HashMap::new(),
        }
    }

    /// An outcome blocked on a user action.
    pub fn needs_user(
        strategy: RecoveryStrategy,
        action: UserAction,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            strategy,
            event: None,
            message: message.into(),
            required_action: Some(action),
            retry_recommended: false,
            retry_delay: None,
            metrics: HashMap::new(),
        }
    }

    /// The terminal outcome: nothing left to try.
    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            success: false,
            strategy: RecoveryStrategy::NoRecoveryPossible,
            event: None,
            message: message.into(),
            required_action: None,
            retry_recommended: false,
            retry_delay: None,
            metrics: HashMap::new(),
        }
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}
