//! The event pipeline: remote parse, assessment, recovery, sanitization.
//!
//! One asynchronous task drives one request; recovery attempts for the
//! same request never run concurrently. The retry loop is an explicit
//! bounded iteration that suspends only at the network call and at the
//! backoff sleep. Cancellation is checked between attempts, never
//! mid-call, so a cancelled request cannot leave half-applied state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assess::{ConfidenceAssessment, ConfidenceValidator};
use crate::config::RecoveryConfig;
use crate::error::{KalendsError, Result};
use crate::event::EventDraft;
use crate::metrics::{get_metrics, Metrics};
use crate::recovery::{
    classify, FailureContext, FailureKind, RecoveryOrchestrator, RecoveryStrategy, UserAction,
};
use crate::remote::{ParserError, RemoteParser};
use crate::store::KvStore;
use crate::validate::{DataSanitizer, ValidationOutcome};

/// Requests longer than this are rejected before any remote call.
pub const MAX_INPUT_CHARS: usize = 10_000;

// ============================================================================
// Request and Outcome Types
// ============================================================================

/// One user request to turn text into a calendar event.
#[derive(Debug, Clone)]
pub struct EventRequest {
    /// Request id threaded through log fields.
    pub id: Uuid,
    /// The natural-language text to interpret.
    pub text: String,
    /// Whether the caller believes the network is reachable.
    pub network_available: bool,
    /// Whether the caller can show dialogs to the user.
    pub user_interaction_allowed: bool,
}

impl EventRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            network_available: true,
            user_interaction_allowed: true,
        }
    }

    pub fn with_network_available(mut self, available: bool) -> Self {
        self.network_available = available;
        self
    }

    pub fn with_user_interaction_allowed(mut self, allowed: bool) -> Self {
        self.user_interaction_allowed = allowed;
        self
    }
}

/// A finished event with its assessment and sanitization record.
#[derive(Debug, Clone)]
pub struct ProcessedEvent {
    /// Scores, recommendation, and suggestions for the draft.
    pub assessment: ConfidenceAssessment,
    /// Sanitization result; `validation.sanitized` is the final draft.
    pub validation: ValidationOutcome,
}

impl ProcessedEvent {
    /// The sanitized draft ready for calendar handoff.
    pub fn event(&self) -> &EventDraft {
        &self.validation.sanitized
    }
}

/// What the pipeline produced for a request.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// A sanitized event, ready for the calendar.
    Event(Box<ProcessedEvent>),
    /// Progress is blocked on a user action.
    ActionRequired {
        strategy: RecoveryStrategy,
        action: UserAction,
        message: String,
    },
    /// The request was parked or failed terminally.
    Failed {
        strategy: RecoveryStrategy,
        message: String,
    },
    /// The caller cancelled between attempts.
    Cancelled,
}

// ============================================================================
// Cancellation
// ============================================================================

/// Externally observable cancellation signal, checked between attempts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next attempt boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Drives a request through parse, assessment, recovery, and sanitization.
pub struct EventPipeline {
    parser: Arc<dyn RemoteParser>,
    orchestrator: RecoveryOrchestrator,
    validator: ConfidenceValidator,
    sanitizer: DataSanitizer,
    config: RecoveryConfig,
}

impl EventPipeline {
    pub fn new(
        config: RecoveryConfig,
        parser: Arc<dyn RemoteParser>,
        store: Arc<dyn KvStore>,
    ) -> Self {
        let validator = ConfidenceValidator::new().with_strict_mode(config.confidence.strict_mode);
        let sanitizer =
            DataSanitizer::new().with_default_duration(config.event.default_duration_minutes);
        let orchestrator = RecoveryOrchestrator::new(config.clone(), store);
        Self {
            parser,
            orchestrator,
            validator,
            sanitizer,
            config,
        }
    }

    /// The orchestrator backing this pipeline.
    pub fn orchestrator(&self) -> &RecoveryOrchestrator {
        &self.orchestrator
    }

    /// Process a request to completion.
    pub async fn process(&self, request: EventRequest) -> Result<PipelineOutcome> {
        self.process_cancellable(request, CancelFlag::new()).await
    }

    /// Process a request, checking `cancel` between attempts.
    pub async fn process_cancellable(
        &self,
        request: EventRequest,
        cancel: CancelFlag,
    ) -> Result<PipelineOutcome> {
        let metrics = get_metrics();
        metrics.requests_total.inc();
        let _timer = Metrics::start_timer(&metrics.pipeline_duration_seconds);

        if request.text.chars().count() > MAX_INPUT_CHARS {
            metrics.requests_rejected_total.inc();
            warn!(
                request_id = %request.id,
                length = request.text.chars().count(),
                "Rejecting over-length request"
            );
            return Err(KalendsError::Rejected(format!(
                "input text exceeds the {MAX_INPUT_CHARS} character limit"
            )));
        }

        let started = Instant::now();
        let mut retry_count: u32 = 0;
        let mut kind_history: Vec<FailureKind> = Vec::new();

        loop {
            if cancel.is_cancelled() {
                info!(request_id = %request.id, "Request cancelled between attempts");
                return Ok(PipelineOutcome::Cancelled);
            }

            let ctx = match self.attempt_parse(&request, &metrics).await {
                Ok(parse) => {
                    let draft = parse.into_draft(&request.text);
                    let assessment = self.validator.assess(&draft, &request.text);
                    if assessment.missing_critical.is_empty()
                        && assessment.overall >= self.config.confidence.threshold
                    {
                        info!(
                            request_id = %request.id,
                            confidence = assessment.overall,
                            "Parse accepted"
                        );
                        return Ok(self.finish(draft, assessment, &request.text, &metrics));
                    }
                    let kind = if assessment.missing_critical.is_empty() {
                        FailureKind::LowConfidence
                    } else {
                        FailureKind::InsufficientData
                    };
                    self.failure_context(kind, &request, started, retry_count, &kind_history)
                        .with_partial(draft)
                        .with_confidence(assessment.overall)
                }
                Err(fault) => {
                    metrics.parse_errors_total.inc();
                    let kind = classify(&fault);
                    debug!(
                        request_id = %request.id,
                        kind = kind.display_name(),
                        "Remote parse failed"
                    );
                    self.failure_context(kind, &request, started, retry_count, &kind_history)
                        .with_fault(fault)
                }
            };

            match self.conclude(ctx, &mut retry_count, &mut kind_history).await {
                Some(outcome) => return Ok(outcome),
                None => continue,
            }
        }
    }

    /// One remote parse attempt under the per-attempt deadline.
    async fn attempt_parse(
        &self,
        request: &EventRequest,
        metrics: &Metrics,
    ) -> std::result::Result<crate::remote::RemoteParse, ParserError> {
        let deadline = Duration::from_millis(self.config.network.timeout_ms);
        let timer = Metrics::start_timer(&metrics.parse_duration_seconds);
        let result = match timeout(deadline, self.parser.parse(&request.text)).await {
            Ok(result) => result,
            Err(_) => Err(ParserError::Timeout {
                elapsed_ms: self.config.network.timeout_ms,
            }),
        };
        drop(timer);
        result
    }

    fn failure_context(
        &self,
        kind: FailureKind,
        request: &EventRequest,
        started: Instant,
        retry_count: u32,
        kind_history: &[FailureKind],
    ) -> FailureContext {
        let mut ctx = FailureContext::new(kind, request.text.clone())
            .with_retry_count(retry_count)
            .with_network_available(request.network_available)
            .with_user_interaction_allowed(request.user_interaction_allowed)
            .with_elapsed(started.elapsed());
        for prior in kind_history {
            ctx = ctx.with_prior_kind(*prior);
        }
        ctx
    }

    /// Run recovery; `None` means a retry was scheduled and slept through.
    async fn conclude(
        &self,
        ctx: FailureContext,
        retry_count: &mut u32,
        kind_history: &mut Vec<FailureKind>,
    ) -> Option<PipelineOutcome> {
        let kind = ctx.kind;
        let original = ctx.raw_text.clone();
        let outcome = self.orchestrator.handle(ctx).await;

        if outcome.retry_recommended && *retry_count < self.config.retry.max_attempts {
            if let Some(delay) = outcome.retry_delay {
                sleep(delay).await;
            }
            *retry_count += 1;
            kind_history.push(kind);
            return None;
        }

        if let Some(event) = outcome.event {
            let metrics = get_metrics();
            let assessment = self.validator.assess(&event, &original);
            return Some(self.finish(event, assessment, &original, &metrics));
        }

        if let Some(action) = outcome.required_action {
            return Some(PipelineOutcome::ActionRequired {
                strategy: outcome.strategy,
                action,
                message: outcome.message,
            });
        }

        Some(PipelineOutcome::Failed {
            strategy: outcome.strategy,
            message: outcome.message,
        })
    }

    /// Sanitize and package a draft that is going back to the caller.
    fn finish(
        &self,
        draft: EventDraft,
        assessment: ConfidenceAssessment,
        original_text: &str,
        metrics: &Metrics,
    ) -> PipelineOutcome {
        let validation = self.sanitizer.validate_and_sanitize(&draft, original_text);
        metrics.events_created_total.inc();
        PipelineOutcome::Event(Box::new(ProcessedEvent {
            assessment,
            validation,
        }))
    }
}
