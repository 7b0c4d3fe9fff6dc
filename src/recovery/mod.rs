//! Recovery module for failure classification and strategy execution.
//!
//! This module provides the error-handling core of the engine:
//!
//! - **Failure Classification**: Map remote parser faults to a closed taxonomy
//! - **Strategy Selection**: A pure decision table over (kind, context, config)
//! - **Strategy Execution**: Retry scheduling, fallback synthesis, offline mode
//! - **Outcome Records**: Anonymized persistence of every handled failure
//! - **Pattern Counting**: Coarse failure fingerprints for suggestion ranking
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Recovery Layer                              │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │              classify(ParserError)                        │  │
//! │  │  - Explicit service codes first                           │  │
//! │  │  - Fault variant second                                   │  │
//! │  │  - Message substrings last                                │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                           │                                      │
//! │                           ▼                                      │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │              select_strategy(kind, ctx, config)           │  │
//! │  │  - Deterministic, side-effect free                        │  │
//! │  │  - Honors retry budget and feature toggles                │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                           │                                      │
//! │                           ▼                                      │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │              RecoveryOrchestrator                         │  │
//! │  │  - Backoff delays for retryable kinds                     │  │
//! │  │  - Fallback / offline / degraded synthesis                │  │
//! │  │  - Request caching for rate limits                        │  │
//! │  │  - Outcome log + pattern store appends                    │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use kalends::config::RecoveryConfig;
//! use kalends::recovery::{classify, FailureContext, RecoveryOrchestrator};
//! use kalends::store::MemoryKvStore;
//! use std::sync::Arc;
//!
//! let orchestrator = RecoveryOrchestrator::new(
//!     RecoveryConfig::default(),
//!     Arc::new(MemoryKvStore::new()),
//! );
//!
//! let kind = classify(&fault);
//! let ctx = FailureContext::new(kind, "lunch with Sam tomorrow")
//!     .with_fault(fault)
//!     .with_retry_count(1);
//!
//! let outcome = orchestrator.handle(ctx).await;
//! if outcome.retry_recommended {
//!     // sleep for outcome.retry_delay, then try the parse again
//! }
//! ```

mod classifier;
mod orchestrator;
mod strategy;
mod types;

pub use classifier::{classify, classify_code};
pub use orchestrator::RecoveryOrchestrator;
pub use strategy::select_strategy;
pub use types::{
    FailureContext, FailureKind, RecoveryOutcome, RecoveryStrategy, UserAction,
};
