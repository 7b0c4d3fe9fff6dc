//! Fault classification.
//!
//! Precedence order: an explicit structured code from the remote service
//! wins; otherwise the fault variant decides; message substrings are the
//! last resort before [`FailureKind::Unknown`].

use crate::remote::ParserError;

use super::types::FailureKind;

/// Structured service codes and the kinds they map to.
static SERVICE_CODES: &[(&str, FailureKind)] = &[
    ("network_error", FailureKind::Network),
    ("service_unavailable", FailureKind::Network),
    ("timeout", FailureKind::Timeout),
    ("deadline_exceeded", FailureKind::Timeout),
    ("parse_error", FailureKind::ParsingFailure),
    ("parsing_failed", FailureKind::ParsingFailure),
    ("malformed_response", FailureKind::ParsingFailure),
    ("low_confidence", FailureKind::LowConfidence),
    ("insufficient_data", FailureKind::InsufficientData),
    ("insufficient_text", FailureKind::InsufficientData),
    ("validation_error", FailureKind::ValidationError),
    ("rate_limited", FailureKind::RateLimit),
    ("rate_limit_exceeded", FailureKind::RateLimit),
    ("internal_error", FailureKind::ServerError),
    ("server_error", FailureKind::ServerError),
];

/// Map a fault to its failure kind.
pub fn classify(fault: &ParserError) -> FailureKind {
    match fault {
        ParserError::Service { code, message } => {
            classify_code(code).unwrap_or_else(|| classify_message(message))
        }
        ParserError::Network(_) => FailureKind::Network,
        ParserError::Timeout { .. } => FailureKind::Timeout,
        ParserError::Malformed(_) => FailureKind::ParsingFailure,
        ParserError::RateLimited { .. } => FailureKind::RateLimit,
        ParserError::Server { status } => classify_status(*status),
        ParserError::Other(message) => classify_message(message),
    }
}

/// Look up an explicit service code, tolerating case and dash variants.
pub fn classify_code(code: &str) -> Option<FailureKind> {
    let normalized = code.trim().to_lowercase().replace('-', "_");
    SERVICE_CODES
        .iter()
        .find(|(known, _)| *known == normalized)
        .map(|(_, kind)| *kind)
}

fn classify_status(status: u16) -> FailureKind {
    match status {
        408 => FailureKind::Timeout,
        429 => FailureKind::RateLimit,
        _ => FailureKind::ServerError,
    }
}

fn classify_message(message: &str) -> FailureKind {
    let lowered = message.to_lowercase();
    if lowered.contains("timeout") {
        FailureKind::Timeout
    } else if lowered.contains("network") {
        FailureKind::Network
    } else {
        FailureKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_code_wins_over_variant() {
        let fault = ParserError::Service {
            code: "RATE-LIMITED".to_string(),
            message: "network glitch".to_string(),
        };
        assert_eq!(classify(&fault), FailureKind::RateLimit);
    }

    #[test]
    fn test_unknown_code_falls_back_to_message() {
        let fault = ParserError::Service {
            code: "weird_code".to_string(),
            message: "upstream network unreachable".to_string(),
        };
        assert_eq!(classify(&fault), FailureKind::Network);
    }

    #[test]
    fn test_variant_classification() {
        assert_eq!(
            classify(&ParserError::Network("dns failure".to_string())),
            FailureKind::Network
        );
        assert_eq!(
            classify(&ParserError::Timeout { elapsed_ms: 10_000 }),
            FailureKind::Timeout
        );
        assert_eq!(
            classify(&ParserError::Malformed("truncated json".to_string())),
            FailureKind::ParsingFailure
        );
        assert_eq!(
            classify(&ParserError::RateLimited {
                retry_after_ms: Some(5000)
            }),
            FailureKind::RateLimit
        );
    }

    #[test]
    fn test_status_buckets() {
        assert_eq!(
            classify(&ParserError::Server { status: 500 }),
            FailureKind::ServerError
        );
        assert_eq!(
            classify(&ParserError::Server { status: 408 }),
            FailureKind::Timeout
        );
        assert_eq!(
            classify(&ParserError::Server { status: 429 }),
            FailureKind::RateLimit
        );
    }

    #[test]
    fn test_message_substrings_last_resort() {
        assert_eq!(
            classify(&ParserError::Other("request Timeout after 3s".to_string())),
            FailureKind::Timeout
        );
        assert_eq!(
            classify(&ParserError::Other("no network route".to_string())),
            FailureKind::Network
        );
        assert_eq!(
            classify(&ParserError::Other("something odd".to_string())),
            FailureKind::Unknown
        );
    }
}
