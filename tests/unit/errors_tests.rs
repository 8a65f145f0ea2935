/*!
 * Tests for error classification and retry policies
 */

use subtrans::errors::{ErrorKind, TranslationError};

#[test]
fn test_classify_status429_shouldBeRateLimit() {
    assert_eq!(ErrorKind::from_status(429, ""), ErrorKind::RateLimit);
}

#[test]
fn test_classify_authStatuses_shouldBeAuth() {
    assert_eq!(ErrorKind::from_status(401, ""), ErrorKind::Auth);
    assert_eq!(ErrorKind::from_status(403, ""), ErrorKind::Auth);
}

#[test]
fn test_classify_status402_shouldBeQuota() {
    assert_eq!(ErrorKind::from_status(402, ""), ErrorKind::Quota);
}

#[test]
fn test_classify_serverErrors_shouldBeNetwork() {
    assert_eq!(ErrorKind::from_status(500, ""), ErrorKind::Network);
    assert_eq!(ErrorKind::from_status(503, ""), ErrorKind::Network);
}

#[test]
fn test_classify_clientErrorWithQuotaWording_shouldBeQuota() {
    assert_eq!(
        ErrorKind::from_status(400, "Insufficient balance for this request"),
        ErrorKind::Quota
    );
    assert_eq!(
        ErrorKind::from_status(400, "monthly quota exceeded"),
        ErrorKind::Quota
    );
}

#[test]
fn test_classify_messageOnly_shouldMatchKeywords() {
    assert_eq!(ErrorKind::from_message("rate limit exceeded"), ErrorKind::RateLimit);
    assert_eq!(ErrorKind::from_message("request aborted by caller"), ErrorKind::Cancelled);
    assert_eq!(ErrorKind::from_message("operation was cancelled"), ErrorKind::Cancelled);
    assert_eq!(ErrorKind::from_message("connection refused"), ErrorKind::Network);
    assert_eq!(ErrorKind::from_message("request timed out"), ErrorKind::Network);
    assert_eq!(ErrorKind::from_message("invalid JSON in response body"), ErrorKind::Parse);
    assert_eq!(ErrorKind::from_message("something odd happened"), ErrorKind::Unknown);
}

#[test]
fn test_classify_quotaBeatsRateWording() {
    // "quota limit reached" mentions both; quota keywords win
    assert_eq!(ErrorKind::from_message("quota limit reached"), ErrorKind::Quota);
}

#[test]
fn test_classify_withoutStatus_usesMessage() {
    assert_eq!(ErrorKind::classify(None, "socket closed"), ErrorKind::Network);
    assert_eq!(ErrorKind::classify(Some(429), "whatever"), ErrorKind::RateLimit);
}

#[test]
fn test_retryPolicy_tableMatchesTaxonomy() {
    let network = ErrorKind::Network.retry_policy();
    assert!(network.retryable);
    assert_eq!(network.max_retries, 3);
    assert_eq!(network.base_delay_ms, 1000);
    assert!(network.exponential);

    let rate_limit = ErrorKind::RateLimit.retry_policy();
    assert!(rate_limit.retryable);
    assert_eq!(rate_limit.max_retries, 5);
    assert_eq!(rate_limit.base_delay_ms, 2000);
    assert!(rate_limit.exponential);

    let parse = ErrorKind::Parse.retry_policy();
    assert!(parse.retryable);
    assert_eq!(parse.max_retries, 1);
    assert_eq!(parse.base_delay_ms, 500);
    assert!(!parse.exponential);

    let unknown = ErrorKind::Unknown.retry_policy();
    assert!(unknown.retryable);
    assert_eq!(unknown.max_retries, 2);

    for terminal in [ErrorKind::Auth, ErrorKind::Quota, ErrorKind::Cancelled] {
        let policy = terminal.retry_policy();
        assert!(!policy.retryable);
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.base_delay_ms, 0);
    }
}

#[test]
fn test_translationError_fromStatus_capturesStatusCode() {
    let error = TranslationError::from_status(429, "too many requests");
    assert_eq!(error.kind, ErrorKind::RateLimit);
    assert_eq!(error.status_code, Some(429));
    assert!(error.is_retryable());
}

#[test]
fn test_translationError_display_includesKindAndMessage() {
    let error = TranslationError::from_status(429, "slow down");
    let display = format!("{}", error);
    assert!(display.contains("RATE_LIMIT"));
    assert!(display.contains("slow down"));
}

#[test]
fn test_userMessage_rateLimit_includesWaitSeconds() {
    let error = TranslationError::from_status(429, "x").with_retry_after(30);
    assert!(error.user_message().contains("30 seconds"));

    let without_hint = TranslationError::from_status(429, "x");
    assert!(without_hint.user_message().contains("60 seconds"));
}

#[test]
fn test_userMessage_isDistinctFromTechnicalMessage() {
    let error = TranslationError::from_status(401, "HTTP 401 from upstream: invalid_api_key");
    assert!(!error.user_message().contains("upstream"));
    assert!(error.user_message().contains("API key"));
}

#[test]
fn test_cancelled_isTerminal() {
    let error = TranslationError::cancelled();
    assert_eq!(error.kind, ErrorKind::Cancelled);
    assert!(!error.is_retryable());
}
