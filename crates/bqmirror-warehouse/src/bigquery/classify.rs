//! Mapping of BigQuery failures onto [`WarehouseErrorKind`].

use bqmirror_types::{WarehouseError, WarehouseErrorKind};
use reqwest::StatusCode;

use super::wire::{ErrorProto, ErrorResponse};

/// Classify a BigQuery error `reason` code and its message.
pub(crate) fn classify_reason(reason: &str, message: &str) -> WarehouseErrorKind {
    if mentions_location_mismatch(message) {
        return WarehouseErrorKind::LocationMismatch;
    }
    match reason {
        "notFound" => WarehouseErrorKind::NotFound,
        "accessDenied" => WarehouseErrorKind::PermissionDenied,
        "quotaExceeded" => WarehouseErrorKind::QuotaExceeded,
        "rateLimitExceeded" | "backendError" | "internalError" | "jobBackendError"
        | "jobInternalError" | "tableUnavailable" => WarehouseErrorKind::Transient,
        _ => WarehouseErrorKind::Unknown,
    }
}

/// BigQuery reports region problems as `notFound`/`invalid` with a message
/// naming the location, e.g. "Not found: Dataset p:d was not found in
/// location US" or "Cannot read and write in different locations".
fn mentions_location_mismatch(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("different locations")
        || lower.contains("was not found in location")
        || lower.contains("location mismatch")
}

/// Classify the `errorResult` of a finished job.
pub(crate) fn classify_job_error(err: &ErrorProto) -> WarehouseError {
    WarehouseError::new(classify_reason(&err.reason, &err.message), err.message.clone())
}

/// Classify a non-2xx HTTP response.
pub(crate) fn classify_http(status: StatusCode, body: &str) -> WarehouseError {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    let (reason, message) = parsed.map_or_else(
        || (String::new(), format!("BigQuery API error ({status}): {body}")),
        |resp| {
            let reason = resp
                .error
                .errors
                .first()
                .map(|e| e.reason.clone())
                .unwrap_or_default();
            (reason, resp.error.message)
        },
    );

    let kind = match classify_reason(&reason, &message) {
        WarehouseErrorKind::Unknown => kind_for_status(status),
        kind => kind,
    };
    WarehouseError::new(kind, message)
}

fn kind_for_status(status: StatusCode) -> WarehouseErrorKind {
    match status.as_u16() {
        404 => WarehouseErrorKind::NotFound,
        401 | 403 => WarehouseErrorKind::PermissionDenied,
        408 | 429 | 500 | 502 | 503 | 504 => WarehouseErrorKind::Transient,
        _ => WarehouseErrorKind::Unknown,
    }
}

/// Classify a transport-level failure (no HTTP response).
pub(crate) fn classify_transport(err: &reqwest::Error) -> WarehouseError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        WarehouseError::transient(format!("BigQuery request failed: {err}"))
    } else {
        WarehouseError::unknown(format!("BigQuery request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_map_to_kinds() {
        assert_eq!(classify_reason("notFound", "Not found: Table p:d.t"), WarehouseErrorKind::NotFound);
        assert_eq!(classify_reason("accessDenied", "denied"), WarehouseErrorKind::PermissionDenied);
        assert_eq!(classify_reason("quotaExceeded", "quota"), WarehouseErrorKind::QuotaExceeded);
        assert_eq!(classify_reason("rateLimitExceeded", "slow"), WarehouseErrorKind::Transient);
        assert_eq!(classify_reason("backendError", "oops"), WarehouseErrorKind::Transient);
        assert_eq!(classify_reason("invalidQuery", "syntax"), WarehouseErrorKind::Unknown);
    }

    #[test]
    fn location_messages_win_over_reason() {
        assert_eq!(
            classify_reason(
                "notFound",
                "Not found: Dataset dst:mirror was not found in location US"
            ),
            WarehouseErrorKind::LocationMismatch
        );
        assert_eq!(
            classify_reason("invalid", "Cannot read and write in different locations: source: EU, destination: US"),
            WarehouseErrorKind::LocationMismatch
        );
    }

    #[test]
    fn http_body_reason_is_preferred() {
        let body = r#"{"error":{"code":403,"message":"Exceeded rate limits","errors":[{"reason":"rateLimitExceeded","message":"Exceeded rate limits"}]}}"#;
        let err = classify_http(StatusCode::FORBIDDEN, body);
        assert_eq!(err.kind, WarehouseErrorKind::Transient);
        assert_eq!(err.message, "Exceeded rate limits");
    }

    #[test]
    fn http_status_fallback() {
        assert_eq!(
            classify_http(StatusCode::SERVICE_UNAVAILABLE, "upstream down").kind,
            WarehouseErrorKind::Transient
        );
        assert_eq!(
            classify_http(StatusCode::FORBIDDEN, "<html>").kind,
            WarehouseErrorKind::PermissionDenied
        );
        assert_eq!(
            classify_http(StatusCode::NOT_FOUND, "").kind,
            WarehouseErrorKind::NotFound
        );
        assert_eq!(
            classify_http(StatusCode::BAD_REQUEST, "bad").kind,
            WarehouseErrorKind::Unknown
        );
    }

    #[test]
    fn job_error_result_is_classified() {
        let err = classify_job_error(&ErrorProto {
            reason: "accessDenied".into(),
            message: "Access Denied: Table p:d.t".into(),
        });
        assert_eq!(err.kind, WarehouseErrorKind::PermissionDenied);
        assert!(err.message.contains("Access Denied"));
    }
}
