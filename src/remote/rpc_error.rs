use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{operation_error, ProtoStoreError, RpcStatus};

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Maps a failed HTTP exchange to an operation error carrying the remote status.
///
/// The `status` field of a Google error payload wins over the HTTP code.
pub fn map_http_error(status: StatusCode, body: &str) -> ProtoStoreError {
    let payload = extract_error_payload(body);
    let message = payload
        .as_ref()
        .and_then(|payload| payload.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("HTTP error").to_string());

    let rpc_status = payload
        .as_ref()
        .and_then(|payload| payload.status.as_deref())
        .and_then(parse_status_name)
        .unwrap_or_else(|| status_from_http(status));
    operation_error(rpc_status, message)
}

fn status_from_http(status: StatusCode) -> RpcStatus {
    match status {
        StatusCode::BAD_REQUEST => RpcStatus::InvalidArgument,
        StatusCode::UNAUTHORIZED => RpcStatus::Unauthenticated,
        StatusCode::FORBIDDEN => RpcStatus::PermissionDenied,
        StatusCode::NOT_FOUND => RpcStatus::NotFound,
        StatusCode::CONFLICT => RpcStatus::Aborted,
        StatusCode::PRECONDITION_FAILED => RpcStatus::FailedPrecondition,
        StatusCode::TOO_MANY_REQUESTS => RpcStatus::ResourceExhausted,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => RpcStatus::DeadlineExceeded,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => RpcStatus::Unavailable,
        StatusCode::INTERNAL_SERVER_ERROR => RpcStatus::Internal,
        status if status.is_client_error() => RpcStatus::InvalidArgument,
        status if status.is_server_error() => RpcStatus::Internal,
        _ => RpcStatus::Unknown,
    }
}

fn parse_status_name(name: &str) -> Option<RpcStatus> {
    let status = match name {
        "CANCELLED" => RpcStatus::Cancelled,
        "UNKNOWN" => RpcStatus::Unknown,
        "INVALID_ARGUMENT" | "OUT_OF_RANGE" => RpcStatus::InvalidArgument,
        "NOT_FOUND" => RpcStatus::NotFound,
        "ALREADY_EXISTS" => RpcStatus::AlreadyExists,
        "PERMISSION_DENIED" => RpcStatus::PermissionDenied,
        "RESOURCE_EXHAUSTED" => RpcStatus::ResourceExhausted,
        "FAILED_PRECONDITION" => RpcStatus::FailedPrecondition,
        "ABORTED" => RpcStatus::Aborted,
        "DEADLINE_EXCEEDED" => RpcStatus::DeadlineExceeded,
        "UNAVAILABLE" => RpcStatus::Unavailable,
        "UNAUTHENTICATED" => RpcStatus::Unauthenticated,
        "INTERNAL" | "DATA_LOSS" | "UNIMPLEMENTED" => RpcStatus::Internal,
        _ => return None,
    };
    Some(status)
}

fn extract_error_payload(body: &str) -> Option<GoogleError> {
    serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
}
