use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use backoffice_core::DomainError;
use backoffice_infra::recorder::{RecordError, Reference};
use backoffice_infra::store::StoreError;

pub fn record_error_to_response(err: RecordError) -> axum::response::Response {
    match err {
        RecordError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        RecordError::UnknownReference(reference) => {
            let (kind, id) = match &reference {
                Reference::Product(code) => ("product", json!(code.as_str())),
                Reference::Party(party) => (party.kind().as_str(), json!(party.raw_id())),
            };
            (
                StatusCode::NOT_FOUND,
                axum::Json(json!({
                    "error": "unknown_reference",
                    "message": format!("unknown {reference}"),
                    "reference": { "kind": kind, "id": id },
                })),
            )
                .into_response()
        }
        RecordError::InsufficientStock {
            line,
            code,
            requested,
            on_hand,
        } => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": format!("line {line}: not enough {code} on hand"),
                "line": line,
                "product_code": code.as_str(),
                "requested": requested,
                "on_hand": on_hand,
            })),
        )
            .into_response(),
        // The draft was well formed; the stored level could not take the change.
        RecordError::Persistence(StoreError::Check(msg)) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "persistence_failure", msg)
        }
        RecordError::Persistence(e) => store_error_to_response(e),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Duplicate(msg) => json_error(StatusCode::CONFLICT, "duplicate", msg),
        StoreError::ForeignKey(msg) => json_error(StatusCode::CONFLICT, "in_use", msg),
        StoreError::Check(msg) => json_error(StatusCode::BAD_REQUEST, "constraint_violation", msg),
        StoreError::Unavailable(msg) => {
            tracing::error!(error = %msg, "storage unavailable");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "persistence_failure",
                "storage unavailable",
            )
        }
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "storage error");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "persistence_failure",
                "storage error",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::NotFound => not_found("not found"),
        other => json_error(StatusCode::BAD_REQUEST, "validation_error", other.to_string()),
    }
}

pub fn not_found(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
