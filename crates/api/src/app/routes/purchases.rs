use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use backoffice_core::Folio;
use backoffice_purchasing::PurchaseDraft;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_purchases).post(record_purchase))
        .route("/:folio", get(get_purchase))
}

pub async fn record_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PurchaseDraft>,
) -> axum::response::Response {
    match services.record_purchase(&body).await {
        Ok(folio) => (StatusCode::CREATED, Json(dto::RecordedOrder { folio })).into_response(),
        Err(e) => errors::record_error_to_response(e),
    }
}

pub async fn list_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    match services.queries().purchases(query.pagination()).await {
        Ok(purchases) => Json(purchases).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Path(folio): Path<String>,
) -> axum::response::Response {
    let folio: Folio = match folio.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid purchase folio");
        }
    };

    match services.queries().purchase(folio).await {
        Ok(Some(purchase)) => Json(purchase).into_response(),
        Ok(None) => errors::not_found(format!("purchase {folio} not found")),
        Err(e) => errors::store_error_to_response(e),
    }
}
