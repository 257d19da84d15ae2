use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use backoffice_core::Folio;
use backoffice_sales::SaleDraft;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales).post(record_sale))
        .route("/:folio", get(get_sale))
}

pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<SaleDraft>,
) -> axum::response::Response {
    match services.record_sale(&body).await {
        Ok(folio) => (StatusCode::CREATED, Json(dto::RecordedOrder { folio })).into_response(),
        Err(e) => errors::record_error_to_response(e),
    }
}

pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    match services.queries().sales(query.pagination()).await {
        Ok(sales) => Json(sales).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Path(folio): Path<String>,
) -> axum::response::Response {
    let folio: Folio = match folio.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid sale folio"),
    };

    match services.queries().sale(folio).await {
        Ok(Some(sale)) => Json(sale).into_response(),
        Ok(None) => errors::not_found(format!("sale {folio} not found")),
        Err(e) => errors::store_error_to_response(e),
    }
}
