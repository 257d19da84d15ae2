use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use backoffice_infra::store::{DASHBOARD_WINDOW_DAYS, DEFAULT_LOW_STOCK_THRESHOLD};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::DashboardQuery>,
) -> axum::response::Response {
    let threshold = query
        .low_stock
        .unwrap_or_else(|| Decimal::from(DEFAULT_LOW_STOCK_THRESHOLD));
    if threshold < Decimal::ZERO {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "low_stock must not be negative",
        );
    }

    let since = Utc::now() - Duration::days(DASHBOARD_WINDOW_DAYS);
    match services.queries().dashboard(since, threshold).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
