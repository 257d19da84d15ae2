use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queries().customers().await {
        Ok(customers) => Json(customers).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_employees(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queries().employees().await {
        Ok(employees) => Json(employees).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queries().suppliers().await {
        Ok(suppliers) => Json(suppliers).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
