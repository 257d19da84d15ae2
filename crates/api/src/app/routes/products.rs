use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use backoffice_core::ProductCode;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:code",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn parse_code(raw: &str) -> Result<ProductCode, axum::response::Response> {
    ProductCode::new(raw).map_err(errors::domain_error_to_response)
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queries().products().await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match parse_code(&code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.queries().product(&code).await {
        Ok(Some(product)) => Json(product).into_response(),
        Ok(None) => errors::not_found(format!("product {code} not found")),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let product = match body.into_command().and_then(|cmd| cmd.into_product()) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog().create_product(&product).await {
        Ok(()) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
    Json(body): Json<dto::UpdateProductRequest>,
) -> axum::response::Response {
    let code = match parse_code(&code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let product = match body.into_command().and_then(|cmd| cmd.apply_to(code)) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog().update_product(&product).await {
        Ok(true) => Json(product).into_response(),
        Ok(false) => errors::not_found(format!("product {} not found", product.code)),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match parse_code(&code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.catalog().delete_product(&code).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::not_found(format!("product {code} not found")),
        Err(e) => errors::store_error_to_response(e),
    }
}
