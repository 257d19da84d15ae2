use axum::{routing::get, Router};

pub mod dashboard;
pub mod parties;
pub mod products;
pub mod purchases;
pub mod sales;
pub mod system;

/// Router for the back-office endpoints (mounted under `/api`).
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .route("/customers", get(parties::list_customers))
        .route("/employees", get(parties::list_employees))
        .route("/suppliers", get(parties::list_suppliers))
        .nest("/sales", sales::router())
        .nest("/purchases", purchases::router())
        .route("/dashboard", get(dashboard::dashboard))
}
