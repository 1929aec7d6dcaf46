//! API service routes

use auth::middleware::{rate_limit, require_auth};
use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use common::{
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    AppState,
    models::{NewProduct, UpdateProduct},
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/products", get(get_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state.clone())
        .nest("/auth", auth::routes::router().with_state(state.auth.clone()))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "products-api"
    }))
}

fn product_id(id: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest("Invalid product ID".to_string()))
}

fn product_not_found() -> ApiError {
    ApiError::NotFound("Product not found".to_string())
}

/// Get all products
pub async fn get_products(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let products = state.products.get_all().await?;
    let count = products.len();

    let response = ApiResponse::success(StatusCode::OK, "Products retrieved successfully", products);

    Ok(response.with_count(count))
}

/// Get a product by ID
pub async fn get_product(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = product_id(id)?;
    let product = state
        .products
        .get_by_id(id)
        .await?
        .ok_or_else(product_not_found)?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Product retrieved successfully",
        product,
    ))
}

/// Create a new product
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    payload.validate().map_err(ApiError::BadRequest)?;

    let product = state.products.create(&payload).await?;
    info!("Created product {}", product.id);

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Product created successfully",
        product,
    ))
}

/// Update the provided fields of a product
pub async fn update_product(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateProduct>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = product_id(id)?;
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    payload.validate().map_err(ApiError::BadRequest)?;

    let product = state
        .products
        .update(id, &payload)
        .await?
        .ok_or_else(product_not_found)?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Product updated successfully",
        product,
    ))
}

/// Delete a product by ID
pub async fn delete_product(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = product_id(id)?;

    if !state.products.delete(id).await? {
        return Err(product_not_found());
    }
    info!("Deleted product {}", id);

    Ok(ApiResponse::message(
        StatusCode::OK,
        "Product deleted successfully",
    ))
}
