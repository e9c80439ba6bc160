//! Category endpoints.
//!
//! Listing requires a session; mutation is admin-gated.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminAuth, Auth};
use crate::db::Database;
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct CategoriesState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(CategoriesState);

pub fn router(state: CategoriesState) -> Router {
    Router::new()
        .route("/", get(list_categories))
        .route("/", post(create_category))
        .route("/{uuid}", put(update_category))
        .with_state(state)
}

async fn list_categories(
    State(state): State<CategoriesState>,
    Auth(_user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .db
        .categories()
        .list()
        .await
        .db_err("Failed to list categories")?;
    Ok((StatusCode::OK, Json(categories)))
}

#[derive(Deserialize)]
struct CategoryRequest {
    name: String,
    #[serde(default)]
    sub_categories: Vec<String>,
}

fn validate_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.len() < 3 || name.len() > 50 {
        return Err(ApiError::bad_request(
            "Category name must be between 3 and 50 characters",
        ));
    }
    Ok(name)
}

async fn create_category(
    State(state): State<CategoriesState>,
    AdminAuth(_admin): AdminAuth,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = validate_name(&req.name)?;

    if state
        .db
        .categories()
        .get_by_name(name)
        .await
        .db_err("Failed to check category")?
        .is_some()
    {
        return Err(ApiError::conflict("Category already exists"));
    }

    let uuid = Uuid::new_v4().to_string();
    state
        .db
        .categories()
        .create(&uuid, name, &req.sub_categories)
        .await
        .db_err("Failed to create category")?;

    let category = state
        .db
        .categories()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load category")?
        .ok_or_else(|| ApiError::internal("Category not created"))?;

    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<CategoriesState>,
    AdminAuth(_admin): AdminAuth,
    Path(uuid): Path<String>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = validate_name(&req.name)?;

    let updated = state
        .db
        .categories()
        .update(&uuid, name, &req.sub_categories)
        .await
        .db_err("Failed to update category")?;
    if !updated {
        return Err(ApiError::not_found("Category not found"));
    }

    let category = state
        .db
        .categories()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load category")?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    Ok((StatusCode::OK, Json(category)))
}
