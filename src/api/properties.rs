//! Property listing endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::{ApiError, ResultExt};
use crate::auth::Auth;
use crate::db::{Database, NewProperty};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct PropertiesState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(PropertiesState);

pub fn router(state: PropertiesState) -> Router {
    Router::new()
        .route("/", get(list_properties))
        .route("/", post(create_property))
        .route("/{uuid}", get(get_property))
        .with_state(state)
}

async fn list_properties(
    State(state): State<PropertiesState>,
    Auth(_user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let properties = state
        .db
        .properties()
        .list()
        .await
        .db_err("Failed to list properties")?;
    Ok((StatusCode::OK, Json(properties)))
}

async fn get_property(
    State(state): State<PropertiesState>,
    Auth(_user): Auth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let property = state
        .db
        .properties()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load property")?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    Ok((StatusCode::OK, Json(property)))
}

#[derive(Deserialize)]
struct PropertyRequest {
    title: String,
    description: String,
    price: f64,
    size: String,
    property_type: String,
    address: String,
    postal_code: Option<String>,
}

impl PropertyRequest {
    fn validate(self) -> Result<NewProperty, ApiError> {
        let title = self.title.trim();
        if title.is_empty() || title.len() > 200 {
            return Err(ApiError::bad_request(
                "Title is required and must be at most 200 characters",
            ));
        }
        if self.description.trim().is_empty() {
            return Err(ApiError::bad_request("Description is required"));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(ApiError::bad_request("Price must be a positive number"));
        }
        if self.property_type.trim().is_empty() {
            return Err(ApiError::bad_request("Property type is required"));
        }
        if self.address.trim().is_empty() {
            return Err(ApiError::bad_request("Address is required"));
        }
        Ok(NewProperty {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            price: self.price,
            size: self.size.trim().to_string(),
            property_type: self.property_type.trim().to_string(),
            address: self.address.trim().to_string(),
            postal_code: self
                .postal_code
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        })
    }
}

async fn create_property(
    State(state): State<PropertiesState>,
    Auth(user): Auth,
    Json(req): Json<PropertyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_property = req.validate()?;

    let uuid = Uuid::new_v4().to_string();
    state
        .db
        .properties()
        .create(&uuid, user.id, &new_property)
        .await
        .db_err("Failed to create property")?;

    let property = state
        .db
        .properties()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load property")?
        .ok_or_else(|| ApiError::internal("Property not created"))?;

    info!(user = %user.uuid, property = %uuid, "Property created");
    Ok((StatusCode::CREATED, Json(property)))
}
