//! HTTP API surface.

mod categories;
mod error;
mod properties;
mod users;

use axum::Router;
use std::sync::Arc;

pub use categories::CategoriesState;
pub use error::{ApiError, ResultExt};
pub use properties::PropertiesState;
pub use users::UsersState;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::oauth::IdentityProvider;

/// Build the `/api` router with all endpoint groups.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    identity: Arc<dyn IdentityProvider>,
    secure_cookies: bool,
) -> Router {
    let users = users::router(UsersState {
        db: db.clone(),
        jwt: jwt.clone(),
        identity,
        secure_cookies,
    });
    let categories = categories::router(CategoriesState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
    });
    let properties = properties::router(PropertiesState {
        db,
        jwt,
        secure_cookies,
    });

    Router::new()
        .nest("/users", users)
        .nest("/categories", categories)
        .nest("/properties", properties)
}
