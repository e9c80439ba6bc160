//! Shared test harness: in-memory database, fixed signing secrets and a
//! static identity provider, exercised through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use axum::response::Response as AxumResponse;
use propcanvas::db::Database;
use propcanvas::jwt::JwtConfig;
use propcanvas::oauth::StaticIdentityProvider;
use propcanvas::{ServerConfig, create_app};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const TEST_REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";

/// Identity code the static provider accepts in tests.
pub const TEST_IDENTITY_CODE: &str = "test-identity-code";
pub const TEST_IDENTITY_EMAIL: &str = "oauth@example.com";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

/// Build a test app with the default token TTLs.
pub async fn setup() -> TestApp {
    setup_with_ttls(600, 3600).await
}

/// Build a test app with explicit token TTLs. The returned `JwtConfig`
/// shares the app's secrets so tests can mint tokens directly.
pub async fn setup_with_ttls(access_ttl: u64, refresh_ttl: u64) -> TestApp {
    let db = Database::open(":memory:").await.unwrap();
    let identity =
        StaticIdentityProvider::new().with_code(TEST_IDENTITY_CODE, TEST_IDENTITY_EMAIL, "OAuth User");

    let config = ServerConfig {
        db: db.clone(),
        access_secret: TEST_ACCESS_SECRET.to_vec(),
        refresh_secret: TEST_REFRESH_SECRET.to_vec(),
        access_ttl_secs: access_ttl,
        refresh_ttl_secs: refresh_ttl,
        secure_cookies: false,
        identity: Arc::new(identity),
    };
    let app = create_app(&config);
    let jwt = JwtConfig::with_ttls(
        TEST_ACCESS_SECRET,
        TEST_REFRESH_SECRET,
        access_ttl,
        refresh_ttl,
    );

    TestApp { app, db, jwt }
}

impl TestApp {
    /// Send a JSON POST, optionally with a Cookie header.
    pub async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
        cookies: Option<&str>,
    ) -> AxumResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Send a GET, optionally with a Cookie header.
    pub async fn get(&self, path: &str, cookies: Option<&str>) -> AxumResponse {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        let request = builder.body(Body::empty()).unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Send a PUT with a JSON body, optionally with a Cookie header.
    pub async fn put_json(
        &self,
        path: &str,
        body: serde_json::Value,
        cookies: Option<&str>,
    ) -> AxumResponse {
        let mut builder = Request::builder()
            .method("PUT")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Register a user and return the (access, refresh) cookie pair.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> (String, String) {
        let response = self
            .post_json(
                "/api/users/register",
                serde_json::json!({ "name": name, "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(response.status(), 201, "registration failed");
        session_cookies(&response)
    }

    /// Promote a user to admin directly in the store.
    pub async fn make_admin(&self, email: &str) {
        let user = self.db.users().get_by_email(email).await.unwrap().unwrap();
        self.db
            .users()
            .set_role(&user.uuid, propcanvas::db::UserRole::Admin)
            .await
            .unwrap();
    }
}

/// Read the response body as JSON.
pub async fn body_json(response: AxumResponse) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All Set-Cookie header values on a response.
pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Find a Set-Cookie value by cookie name, returning only `value` from
/// `name=value; attrs`.
pub fn cookie_value<B>(response: &Response<B>, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let (pair, _) = cookie.split_once(';').unwrap_or((&cookie, ""));
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Extract the access and refresh cookie values from a session response.
pub fn session_cookies<B>(response: &Response<B>) -> (String, String) {
    let access = cookie_value(response, "accessToken").expect("no access cookie");
    let refresh = cookie_value(response, "refreshToken").expect("no refresh cookie");
    (access, refresh)
}
