// 🌐 HTTP API - axum routes over the service layer
//
// Handlers parse nothing themselves: every body goes through the pipeline,
// every response is a declared view, every error goes through `transport`.

use crate::entities::{Account, Order};
use crate::error::EngineError;
use crate::service::{self, WashBook};
use crate::store::{MemoryStore, Store};
use crate::transport::{error_body, status_for};
use crate::views::{render_all, render_value, View};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared application state, built once by the composition root
#[derive(Clone, Default)]
pub struct AppState {
    pub accounts: MemoryStore<Account>,
    pub orders: MemoryStore<Order>,
    pub wash: Arc<RwLock<WashBook>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Engine errors rendered as JSON with the mapped status code
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let EngineError::Schema(detail) = &self.0 {
            tracing::error!(error = %detail, "schema definition error");
        }
        let status =
            StatusCode::from_u16(status_for(&self.0)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(error_body(&self.0))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

/// GET /api/users - Public view of every account
async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    Json(render_all(&state.accounts.all(), View::Public))
}

/// POST /api/users - Register an account
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let account = service::register_account(&state.accounts, &body)?;
    Ok((StatusCode::CREATED, Json(render_value(&account, View::Public))))
}

/// GET /api/users/:id - One account, public view
async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let id = service::parse_account_id(&id)?;
    let account = service::find_account(&state.accounts, &id)?;
    Ok(Json(render_value(&account, View::Public)))
}

/// POST /api/login - Compare credentials against the stored commitment
async fn login(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<impl IntoResponse> {
    let account = service::authenticate(&state.accounts, &body)?;
    Ok(Json(json!({
        "message": "Login successful",
        "user_id": account.id().to_string(),
    })))
}

/// PUT /api/users/:id/password - Copy-on-write password change
async fn update_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let id = service::parse_account_id(&id)?;
    service::change_password(&state.accounts, &id, &body)?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

/// POST /api/orders - Validate and store an order
async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let order = service::submit_order(&state.orders, &body)?;
    Ok((StatusCode::CREATED, Json(render_value(&order, View::Public))))
}

/// GET /api/orders/:id/label - Shipping label, wire view
async fn order_label(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let label = service::shipping_label(&state.orders, &id)?;
    Ok(Json(render_value(&label, View::Wire)))
}

/// POST /api/wash-orders - Validate and record a wash order
async fn create_wash_order(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let order = state
        .wash
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add_order(&body)?;
    Ok((StatusCode::CREATED, Json(render_value(&order, View::Public))))
}

/// GET /api/wash-orders/summary - Order count and revenue
async fn wash_summary(State(state): State<AppState>) -> impl IntoResponse {
    let summary = state
        .wash
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .summary();
    Json(summary)
}

// ============================================================================
// Router
// ============================================================================

/// Every API route, nested under `/api`
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user))
        .route("/users/:id/password", put(update_password))
        .route("/login", post(login))
        .route("/orders", post(create_order))
        .route("/orders/:id/label", get(order_label))
        .route("/wash-orders", post(create_wash_order))
        .route("/wash-orders/summary", get(wash_summary))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn create_test_app() -> Router {
        router(AppState::new())
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_test_app();
        let (status, body) = send(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let app = create_test_app();

        for i in 0..5 {
            let (status, body) = send(
                &app,
                Method::POST,
                "/api/users",
                Some(json!({"name": format!("User {}", i), "email": format!("example{}@arjancodes.com", i), "password": format!("pass{}", i)})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(body["name"], json!(format!("User {}", i)));
            assert!(body.get("password_sha256").is_none());
            assert!(body.get("password").is_none());
        }

        let (status, users) = send(&app, Method::GET, "/api/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users.as_array().unwrap().len(), 5);

        let (_, created) = send(
            &app,
            Method::POST,
            "/api/users",
            Some(json!({"name": "User 5", "email": "example5@arjancodes.com", "password": "secret123"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, user) = send(&app, Method::GET, &format!("/api/users/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["name"], json!("User 5"));

        let (status, body) = send(&app, Method::GET, &format!("/api/users/{}", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], json!("User not found"));

        let (status, _) = send(&app, Method::GET, "/api/users/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_invalid_user_is_422() {
        let app = create_test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users",
            Some(json!({"name": "User 6", "email": "wrong", "password": "abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["path"], json!("email"));

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/users",
            Some(json!({"name": "User 7", "email": "user7@test.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_login_and_password_update() {
        let app = create_test_app();
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/users",
            Some(json!({"name": "User 5", "email": "example5@arjancodes.com", "password": "secret123"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        let login = |password: &str| json!({"email": "example5@arjancodes.com", "password": password});

        let (status, body) = send(&app, Method::POST, "/api/login", Some(login("secret123"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("Login successful"));
        assert_eq!(body["user_id"], json!(id));

        let (status, body) = send(&app, Method::POST, "/api/login", Some(login("wrong"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], json!("Invalid credentials"));

        let uri = format!("/api/users/{}/password", id);
        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({"current_password": "secret123", "new_password": "newsecret456"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("Password updated successfully"));

        let (status, _) = send(&app, Method::POST, "/api/login", Some(login("secret123"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, Method::POST, "/api/login", Some(login("newsecret456"))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({"current_password": "wrong", "new_password": "another"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], json!("Current password is incorrect"));

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/users/{}/password", Uuid::new_v4()),
            Some(json!({"current_password": "a", "new_password": "b"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_orders_and_labels() {
        let app = create_test_app();
        let order = json!({
            "id": "A100",
            "created_at": "2026-02-08T10:30:00",
            "customer": {"name": "  Ana  ", "email": "ANA@EXAMPLE.COM"},
            "coupon": "SAVE10",
            "items": [
                {"sku": "SKU-1", "quantity": 2, "unit_price": "19.90"},
                {"sku": "SKU-2", "quantity": 1, "unit_price": "5.50"},
            ],
        });

        let (status, body) = send(&app, Method::POST, "/api/orders", Some(order.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["total"], json!("45.30"));
        assert!(body["customer"].get("email").is_none());

        let (status, body) = send(&app, Method::POST, "/api/orders", Some(order)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["path"], json!("id"));

        let (status, label) = send(&app, Method::GET, "/api/orders/A100/label", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            label,
            json!({"orderId": "A100", "createdAt": "2026-02-08", "email": "ana@example.com"})
        );

        let (status, _) = send(&app, Method::GET, "/api/orders/B1/label", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wash_orders() {
        let app = create_test_app();
        let vehicle = json!({
            "brand": "toyota",
            "model": "Corolla",
            "color": "white",
            "plate": "aaa1234",
            "owner": {"name": "John Doe", "document": "1234567890"},
        });

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/wash-orders",
            Some(json!({
                "vehicle": vehicle,
                "services": [
                    {"name": "Basic Wash", "price": "10.00"},
                    {"name": "Premium Wash", "price": "25.00"},
                ],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["total_price"], json!("35.00"));
        assert!(body["vehicle"].get("owner").is_none());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/wash-orders",
            Some(json!({"vehicle": vehicle, "services": []})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["message"], json!("at least one service is required"));

        let (status, summary) = send(&app, Method::GET, "/api/wash-orders/summary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["orders"], json!(1));
        assert_eq!(summary["revenue"], json!("35.00"));
    }
}
