pub mod auth;
mod doctors;
pub mod error;
mod forms;
mod reviews;
mod validation;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Account routes (public; /me and /logout resolve their own session)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    // Clinic routes; the form endpoints authenticate via session token
    let api_routes = Router::new()
        .route("/doctors", get(doctors::list_doctors))
        .route("/forms", get(forms::list_forms))
        .route("/forms", post(forms::submit_form))
        .route("/reviews", get(reviews::list_reviews))
        .route("/reviews", post(reviews::create_review));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http());

    if let Some(origin) = &state.config.server.cors_origin {
        if let Some(cors) = cors_layer(origin) {
            router = router.layer(cors);
        }
    }

    router.with_state(state)
}

/// CORS for a configured front-end origin. Credentialed requests need an
/// exact origin, never a wildcard.
fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match origin.parse::<HeaderValue>() {
        Ok(value) => value,
        Err(_) => {
            warn!("Ignoring malformed cors_origin {:?}", origin);
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password;
    use crate::config::Config;
    use crate::db::{self, User};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn test_state() -> Arc<AppState> {
        let pool = db::init_memory().await.unwrap();
        Arc::new(AppState::new(Config::default(), pool))
    }

    async fn test_app() -> (Arc<AppState>, Router) {
        let state = test_state().await;
        let app = create_router(state.clone());
        (state, app)
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    async fn register_user(app: &Router, username: &str, display_name: &str) {
        let response = send(
            app,
            post_json(
                "/api/auth/register",
                json!({
                    "username": username,
                    "display_name": display_name,
                    "password": format!("{} password", username),
                }),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    async fn login_token(app: &Router, username: &str) -> String {
        let response = send(
            app,
            post_json(
                "/api/auth/login",
                json!({
                    "username": username,
                    "password": format!("{} password", username),
                }),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        body["token"].as_str().unwrap().to_string()
    }

    async fn submit_form(app: &Router, token: &str, patient: &str, doctor: &str, answers: Value) {
        let response = send(
            app,
            post_json(
                "/api/forms",
                json!({
                    "patient_name": patient,
                    "doctor_name": doctor,
                    "answers": answers,
                }),
                Some(token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_state, app) = test_app().await;

        let response = send(&app, get_request("/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"OK");
    }

    #[tokio::test]
    async fn test_register_login_me_flow() {
        let (_state, app) = test_app().await;

        let response = send(
            &app,
            post_json(
                "/api/auth/register",
                json!({
                    "username": "alice",
                    "display_name": "Alice Ivanova",
                    "password": "alice password",
                }),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["username"], "alice");
        assert_eq!(body["display_name"], "Alice Ivanova");
        assert_eq!(body["is_doctor"], false);
        // The stored hash never leaves the server
        assert!(body.get("password_hash").is_none());

        let response = send(
            &app,
            post_json(
                "/api/auth/login",
                json!({ "username": "alice", "password": "alice password" }),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("triagr_session="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Path=/"));
        // Default TTL is 24 hours
        assert!(set_cookie.contains("Max-Age=86400"));

        let body = body_json(response).await;
        let token = body["token"].as_str().unwrap();
        assert_eq!(body["user"]["username"], "alice");

        let response = send(&app, get_request("/api/auth/me", Some(token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "alice");
        assert_eq!(body["is_doctor"], false);
    }

    #[tokio::test]
    async fn test_me_accepts_the_session_cookie() {
        let (_state, app) = test_app().await;
        register_user(&app, "alice", "Alice Ivanova").await;

        let response = send(
            &app,
            post_json(
                "/api/auth/login",
                json!({ "username": "alice", "password": "alice password" }),
                None,
            ),
        )
        .await;
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        // Send back exactly the pair the server issued
        let pair = set_cookie.split(';').next().unwrap().to_string();

        let request = Request::builder()
            .uri("/api/auth/me")
            .header(header::COOKIE, pair)
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "alice");
    }

    #[tokio::test]
    async fn test_me_without_session_is_unauthorized() {
        let (_state, app) = test_app().await;

        let response = send(&app, get_request("/api/auth/me", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "unauthorized");

        let response = send(&app, get_request("/api/auth/me", Some("never-issued"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (_state, app) = test_app().await;
        register_user(&app, "alice", "Alice Ivanova").await;

        let wrong_password = send(
            &app,
            post_json(
                "/api/auth/login",
                json!({ "username": "alice", "password": "not her password" }),
                None,
            ),
        )
        .await;
        let unknown_user = send(
            &app,
            post_json(
                "/api/auth/login",
                json!({ "username": "nobody", "password": "not a password" }),
                None,
            ),
        )
        .await;

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
        // Byte-identical bodies: the response must not leak which check failed
        assert_eq!(
            body_bytes(wrong_password).await,
            body_bytes(unknown_user).await
        );
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let (_state, app) = test_app().await;
        register_user(&app, "alice", "Alice Ivanova").await;

        let response = send(
            &app,
            post_json(
                "/api/auth/register",
                json!({
                    "username": "alice",
                    "display_name": "Another Alice",
                    "password": "another password",
                }),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn test_register_validates_input_shape() {
        let (_state, app) = test_app().await;

        let response = send(
            &app,
            post_json(
                "/api/auth/register",
                json!({
                    "username": "x!",
                    "display_name": "Okay Name",
                    "password": "short",
                }),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        let details = &body["error"]["details"];
        assert!(details.get("username").is_some());
        assert!(details.get("password").is_some());
        assert!(details.get("display_name").is_none());
    }

    #[tokio::test]
    async fn test_logout_revokes_and_is_idempotent() {
        let (_state, app) = test_app().await;
        register_user(&app, "alice", "Alice Ivanova").await;
        let token = login_token(&app, "alice").await;

        let response = send(
            &app,
            post_json("/api/auth/logout", json!({}), Some(&token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with("triagr_session="));
        assert!(set_cookie.contains("Max-Age=0"));

        // The token is dead from here on
        let response = send(&app, get_request("/api/auth/me", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Logging out again, or with no session at all, still succeeds
        let response = send(
            &app,
            post_json("/api/auth/logout", json!({}), Some(&token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&app, post_json("/api/auth/logout", json!({}), None)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_submit_form_returns_stored_record() {
        let (_state, app) = test_app().await;
        register_user(&app, "alice", "Alice Ivanova").await;
        let token = login_token(&app, "alice").await;

        let response = send(
            &app,
            post_json(
                "/api/forms",
                json!({
                    "patient_name": "Alice Ivanova",
                    "doctor_name": "Dr. Marina Volkova",
                    "answers": [
                        { "question_id": "fever", "value": "yes" },
                        { "question_id": "cough", "value": "yes" },
                    ],
                }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["diagnosis"], "flu");
        assert_eq!(body["doctor_name"], "Dr. Marina Volkova");
        assert_eq!(body["answers"].as_array().unwrap().len(), 2);
        assert!(body["id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_submit_form_empty_answers_is_validation_error() {
        let (_state, app) = test_app().await;
        register_user(&app, "alice", "Alice Ivanova").await;
        let token = login_token(&app, "alice").await;

        let response = send(
            &app,
            post_json(
                "/api/forms",
                json!({
                    "patient_name": "Alice Ivanova",
                    "doctor_name": "Dr. Marina Volkova",
                    "answers": [],
                }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert!(body["error"]["details"].get("answers").is_some());

        // Nothing was stored
        let response = send(&app, get_request("/api/forms", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_submit_form_requires_session() {
        let (_state, app) = test_app().await;

        let form = json!({
            "patient_name": "Ghost",
            "doctor_name": "Dr. Marina Volkova",
            "answers": [{ "question_id": "fever", "value": "yes" }],
        });

        let response = send(&app, post_json("/api/forms", form.clone(), None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&app, post_json("/api/forms", form, Some("never-issued"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_form_listing_is_scoped() {
        let (state, app) = test_app().await;

        // Doctor account whose display name matches a directory entry
        User::create(
            &state.db,
            "drvolkova",
            "Dr. Marina Volkova",
            &password::hash_password("drvolkova password").unwrap(),
            true,
        )
        .await
        .unwrap();
        let doctor_token = login_token(&app, "drvolkova").await;

        register_user(&app, "alice", "Alice Ivanova").await;
        register_user(&app, "bob", "Bob Petrov").await;
        let alice = login_token(&app, "alice").await;
        let bob = login_token(&app, "bob").await;

        submit_form(
            &app,
            &alice,
            "Alice Ivanova",
            "Dr. Marina Volkova",
            json!([{ "question_id": "fever", "value": "yes" }]),
        )
        .await;
        submit_form(
            &app,
            &alice,
            "Alice Ivanova",
            "Dr. Sergei Orlov",
            json!([{ "question_id": "cough", "value": "yes" }]),
        )
        .await;
        submit_form(
            &app,
            &bob,
            "Bob Petrov",
            "Dr. Marina Volkova",
            json!([{ "question_id": "rash", "value": "yes" }]),
        )
        .await;

        // The doctor sees every form addressed to them, whoever submitted it
        let response = send(&app, get_request("/api/forms", Some(&doctor_token))).await;
        let body = body_json(response).await;
        let forms = body.as_array().unwrap();
        assert_eq!(forms.len(), 2);
        assert!(forms
            .iter()
            .all(|f| f["doctor_name"] == "Dr. Marina Volkova"));

        // Patients see only their own submissions
        let response = send(&app, get_request("/api/forms", Some(&alice))).await;
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

        let response = send(&app, get_request("/api/forms", Some(&bob))).await;
        let body = body_json(response).await;
        let forms = body.as_array().unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0]["diagnosis"], "allergy");
    }

    #[tokio::test]
    async fn test_doctors_directory_is_public() {
        let (state, app) = test_app().await;

        let response = send(&app, get_request("/api/doctors", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let doctors = body.as_array().unwrap();
        assert_eq!(doctors.len(), 6);
        // All seeded at zero likes, so alphabetical order
        assert_eq!(doctors[0]["name"], "Dr. Andrei Sokolov");

        sqlx::query("UPDATE doctors SET likes = 5 WHERE id = 'dr-orlov'")
            .execute(&state.db)
            .await
            .unwrap();

        let response = send(&app, get_request("/api/doctors", None)).await;
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap()[0]["name"], "Dr. Sergei Orlov");
    }

    #[tokio::test]
    async fn test_reviews_wall_flow() {
        let (_state, app) = test_app().await;

        let response = send(&app, get_request("/api/reviews", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);

        register_user(&app, "alice", "Alice Ivanova").await;
        let token = login_token(&app, "alice").await;

        // A spoofed reviewer field is ignored; identity comes from the session
        let response = send(
            &app,
            post_json(
                "/api/reviews",
                json!({ "body": "Got seen the same day.", "reviewer": "Dr. Fake" }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["reviewer"], "Alice Ivanova");
        assert_eq!(body["body"], "Got seen the same day.");

        let response = send(&app, get_request("/api/reviews", None)).await;
        let body = body_json(response).await;
        let reviews = body.as_array().unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0]["reviewer"], "Alice Ivanova");

        // Posting requires a session
        let response = send(
            &app,
            post_json("/api/reviews", json!({ "body": "drive-by" }), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_review_body_is_validated() {
        let (_state, app) = test_app().await;
        register_user(&app, "alice", "Alice Ivanova").await;
        let token = login_token(&app, "alice").await;

        let response = send(
            &app,
            post_json("/api/reviews", json!({ "body": "   " }), Some(&token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert!(body["error"]["details"].get("body").is_some());
    }

    #[tokio::test]
    async fn test_unknown_api_route_is_404() {
        let (_state, app) = test_app().await;

        let response = send(&app, get_request("/api/nope", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let pool = db::init_memory().await.unwrap();
        let mut config = Config::default();
        config.server.cors_origin = Some("http://localhost:3000".to_string());
        let app = create_router(Arc::new(AppState::new(config, pool)));

        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );

        // Without the config option no CORS headers are emitted
        let (_state, plain) = test_app().await;
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = send(&plain, request).await;
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
