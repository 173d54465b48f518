use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, bookings, vehicles};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(vehicles::router())
                .merge(bookings::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::{header, Request, StatusCode},
    };
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::build_app;
    use crate::auth::extractors::ADMIN_KEY_HEADER;
    use crate::auth::jwt::JwtKeys;
    use crate::bookings::store::memory::MemoryBookingStore;
    use crate::state::AppState;

    async fn app_with_car() -> (axum::Router, AppState) {
        let store = MemoryBookingStore::new();
        store
            .add_vehicle(1, "Tesla", "Model 3", 2023, Decimal::from_str("85.00").unwrap())
            .await;
        let state = AppState::fake(Arc::new(store));
        (build_app(state.clone()), state)
    }

    fn bearer(state: &AppState, user_id: i64) -> String {
        let token = JwtKeys::from_ref(state).sign_access(user_id).unwrap();
        format!("Bearer {token}")
    }

    fn post_json(uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
        let mut req = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _) = app_with_car().await;
        let res = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn booking_requires_session() {
        let (app, _) = app_with_car().await;
        let body = json!({
            "vehicle_id": 1,
            "start_date": "2024-01-01",
            "end_date": "2024-01-02",
            "total_price": 170
        });
        let res = app.oneshot(post_json("/api/v1/bookings", None, body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_is_not_a_session() {
        let (app, state) = app_with_car().await;
        let refresh = JwtKeys::from_ref(&state).sign_refresh(5).unwrap();
        let res = app
            .oneshot(
                Request::get("/api/v1/bookings")
                    .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_then_conflict_over_http() {
        let (app, state) = app_with_car().await;
        let auth = bearer(&state, 5);
        let body = json!({
            "vehicle_id": 1,
            "start_date": "2024-01-01",
            "end_date": "2024-01-02",
            "total_price": "170.00"
        });

        let res = app
            .clone()
            .oneshot(post_json("/api/v1/bookings", Some(&auth), body.clone()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert!(res.headers().contains_key(header::LOCATION));
        let created = body_json(res).await;
        assert_eq!(created["status"], "CONFIRMED");
        assert_eq!(created["user_id"], 5);
        assert_eq!(created["start_date"], "2024-01-01");

        let res = app
            .oneshot(post_json("/api/v1/bookings", Some(&bearer(&state, 6)), body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(res).await["error"], "conflict");
    }

    #[tokio::test]
    async fn missing_field_reports_field_name() {
        let (app, state) = app_with_car().await;
        let auth = bearer(&state, 5);
        let body = json!({ "vehicle_id": 1, "start_date": "2024-01-01", "total_price": 85 });
        let res = app
            .oneshot(post_json("/api/v1/bookings", Some(&auth), body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err = body_json(res).await;
        assert_eq!(err["error"], "validation_error");
        assert_eq!(err["field"], "end_date");
    }

    #[tokio::test]
    async fn wrongly_typed_body_gets_json_error() {
        let (app, state) = app_with_car().await;
        let auth = bearer(&state, 5);
        for body in [
            json!({
                "vehicle_id": "1",
                "start_date": "2024-01-01",
                "end_date": "2024-01-02",
                "total_price": 170
            }),
            json!({
                "vehicle_id": 1,
                "start_date": "2024-01-01",
                "end_date": "2024-01-02",
                "total_price": "abc"
            }),
        ] {
            let res = app
                .clone()
                .oneshot(post_json("/api/v1/bookings", Some(&auth), body))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            let err = body_json(res).await;
            assert_eq!(err["error"], "validation_error");
            assert_eq!(err["field"], "body");
        }
    }

    #[tokio::test]
    async fn missing_refresh_token_is_a_validation_error() {
        let (app, _) = app_with_car().await;
        let res = app
            .oneshot(post_json("/api/v1/auth/refresh", None, json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["field"], "refresh_token");
    }

    #[tokio::test]
    async fn malformed_path_and_query_get_json_errors() {
        let (app, state) = app_with_car().await;
        let res = app
            .clone()
            .oneshot(
                Request::get("/api/v1/bookings/abc")
                    .header(header::AUTHORIZATION, bearer(&state, 5))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err = body_json(res).await;
        assert_eq!(err["error"], "validation_error");
        assert_eq!(err["field"], "id");

        let res = app
            .oneshot(
                Request::get("/api/v1/admin/bookings?user_id=abc")
                    .header(ADMIN_KEY_HEADER, "admin-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["field"], "query");
    }

    #[tokio::test]
    async fn cancel_twice_is_not_found() {
        let (app, state) = app_with_car().await;
        let auth = bearer(&state, 5);
        let body = json!({
            "vehicle_id": 1,
            "start_date": "2024-02-01",
            "end_date": "2024-02-01",
            "total_price": 85
        });
        let res = app
            .clone()
            .oneshot(post_json("/api/v1/bookings", Some(&auth), body))
            .await
            .unwrap();
        let id = body_json(res).await["id"].as_i64().unwrap();

        let cancel = |auth: String| {
            Request::patch(format!("/api/v1/bookings/{id}/cancel"))
                .header(header::AUTHORIZATION, auth)
                .body(Body::empty())
                .unwrap()
        };
        let res = app.clone().oneshot(cancel(auth.clone())).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "CANCELLED");

        let res = app.oneshot(cancel(auth)).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_listing_needs_key() {
        let (app, _) = app_with_car().await;
        let res = app
            .clone()
            .oneshot(Request::get("/api/v1/admin/bookings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app
            .oneshot(
                Request::get("/api/v1/admin/bookings")
                    .header(ADMIN_KEY_HEADER, "admin-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, json!([]));
    }

    #[tokio::test]
    async fn otp_request_rejects_bad_phone() {
        let (app, _) = app_with_car().await;
        let body = json!({ "phone": "12345", "country_code": "+1" });
        let res = app
            .oneshot(post_json("/api/v1/auth/otp/request", None, body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["field"], "phone");
    }

    #[tokio::test]
    async fn availability_over_http() {
        let (app, _) = app_with_car().await;
        let res = app
            .oneshot(
                Request::get("/api/v1/vehicles/1/availability?start_date=2024-03-01&end_date=2024-03-03")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["available"], true);
        assert_eq!(body["days"], 3);
    }
}
