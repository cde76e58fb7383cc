use std::net::SocketAddr;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::state::AppState;
use crate::{auth, csv_import, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api",
              Router::new()
                  .merge(auth::router())
                  .merge(users::router())
                  .merge(csv_import::router())
                  .route("/health", get(|| async { "ok" }))
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
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
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_req(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn signed_in(app: &Router) -> String {
        let (status, _) = send(
            app,
            json_req(
                Method::POST,
                "/api/auth/signup",
                None,
                json!({"fullName": "Ana Diaz", "email": "ana@x.com", "password": "Secur3P@ss"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app,
            json_req(
                Method::POST,
                "/api/auth/signin",
                None,
                json!({"email": "ana@x.com", "password": "Secur3P@ss"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(get_req("/api/health", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signed_out_token_is_rejected() {
        let app = build_app(AppState::fake());
        let token = signed_in(&app).await;

        let (status, me) = send(&app, get_req("/api/auth/me", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "ana@x.com");
        assert_eq!(me["role"], "admin");
        assert!(me.get("passwordHash").is_none());

        let (status, body) = send(
            &app,
            json_req(Method::POST, "/api/auth/signout", Some(&token), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = send(&app, get_req("/api/auth/me", Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "token revoked");
    }

    #[tokio::test]
    async fn protected_routes_need_a_bearer_token() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, get_req("/api/csv-uploader", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "no token provided");

        let (status, _) = send(&app, get_req("/api/users", Some("garbage"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_signup_lists_field_errors() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/api/auth/signup",
                None,
                json!({"fullName": "", "email": "nope", "password": "weak"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["fields"]["email"].is_array());
    }

    #[tokio::test]
    async fn partial_upload_is_multi_status() {
        let app = build_app(AppState::fake());
        let token = signed_in(&app).await;

        let boundary = "X-BOUNDARY";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"users.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             name,email,age\nAna,ana@x.com,30\n,bad,-1\n\r\n\
             --{boundary}--\r\n"
        );
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/csv-uploader/upload-file")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::MULTI_STATUS);
        assert_eq!(body["success"].as_array().unwrap().len(), 1);
        assert_eq!(body["errors"][0]["row"], 3);

        let (status, failed) = send(&app, get_req("/api/csv-uploader/errors", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(failed[0]["status"], "partial");
        assert_eq!(failed[0]["totalRows"], 2);
    }

    #[tokio::test]
    async fn upload_without_multipart_body_is_bad_request() {
        let app = build_app(AppState::fake());
        let token = signed_in(&app).await;

        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/api/csv-uploader/upload-file",
                Some(&token),
                json!({"file": "name,email,age"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "CSV file not provided");
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn user_can_be_looked_up_by_email() {
        let app = build_app(AppState::fake());
        let token = signed_in(&app).await;

        let (status, body) = send(&app, get_req("/api/users/email/ana@x.com", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fullName"], "Ana Diaz");
        assert_eq!(body["preferences"]["theme"], "system");

        let (status, body) = send(&app, get_req("/api/users/email/cy@x.com", Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "user not found");
    }
}
