//! Route registration: module routes plus the process-wide middleware stack.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use tracing::info;

use crate::catch_all;
use crate::rate_limit::{self, RateLimiter};
use crate::security;

/// Build the complete router.
///
/// Requests pass through, outermost first: security headers → CORS →
/// catch-all → rate limit → module routes. The header layers sit outside the
/// catch-all so the generic 500 it builds still carries them.
pub fn build_router(module_routes: Vec<(&str, Router)>, limiter: Arc<RateLimiter>) -> Router {
    let mut app = Router::new();
    for (name, router) in module_routes {
        info!("Mounted {} module routes", name);
        app = app.merge(router);
    }

    app.fallback(catch_all::not_found)
        .layer(middleware::from_fn_with_state(limiter, rate_limit::rate_limit))
        .layer(middleware::from_fn(catch_all::catch_all))
        .layer(middleware::from_fn(security::cors))
        .layer(middleware::from_fn(security::security_headers))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use stash_core::{JwtAuthenticator, Module, RateLimitConfig, ServiceConfig};
    use stash_kv::KVStore;
    use submit::SubmitModule;
    use tower::ServiceExt;

    use super::*;

    const SECRET: &str = "routes-test-secret";

    struct App {
        router: Router,
        module: SubmitModule,
        _dir: tempfile::TempDir,
    }

    fn app(max_requests: u32) -> App {
        let dir = tempfile::tempdir().unwrap();
        let kv: Arc<dyn KVStore> =
            Arc::new(stash_kv::RedbStore::open(&dir.path().join("app.redb")).unwrap());
        let config = ServiceConfig {
            jwt_secret: SECRET.into(),
            hash_secrets: false,
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(900),
                max_requests,
            },
            ..Default::default()
        };
        let module = SubmitModule::new(kv, Arc::new(JwtAuthenticator::new(SECRET)), &config);

        let panicking = Router::new().route("/boom", get(boom));
        let router = build_router(
            vec![(module.name(), module.routes()), ("boom", panicking)],
            Arc::new(RateLimiter::new(config.rate_limit)),
        );
        App {
            router,
            module,
            _dir: dir,
        }
    }

    async fn boom() -> &'static str {
        panic!("secret internal detail")
    }

    fn from(addr: &str, mut req: Request<Body>) -> Request<Body> {
        let addr: SocketAddr = addr.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    fn get_root() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    async fn call(router: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn welcome_carries_security_and_cors_headers() {
        let app = app(100);
        let (status, headers, body) = call(&app.router, from("10.0.0.1:5000", get_root())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Welcome to the API!");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers["x-ratelimit-limit"], "100");
        assert_eq!(headers["x-ratelimit-remaining"], "99");
    }

    #[tokio::test]
    async fn preflight_is_answered_without_counting() {
        let app = app(1);
        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/send")
            .header(header::ORIGIN, "https://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = call(&app.router, from("10.0.0.2:5000", preflight)).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "authorization,content-type");
        assert_eq!(headers["x-frame-options"], "DENY");

        let (status, _, _) = call(&app.router, from("10.0.0.2:5000", get_root())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn quota_exhaustion_returns_429_per_address() {
        let app = app(2);
        for _ in 0..2 {
            let (status, _, _) = call(&app.router, from("10.0.0.3:1", get_root())).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, headers, body) = call(&app.router, from("10.0.0.3:2", get_root())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, "Too many requests, please try again later.");
        assert!(headers.contains_key(header::RETRY_AFTER));
        assert_eq!(headers["x-content-type-options"], "nosniff");

        // A different address still has its own quota.
        let (status, _, _) = call(&app.router, from("10.0.0.4:1", get_root())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn limited_submission_creates_nothing() {
        let app = app(1);
        let token = JwtAuthenticator::new(SECRET)
            .issue("tester", Duration::from_secs(60))
            .unwrap();
        let send = || {
            Request::builder()
                .method("POST")
                .uri("/send")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(r#"{"ids":"u1","password":"p1","cookie":"c1"}"#))
                .unwrap()
        };

        let (status, _, body) = call(&app.router, from("10.0.0.5:1", send())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Data saved successfully!");

        let (status, _, _) = call(&app.router, from("10.0.0.5:1", send())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(app.module.records().count().unwrap(), 1);

        let records = app.module.records().list().unwrap();
        assert_eq!(records[0].ids, "u1");
        assert_eq!(records[0].password, "p1");
        assert_eq!(records[0].cookie, "c1");
    }

    #[tokio::test]
    async fn unknown_route_is_404_json() {
        let app = app(100);
        let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let (status, _, body) = call(&app.router, from("10.0.0.6:1", req)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn panics_become_generic_500() {
        let app = app(100);
        let req = Request::builder().uri("/boom").body(Body::empty()).unwrap();
        let (status, headers, body) = call(&app.router, from("10.0.0.7:1", req)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("secret internal detail"));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["code"], "INTERNAL");
        assert_eq!(json["message"], "internal server error");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn requests_without_peer_address_share_one_bucket() {
        let app = app(1);
        let (status, _, _) = call(&app.router, get_root()).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = call(&app.router, get_root()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}
