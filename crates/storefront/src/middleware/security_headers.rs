//! Security headers added to every response.
//!
//! The shop only loads its own assets, HTMX from unpkg and product or news
//! images from any HTTPS host. Everything else is denied.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Content security policy for all pages.
const CONTENT_SECURITY: &str = "default-src 'none'; \
    script-src 'self' https://unpkg.com; \
    style-src 'self'; \
    img-src 'self' https: data:; \
    connect-src 'self'; \
    font-src 'self'; \
    object-src 'none'; \
    frame-src 'none'; \
    frame-ancestors 'none'; \
    base-uri 'self'; \
    form-action 'self'; \
    upgrade-insecure-requests";

/// Browser features the shop never uses.
const PERMISSIONS: &str = "accelerometer=(), autoplay=(), browsing-topics=(), camera=(), \
    display-capture=(), encrypted-media=(), fullscreen=(), geolocation=(), gyroscope=(), \
    hid=(), idle-detection=(), interest-cohort=(), magnetometer=(), microphone=(), midi=(), \
    payment=(), publickey-credentials-get=(), serial=(), usb=(), xr-spatial-tracking=()";

/// Static header values, applied in order.
const HEADERS: [(HeaderName, &str); 9] = [
    (X_FRAME_OPTIONS, "DENY"),
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (REFERRER_POLICY, "no-referrer"),
    (CONTENT_SECURITY_POLICY, CONTENT_SECURITY),
    (HeaderName::from_static("permissions-policy"), PERMISSIONS),
    (HeaderName::from_static("cross-origin-opener-policy"), "same-origin"),
    (HeaderName::from_static("cross-origin-resource-policy"), "same-origin"),
    // Remote images rarely send CORP headers
    (HeaderName::from_static("cross-origin-embedder-policy"), "credentialless"),
    (HeaderName::from_static("x-dns-prefetch-control"), "off"),
];

/// Add the security headers to a response.
///
/// Pages carry the cart, the signed-in shopper and the back office, so they
/// are never cached. Static assets are served by `ServeDir`, which sets its
/// own validators and is left cacheable.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_static = request.uri().path().starts_with("/static/");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    if !is_static {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_headers_are_added() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn(security_headers_middleware));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        let csp = headers.get(CONTENT_SECURITY_POLICY).unwrap().to_str().unwrap();
        assert!(csp.contains("frame-ancestors 'none'"));
        assert!(csp.contains("https://unpkg.com"));
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-store, max-age=0");
    }

    #[tokio::test]
    async fn test_every_table_header_is_sent() {
        let app = Router::new()
            .route("/cart", get(|| async { "ok" }))
            .layer(from_fn(security_headers_middleware));

        let response = app
            .oneshot(Request::builder().uri("/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();

        for (name, value) in HEADERS {
            assert_eq!(response.headers().get(&name).unwrap(), value, "{name}");
        }
        assert_eq!(
            response.headers().get("cross-origin-embedder-policy").unwrap(),
            "credentialless"
        );
    }

    #[tokio::test]
    async fn test_static_assets_stay_cacheable() {
        let app = Router::new()
            .route("/static/css/main.css", get(|| async { "body {}" }))
            .layer(from_fn(security_headers_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/static/css/main.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().get(CACHE_CONTROL).is_none());
        assert!(response.headers().contains_key(X_FRAME_OPTIONS));
    }
}
