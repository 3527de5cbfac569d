use axum::{
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde_json::json;

// axum handler for health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up")
    ),
    tag = "health"
)]
pub async fn health() -> impl IntoResponse {
    let body = Json(json!({
        "ok": true,
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }));

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!("{}:{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")).parse() {
        headers.insert("X-App", value);
    }

    (headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn health_is_ok_and_stamped() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));
    }
}
