//! `POST /api/auth/login`.

use axum::{Json, extract::Extension, http::HeaderMap, response::IntoResponse};
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::{
    bruteforce::{BruteForceGuard, Decision},
    password::verify_password,
    state::AuthState,
    types::{LoginRequest, LoginResponse, Rol, UserPublic},
};
use crate::api::{
    error::ApiError,
    handlers::extract_client_ip,
    token::{Claims, sign_hs256},
};

const MSG_BLOCKED: &str = "Demasiados intentos fallidos. Intente nuevamente más tarde.";
const MSG_MISSING_FIELDS: &str = "Email y contraseña son requeridos";
const MSG_BAD_CREDENTIALS: &str = "Credenciales inválidas";
const MSG_INACTIVE: &str = "El usuario se encuentra inactivo";

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login correcto", body = LoginResponse),
        (status = 400, description = "Faltan credenciales"),
        (status = 401, description = "Credenciales inválidas"),
        (status = 403, description = "Usuario inactivo"),
        (status = 429, description = "Demasiados intentos fallidos")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let client_ip = extract_client_ip(&headers);
    let (email, password) = match payload {
        Some(Json(request)) => (request.email, request.password),
        None => (String::new(), String::new()),
    };

    // One record per identifier: the email when present, the caller's IP
    // otherwise. Blocked identifiers are rejected before any credential
    // verification happens.
    let identifier = BruteForceGuard::identifier(&email, client_ip.as_deref());
    let guard = auth_state.guard();
    if guard.check(&identifier).await == Decision::Blocked {
        return ApiError::RateLimited(MSG_BLOCKED).into_response();
    }

    if email.trim().is_empty() || password.is_empty() {
        // An empty submission still counts against the identifier.
        guard.register_failure(&identifier).await;
        return ApiError::BadRequest(MSG_MISSING_FIELDS).into_response();
    }

    // Exact, case-sensitive lookup; stored emails are normalized on create.
    let row = match sqlx::query(
        r"
        SELECT id, nombre, email, password_hash, rol, villa_id, activo
        FROM users
        WHERE email = $1
        LIMIT 1
        ",
    )
    .bind(&email)
    .fetch_optional(&*pool)
    .await
    {
        Ok(row) => row,
        Err(err) => {
            error!("Login lookup failed: {err}");
            return ApiError::Database(err).into_response();
        }
    };

    let Some(row) = row else {
        guard.register_failure(&identifier).await;
        return ApiError::Unauthorized(MSG_BAD_CREDENTIALS).into_response();
    };

    let activo: bool = row.get("activo");
    if !activo {
        guard.register_failure(&identifier).await;
        return ApiError::Forbidden(MSG_INACTIVE).into_response();
    }

    let stored_hash: String = row.get("password_hash");
    if !verify_password(&password, &stored_hash) {
        guard.register_failure(&identifier).await;
        return ApiError::Unauthorized(MSG_BAD_CREDENTIALS).into_response();
    }

    let rol: String = row.get("rol");
    let Some(rol) = Rol::parse(&rol) else {
        return ApiError::Internal("user row carries an unknown role").into_response();
    };

    let user = UserPublic {
        id: row.get::<Uuid, _>("id"),
        nombre: row.get("nombre"),
        email: row.get("email"),
        rol,
        villa_id: row.get::<Option<Uuid>, _>("villa_id"),
    };

    // Successful login wipes the attempt record entirely.
    guard.clear(&identifier).await;

    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        nombre: user.nombre.clone(),
        email: user.email.clone(),
        rol: user.rol,
        villa_id: user.villa_id,
        iat: now,
        exp: now + auth_state.config().token_ttl_seconds(),
    };

    match sign_hs256(auth_state.config().token_secret(), &claims) {
        Ok(token) => Json(LoginResponse { token, user }).into_response(),
        Err(err) => {
            error!("Failed to sign session token: {err}");
            ApiError::Internal("token signing failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::AuthConfig;
    use anyhow::Result;
    use axum::http::StatusCode;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    fn auth_state() -> Arc<AuthState> {
        Arc::new(AuthState::new(AuthConfig::new(SecretString::from(
            "secreto-de-prueba",
        ))))
    }

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    #[tokio::test]
    async fn missing_payload_is_bad_request() -> Result<()> {
        let response = login(HeaderMap::new(), Extension(lazy_pool()?), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn empty_fields_are_bad_request() -> Result<()> {
        let state = auth_state();
        let payload = Json(LoginRequest {
            email: "  ".to_string(),
            password: String::new(),
        });
        let response = login(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(state),
            Some(payload),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn repeated_empty_submissions_get_rate_limited() -> Result<()> {
        let state = auth_state();
        let pool = lazy_pool()?;

        // Five counted failures against the fallback identifier, then 429
        // before any credential (or database) work on the sixth.
        for _ in 0..5 {
            let payload = Json(LoginRequest {
                email: String::new(),
                password: String::new(),
            });
            let response = login(
                HeaderMap::new(),
                Extension(pool.clone()),
                Extension(state.clone()),
                Some(payload),
            )
            .await
            .into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let payload = Json(LoginRequest {
            email: String::new(),
            password: String::new(),
        });
        let response = login(
            HeaderMap::new(),
            Extension(pool),
            Extension(state),
            Some(payload),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        Ok(())
    }
}
