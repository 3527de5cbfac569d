//! Authenticated principal extraction and role guards.
//!
//! Flow Overview: read the bearer token from the `Authorization` header,
//! verify its signature and expiry offline, and hand the decoded claims to
//! the handler. No database round-trip is involved; the token is the whole
//! session.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use chrono::Utc;

use super::state::AuthState;
use crate::api::{
    error::ApiError,
    token::{self, Claims},
};

pub(crate) const MSG_NO_TOKEN: &str =
    "No se encontró token de autenticación. Inicie sesión nuevamente.";
pub(crate) const MSG_EXPIRED: &str = "La sesión ha expirado. Inicie sesión nuevamente.";
pub(crate) const MSG_INVALID: &str = "Token inválido. Inicie sesión nuevamente.";
pub(crate) const MSG_ADMIN_ONLY: &str = "No tiene permisos para acceder a este recurso.";
pub(crate) const MSG_DIRIGENTE_ONLY: &str = "Solo los dirigentes pueden realizar esta acción.";

/// Resolve the bearer token into claims, or fail with 401.
///
/// Expired tokens get their own message so the client can prompt for a new
/// login instead of treating the session as corrupt.
pub fn require_auth(headers: &HeaderMap, auth_state: &AuthState) -> Result<Claims, ApiError> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err(ApiError::Unauthorized(MSG_NO_TOKEN));
    };

    match token::verify_hs256(
        &token,
        auth_state.config().token_secret(),
        Utc::now().timestamp(),
    ) {
        Ok(claims) => Ok(claims),
        Err(token::Error::Expired) => Err(ApiError::Unauthorized(MSG_EXPIRED)),
        Err(err) => {
            tracing::debug!("Token verification failed: {err}");
            Err(ApiError::Unauthorized(MSG_INVALID))
        }
    }
}

/// 403 unless the caller is an admin.
pub fn admin_only(claims: &Claims) -> Result<(), ApiError> {
    match claims.rol {
        super::types::Rol::Admin => Ok(()),
        super::types::Rol::Dirigente => Err(ApiError::Forbidden(MSG_ADMIN_ONLY)),
    }
}

/// 403 unless the caller is a dirigente.
pub fn dirigente_only(claims: &Claims) -> Result<(), ApiError> {
    match claims.rol {
        super::types::Rol::Dirigente => Ok(()),
        super::types::Rol::Admin => Err(ApiError::Forbidden(MSG_DIRIGENTE_ONLY)),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::{state::AuthConfig, types::Rol};
    use crate::api::token::{Claims, sign_hs256};
    use axum::http::HeaderValue;
    use secrecy::SecretString;
    use uuid::Uuid;

    fn auth_state() -> AuthState {
        AuthState::new(AuthConfig::new(SecretString::from("secreto-de-prueba")))
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    fn signed_claims(state: &AuthState, rol: Rol, exp_offset: i64) -> (Claims, String) {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            nombre: "Maria Soto".to_string(),
            email: "maria@example.com".to_string(),
            rol,
            villa_id: match rol {
                Rol::Dirigente => Some(Uuid::new_v4()),
                Rol::Admin => None,
            },
            iat: now,
            exp: now + exp_offset,
        };
        let token = sign_hs256(state.config().token_secret(), &claims).unwrap_or_default();
        (claims, token)
    }

    #[test]
    fn missing_token_is_unauthorized() {
        let state = auth_state();
        let result = require_auth(&HeaderMap::new(), &state);
        assert!(matches!(
            result,
            Err(ApiError::Unauthorized(msg)) if msg == MSG_NO_TOKEN
        ));
    }

    #[test]
    fn valid_token_yields_claims() {
        let state = auth_state();
        let (claims, token) = signed_claims(&state, Rol::Admin, 3600);
        let verified = require_auth(&bearer_headers(&token), &state);
        assert!(matches!(verified, Ok(ref c) if c.sub == claims.sub));
    }

    #[test]
    fn expired_token_gets_its_own_message() {
        let state = auth_state();
        let (_, token) = signed_claims(&state, Rol::Admin, -10);
        let result = require_auth(&bearer_headers(&token), &state);
        assert!(matches!(
            result,
            Err(ApiError::Unauthorized(msg)) if msg == MSG_EXPIRED
        ));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let state = auth_state();
        let result = require_auth(&bearer_headers("no-es-un-token"), &state);
        assert!(matches!(
            result,
            Err(ApiError::Unauthorized(msg)) if msg == MSG_INVALID
        ));
    }

    #[test]
    fn role_guards_match_exhaustively() {
        let state = auth_state();
        let (admin, _) = signed_claims(&state, Rol::Admin, 3600);
        let (dirigente, _) = signed_claims(&state, Rol::Dirigente, 3600);

        assert!(admin_only(&admin).is_ok());
        assert!(matches!(
            admin_only(&dirigente),
            Err(ApiError::Forbidden(_))
        ));
        assert!(dirigente_only(&dirigente).is_ok());
        assert!(matches!(
            dirigente_only(&admin),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn bearer_extraction_handles_casing_and_blanks() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert_eq!(extract_bearer_token(&headers), Some("abc".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
