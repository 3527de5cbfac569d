//! Persona CRUD, role-scoped and quota-enforced.
//!
//! A dirigente only ever sees and mutates personas of their own villa; an
//! admin works across villas. Every successful mutation leaves an audit
//! entry; rejected requests leave none.

pub mod rut;
pub mod storage;
pub mod types;

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use self::types::{PersonaListItem, PersonaPayload, PersonaRecord};
use super::{
    audit::{storage as audit, types::AuditAction},
    auth::{principal::require_auth, state::AuthState, types::Rol},
    extract_client_ip,
};
use crate::api::{error::ApiError, token::Claims};

const MSG_SIN_VILLA_DIRIGENTE: &str =
    "No se ha definido una villa asociada al dirigente. Contacte al administrador.";
const MSG_SIN_VILLA: &str = "No se ha definido una villa para esta persona";
const MSG_NOT_FOUND: &str = "Persona no encontrada";
const MSG_SIN_PERMISO_EDITAR: &str = "No tienes permiso para editar esta persona";
const MSG_SIN_PERMISO_ELIMINAR: &str = "No tienes permiso para eliminar esta persona";
const MSG_PAYLOAD: &str = "Datos inválidos";

#[utoipa::path(
    get,
    path = "/api/personas",
    responses(
        (status = 200, description = "Listado según rol", body = [PersonaListItem]),
        (status = 400, description = "Dirigente sin villa asociada"),
        (status = 401, description = "Sin token válido")
    ),
    tag = "personas"
)]
pub async fn list_personas(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let claims = match require_auth(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let result = match claims.rol {
        Rol::Admin => storage::fetch_all(&pool).await,
        Rol::Dirigente => {
            let Some(villa_id) = claims.villa_id else {
                return ApiError::BadRequest(MSG_SIN_VILLA_DIRIGENTE).into_response();
            };
            storage::fetch_for_villa(&pool, villa_id).await
        }
    };

    match result {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => ApiError::Database(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/personas",
    request_body = PersonaPayload,
    responses(
        (status = 201, description = "Persona creada", body = PersonaRecord),
        (status = 400, description = "Datos inválidos o cupo alcanzado"),
        (status = 401, description = "Sin token válido"),
        (status = 409, description = "RUT o correo ya registrado")
    ),
    tag = "personas"
)]
pub async fn create_persona(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PersonaPayload>>,
) -> impl IntoResponse {
    let claims = match require_auth(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let Some(Json(payload)) = payload else {
        return ApiError::BadRequest(MSG_PAYLOAD).into_response();
    };
    let fields = match payload.validate() {
        Ok(fields) => fields,
        Err(errors) => return ApiError::Validation(errors).into_response(),
    };

    // A dirigente is pinned to their own villa; an admin must say which one.
    let villa_id = match claims.rol {
        Rol::Dirigente => claims.villa_id,
        Rol::Admin => payload.villa_id,
    };
    let Some(villa_id) = villa_id else {
        return ApiError::BadRequest(MSG_SIN_VILLA).into_response();
    };

    match storage::insert_persona(&pool, villa_id, &fields).await {
        Ok(persona) => {
            audit::record(
                &pool,
                claims.sub,
                AuditAction::CreatePersona,
                Some(persona.id),
                None,
                serde_json::to_value(&persona).ok(),
                extract_client_ip(&headers),
            )
            .await;
            (StatusCode::CREATED, Json(persona)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/personas/{id}",
    request_body = PersonaPayload,
    params(("id" = Uuid, Path, description = "Persona id")),
    responses(
        (status = 200, description = "Persona actualizada", body = PersonaRecord),
        (status = 400, description = "Datos inválidos o cupo alcanzado"),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Persona de otra villa"),
        (status = 404, description = "Persona no encontrada"),
        (status = 409, description = "RUT o correo ya registrado")
    ),
    tag = "personas"
)]
pub async fn update_persona(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PersonaPayload>>,
) -> impl IntoResponse {
    let claims = match require_auth(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let Some(Json(payload)) = payload else {
        return ApiError::BadRequest(MSG_PAYLOAD).into_response();
    };
    let fields = match payload.validate() {
        Ok(fields) => fields,
        Err(errors) => return ApiError::Validation(errors).into_response(),
    };

    let before = match load_owned(&pool, &claims, id, MSG_SIN_PERMISO_EDITAR).await {
        Ok(before) => before,
        Err(err) => return err.into_response(),
    };

    // Dirigentes keep the persona in their villa; admins may move it, and a
    // move re-checks the target villa's capacity.
    let (villa_id, recheck) = match claims.rol {
        Rol::Dirigente => (before.villa_id, false),
        Rol::Admin => {
            let Some(target) = payload.villa_id else {
                return ApiError::BadRequest(MSG_SIN_VILLA).into_response();
            };
            (target, target != before.villa_id)
        }
    };

    match storage::update_persona(&pool, id, villa_id, recheck, &fields).await {
        Ok(persona) => {
            audit::record(
                &pool,
                claims.sub,
                AuditAction::UpdatePersona,
                Some(persona.id),
                serde_json::to_value(&before).ok(),
                serde_json::to_value(&persona).ok(),
                extract_client_ip(&headers),
            )
            .await;
            Json(persona).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/personas/{id}",
    params(("id" = Uuid, Path, description = "Persona id")),
    responses(
        (status = 200, description = "Persona eliminada"),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Persona de otra villa"),
        (status = 404, description = "Persona no encontrada")
    ),
    tag = "personas"
)]
pub async fn delete_persona(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let claims = match require_auth(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let before = match load_owned(&pool, &claims, id, MSG_SIN_PERMISO_ELIMINAR).await {
        Ok(before) => before,
        Err(err) => return err.into_response(),
    };

    match storage::delete_persona(&pool, id).await {
        Ok(0) => ApiError::NotFound(MSG_NOT_FOUND).into_response(),
        Ok(_) => {
            audit::record(
                &pool,
                claims.sub,
                AuditAction::DeletePersona,
                Some(before.id),
                serde_json::to_value(&before).ok(),
                None,
                extract_client_ip(&headers),
            )
            .await;
            Json(serde_json::json!({ "message": "Persona eliminada" })).into_response()
        }
        Err(err) => ApiError::Database(err).into_response(),
    }
}

/// Load the current row (404 when absent) and enforce the dirigente
/// ownership rule (403 when it belongs to another villa).
async fn load_owned(
    pool: &PgPool,
    claims: &Claims,
    id: Uuid,
    forbidden_message: &'static str,
) -> Result<PersonaRecord, ApiError> {
    let before = storage::fetch_persona(pool, id)
        .await?
        .ok_or(ApiError::NotFound(MSG_NOT_FOUND))?;

    match claims.rol {
        Rol::Admin => Ok(before),
        Rol::Dirigente => {
            if claims.villa_id == Some(before.villa_id) {
                Ok(before)
            } else {
                Err(ApiError::Forbidden(forbidden_message))
            }
        }
    }
}

// Exercised without a database: these paths return before any query runs.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::AuthConfig;
    use crate::api::token::{Claims, sign_hs256};
    use anyhow::Result;
    use axum::http::{HeaderValue, header::AUTHORIZATION};
    use chrono::Utc;
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

    fn bearer(state: &AuthState, rol: Rol, villa_id: Option<Uuid>) -> Result<HeaderMap> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            nombre: "Maria Soto".to_string(),
            email: "maria@example.com".to_string(),
            rol,
            villa_id,
            iat: now,
            exp: now + 3600,
        };
        let token = sign_hs256(state.config().token_secret(), &claims)?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        Ok(headers)
    }

    fn valid_payload() -> PersonaPayload {
        PersonaPayload {
            nombre: "Juan Pérez".to_string(),
            rut: "12.345.678-5".to_string(),
            direccion: None,
            telefono: None,
            correo: None,
            villa_id: None,
        }
    }

    #[tokio::test]
    async fn list_requires_a_token() -> Result<()> {
        let response = list_personas(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn dirigente_without_villa_cannot_list() -> Result<()> {
        let state = auth_state();
        let headers = bearer(&state, Rol::Dirigente, None)?;
        let response = list_personas(headers, Extension(lazy_pool()?), Extension(state))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn create_rejects_invalid_rut_before_touching_storage() -> Result<()> {
        let state = auth_state();
        let headers = bearer(&state, Rol::Dirigente, Some(Uuid::new_v4()))?;
        let payload = PersonaPayload {
            rut: "12345678-6".to_string(),
            ..valid_payload()
        };
        let response = create_persona(
            headers,
            Extension(lazy_pool()?),
            Extension(state),
            Some(Json(payload)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn admin_create_without_villa_is_bad_request() -> Result<()> {
        let state = auth_state();
        let headers = bearer(&state, Rol::Admin, None)?;
        let response = create_persona(
            headers,
            Extension(lazy_pool()?),
            Extension(state),
            Some(Json(valid_payload())),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn create_without_payload_is_bad_request() -> Result<()> {
        let state = auth_state();
        let headers = bearer(&state, Rol::Admin, None)?;
        let response = create_persona(headers, Extension(lazy_pool()?), Extension(state), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
