//! User management, ADMIN only. Users are never hard-deleted; DELETE
//! deactivates.

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
use tracing::error;
use uuid::Uuid;

use self::types::{UserListItem, UserPayload, UserRecord};
use super::{
    audit::{storage as audit, types::AuditAction},
    auth::{
        password::hash_password,
        principal::{admin_only, require_auth},
        state::AuthState,
        types::Rol,
    },
    extract_client_ip,
};
use crate::api::{error::ApiError, token::Claims};

const MSG_NOT_FOUND: &str = "Usuario no encontrado";
const MSG_VILLA_REQUERIDA: &str = "villa_id es requerido para DIRIGENTE";
const MSG_YA_INACTIVO: &str = "El usuario ya se encuentra inactivo";
const MSG_PAYLOAD: &str = "Datos inválidos";

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Usuarios activos", body = [UserListItem]),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Solo ADMIN")
    ),
    tag = "users"
)]
pub async fn list_users(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(err) = require_admin(&headers, &auth_state) {
        return err.into_response();
    }

    match storage::fetch_active(&pool).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => ApiError::Database(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserPayload,
    responses(
        (status = 201, description = "Usuario creado", body = UserRecord),
        (status = 400, description = "Datos inválidos"),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Solo ADMIN"),
        (status = 409, description = "Email ya está en uso")
    ),
    tag = "users"
)]
pub async fn create_user(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UserPayload>>,
) -> impl IntoResponse {
    let claims = match require_admin(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let Some(Json(payload)) = payload else {
        return ApiError::BadRequest(MSG_PAYLOAD).into_response();
    };
    let fields = match payload.validate(true) {
        Ok(fields) => fields,
        Err(errors) => return ApiError::Validation(errors).into_response(),
    };
    if fields.rol == Rol::Dirigente && fields.villa_id.is_none() {
        return ApiError::BadRequest(MSG_VILLA_REQUERIDA).into_response();
    }

    // validate(true) guarantees a password is present.
    let Some(password) = fields.password.as_deref() else {
        return ApiError::BadRequest(MSG_PAYLOAD).into_response();
    };
    let password_hash = match hash_password(password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return ApiError::Internal("password hashing failed").into_response();
        }
    };

    match storage::insert_user(&pool, &fields, &password_hash).await {
        Ok(user) => {
            audit::record(
                &pool,
                claims.sub,
                AuditAction::CreateUser,
                Some(user.id),
                None,
                serde_json::to_value(&user).ok(),
                extract_client_ip(&headers),
            )
            .await;
            (StatusCode::CREATED, Json(user)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    request_body = UserPayload,
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Usuario actualizado", body = UserRecord),
        (status = 400, description = "Datos inválidos"),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Solo ADMIN"),
        (status = 404, description = "Usuario no encontrado"),
        (status = 409, description = "Email ya está en uso")
    ),
    tag = "users"
)]
pub async fn update_user(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UserPayload>>,
) -> impl IntoResponse {
    let claims = match require_admin(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let Some(Json(payload)) = payload else {
        return ApiError::BadRequest(MSG_PAYLOAD).into_response();
    };
    let fields = match payload.validate(false) {
        Ok(fields) => fields,
        Err(errors) => return ApiError::Validation(errors).into_response(),
    };
    if fields.rol == Rol::Dirigente && fields.villa_id.is_none() {
        return ApiError::BadRequest(MSG_VILLA_REQUERIDA).into_response();
    }

    let before = match storage::fetch_user(&pool, id).await {
        Ok(Some(before)) => before,
        Ok(None) => return ApiError::NotFound(MSG_NOT_FOUND).into_response(),
        Err(err) => return ApiError::Database(err).into_response(),
    };

    // Only re-hash when a replacement password was supplied.
    let password_hash = match fields.password.as_deref() {
        Some(password) => match hash_password(password) {
            Ok(hash) => Some(hash),
            Err(err) => {
                error!("Failed to hash password: {err}");
                return ApiError::Internal("password hashing failed").into_response();
            }
        },
        None => None,
    };

    match storage::update_user(&pool, id, &fields, password_hash.as_deref()).await {
        Ok(user) => {
            audit::record(
                &pool,
                claims.sub,
                AuditAction::UpdateUser,
                Some(user.id),
                serde_json::to_value(&before).ok(),
                serde_json::to_value(&user).ok(),
                extract_client_ip(&headers),
            )
            .await;
            Json(user).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Usuario desactivado"),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Solo ADMIN"),
        (status = 404, description = "Usuario no encontrado"),
        (status = 409, description = "Usuario ya inactivo")
    ),
    tag = "users"
)]
pub async fn delete_user(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let claims = match require_admin(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let before = match storage::fetch_user(&pool, id).await {
        Ok(Some(before)) => before,
        Ok(None) => return ApiError::NotFound(MSG_NOT_FOUND).into_response(),
        Err(err) => return ApiError::Database(err).into_response(),
    };

    match storage::deactivate_user(&pool, id).await {
        // Row existed but was already inactive: conflict, and no audit entry.
        Ok(0) => ApiError::Conflict(MSG_YA_INACTIVO).into_response(),
        Ok(_) => {
            let after = UserRecord {
                activo: false,
                ..before.clone()
            };
            audit::record(
                &pool,
                claims.sub,
                AuditAction::DeactivateUser,
                Some(before.id),
                serde_json::to_value(&before).ok(),
                serde_json::to_value(&after).ok(),
                extract_client_ip(&headers),
            )
            .await;
            Json(serde_json::json!({ "message": "Usuario desactivado correctamente" }))
                .into_response()
        }
        Err(err) => ApiError::Database(err).into_response(),
    }
}

fn require_admin(headers: &HeaderMap, auth_state: &AuthState) -> Result<Claims, ApiError> {
    let claims = require_auth(headers, auth_state)?;
    admin_only(&claims)?;
    Ok(claims)
}
