//! Villa management. Listing is open to any authenticated role; mutations
//! are ADMIN only.

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

use self::types::{VillaPayload, VillaRecord};
use super::{
    audit::{storage as audit, types::AuditAction},
    auth::{
        principal::{admin_only, require_auth},
        state::AuthState,
    },
    extract_client_ip,
};
use crate::api::error::ApiError;

const MSG_NOT_FOUND: &str = "Villa no encontrada";
const MSG_NOMBRE_REQUERIDO: &str = "El nombre es requerido";
const MSG_CUPO_NEGATIVO: &str = "El cupo máximo no puede ser negativo";
const MSG_PAYLOAD: &str = "Datos inválidos";

#[utoipa::path(
    get,
    path = "/api/villas",
    responses(
        (status = 200, description = "Listado de villas", body = [VillaRecord]),
        (status = 401, description = "Sin token válido")
    ),
    tag = "villas"
)]
pub async fn list_villas(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(err) = require_auth(&headers, &auth_state) {
        return err.into_response();
    }

    match storage::fetch_all(&pool).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => ApiError::Database(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/villas",
    request_body = VillaPayload,
    responses(
        (status = 201, description = "Villa creada", body = VillaRecord),
        (status = 400, description = "Nombre faltante o cupo negativo"),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Solo ADMIN"),
        (status = 409, description = "Nombre ya registrado")
    ),
    tag = "villas"
)]
pub async fn create_villa(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VillaPayload>>,
) -> impl IntoResponse {
    let claims = match require_auth(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = admin_only(&claims) {
        return err.into_response();
    }

    let Some(Json(payload)) = payload else {
        return ApiError::BadRequest(MSG_PAYLOAD).into_response();
    };
    let nombre = payload.nombre.trim();
    if nombre.is_empty() {
        return ApiError::BadRequest(MSG_NOMBRE_REQUERIDO).into_response();
    }
    let cupo = payload.cupo();
    if cupo < 0 {
        return ApiError::BadRequest(MSG_CUPO_NEGATIVO).into_response();
    }

    match storage::insert_villa(&pool, nombre, cupo).await {
        Ok(villa) => {
            audit::record(
                &pool,
                claims.sub,
                AuditAction::CreateVilla,
                Some(villa.id),
                None,
                serde_json::to_value(&villa).ok(),
                extract_client_ip(&headers),
            )
            .await;
            (StatusCode::CREATED, Json(villa)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/villas/{id}",
    request_body = VillaPayload,
    params(("id" = Uuid, Path, description = "Villa id")),
    responses(
        (status = 200, description = "Villa actualizada", body = VillaRecord),
        (status = 400, description = "Nombre faltante o cupo negativo"),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Solo ADMIN"),
        (status = 404, description = "Villa no encontrada"),
        (status = 409, description = "Nombre ya registrado")
    ),
    tag = "villas"
)]
pub async fn update_villa(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VillaPayload>>,
) -> impl IntoResponse {
    let claims = match require_auth(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = admin_only(&claims) {
        return err.into_response();
    }

    let Some(Json(payload)) = payload else {
        return ApiError::BadRequest(MSG_PAYLOAD).into_response();
    };
    let nombre = payload.nombre.trim();
    if nombre.is_empty() {
        return ApiError::BadRequest(MSG_NOMBRE_REQUERIDO).into_response();
    }
    let cupo = payload.cupo();
    if cupo < 0 {
        return ApiError::BadRequest(MSG_CUPO_NEGATIVO).into_response();
    }

    let before = match storage::fetch_villa(&pool, id).await {
        Ok(Some(before)) => before,
        Ok(None) => return ApiError::NotFound(MSG_NOT_FOUND).into_response(),
        Err(err) => return ApiError::Database(err).into_response(),
    };

    match storage::update_villa(&pool, id, nombre, cupo).await {
        Ok(villa) => {
            audit::record(
                &pool,
                claims.sub,
                AuditAction::UpdateVilla,
                Some(villa.id),
                serde_json::to_value(&before).ok(),
                serde_json::to_value(&villa).ok(),
                extract_client_ip(&headers),
            )
            .await;
            Json(villa).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/villas/{id}",
    params(("id" = Uuid, Path, description = "Villa id")),
    responses(
        (status = 200, description = "Villa eliminada"),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Solo ADMIN"),
        (status = 404, description = "Villa no encontrada"),
        (status = 409, description = "Villa con registros asociados")
    ),
    tag = "villas"
)]
pub async fn delete_villa(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let claims = match require_auth(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = admin_only(&claims) {
        return err.into_response();
    }

    let before = match storage::fetch_villa(&pool, id).await {
        Ok(Some(before)) => before,
        Ok(None) => return ApiError::NotFound(MSG_NOT_FOUND).into_response(),
        Err(err) => return ApiError::Database(err).into_response(),
    };

    match storage::delete_villa(&pool, id).await {
        Ok(0) => ApiError::NotFound(MSG_NOT_FOUND).into_response(),
        Ok(_) => {
            audit::record(
                &pool,
                claims.sub,
                AuditAction::DeleteVilla,
                Some(before.id),
                serde_json::to_value(&before).ok(),
                None,
                extract_client_ip(&headers),
            )
            .await;
            Json(serde_json::json!({ "message": "Villa eliminada correctamente" }))
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}
