//! Audit trail endpoints (ADMIN only) and the shared `record` side effect.

pub mod storage;
pub mod types;

use axum::{
    Json,
    extract::{Extension, Query},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::IntoParams;

use self::types::{AuditEntry, AuditEntryHumano};
use super::auth::{
    principal::{admin_only, require_auth},
    state::AuthState,
};
use crate::api::error::ApiError;

const DEFAULT_LIMIT: i64 = 200;

#[derive(Deserialize, IntoParams, Debug)]
pub struct LogsQuery {
    /// Maximum number of entries to return (default 200).
    pub limit: Option<i64>,
}

impl LogsQuery {
    fn effective_limit(&self) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_LIMIT,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/logs",
    params(LogsQuery),
    responses(
        (status = 200, description = "Entradas de auditoría más recientes", body = [AuditEntry]),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Solo ADMIN")
    ),
    tag = "admin"
)]
pub async fn list_logs(
    headers: HeaderMap,
    Query(query): Query<LogsQuery>,
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

    match storage::fetch_recent(&pool, query.effective_limit()).await {
        Ok(entries) => Json(entries).into_response(),
        Err(err) => ApiError::Database(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/logs/humano",
    params(LogsQuery),
    responses(
        (status = 200, description = "Entradas de auditoría en formato legible", body = [AuditEntryHumano]),
        (status = 401, description = "Sin token válido"),
        (status = 403, description = "Solo ADMIN")
    ),
    tag = "admin"
)]
pub async fn list_logs_humano(
    headers: HeaderMap,
    Query(query): Query<LogsQuery>,
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

    match storage::fetch_recent(&pool, query.effective_limit()).await {
        Ok(entries) => {
            let rendered: Vec<AuditEntryHumano> = entries.iter().map(render_humano).collect();
            Json(rendered).into_response()
        }
        Err(err) => ApiError::Database(err).into_response(),
    }
}

fn render_humano(entry: &AuditEntry) -> AuditEntryHumano {
    let usuario = entry.usuario_nombre.as_deref().unwrap_or("(desconocido)");
    let entidad = entry.entidad_nombre.as_deref().unwrap_or("(sin nombre)");

    let mensaje = match entry.accion.as_str() {
        "CREATE_PERSONA" => format!("El usuario \"{usuario}\" agregó a la persona \"{entidad}\"."),
        "UPDATE_PERSONA" => {
            format!("El usuario \"{usuario}\" actualizó los datos de \"{entidad}\".")
        }
        "DELETE_PERSONA" => format!("El usuario \"{usuario}\" eliminó a la persona \"{entidad}\"."),
        "CREATE_USER" => format!("El administrador \"{usuario}\" creó al usuario \"{entidad}\"."),
        "UPDATE_USER" => {
            format!("El administrador \"{usuario}\" actualizó al usuario \"{entidad}\".")
        }
        "DEACTIVATE_USER" => {
            format!("El administrador \"{usuario}\" desactivó al usuario \"{entidad}\".")
        }
        "CREATE_VILLA" => format!("El administrador \"{usuario}\" creó la villa \"{entidad}\"."),
        "UPDATE_VILLA" => {
            format!("El administrador \"{usuario}\" actualizó la villa \"{entidad}\".")
        }
        "DELETE_VILLA" => format!("El administrador \"{usuario}\" eliminó la villa \"{entidad}\"."),
        accion => format!("{usuario} realizó la acción {accion}."),
    };

    AuditEntryHumano {
        fecha: entry.created_at.clone(),
        mensaje,
    }
}
