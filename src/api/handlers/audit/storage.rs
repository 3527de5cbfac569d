//! Append and list audit rows.
//!
//! `record` is best-effort by design: a failed insert is logged and
//! swallowed so the mutation that triggered it still succeeds. The trade-off
//! is that an action can complete without leaving a trail if the write
//! fails.

use sqlx::{PgPool, Row};
use tracing::error;
use uuid::Uuid;

use super::types::{AuditAction, AuditEntry};

/// Append one immutable audit row.
pub async fn record(
    pool: &PgPool,
    actor_id: Uuid,
    action: AuditAction,
    entity_id: Option<Uuid>,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
    ip: Option<String>,
) {
    let result = sqlx::query(
        r"
        INSERT INTO logs (usuario_id, accion, entidad, entidad_id, datos_antes, datos_despues, ip)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(actor_id)
    .bind(action.as_str())
    .bind(action.entity())
    .bind(entity_id)
    .bind(before)
    .bind(after)
    .bind(ip)
    .execute(pool)
    .await;

    if let Err(err) = result {
        error!("Failed to record audit entry {}: {err}", action.as_str());
    }
}

/// Most recent `limit` entries, newest first, actor joined in.
///
/// `entidad_nombre` is pulled from the after-snapshot's `nombre` field,
/// falling back to the before-snapshot, for display without extra lookups.
pub async fn fetch_recent(pool: &PgPool, limit: i64) -> Result<Vec<AuditEntry>, sqlx::Error> {
    let query = r#"
        SELECT
            l.id,
            l.usuario_id,
            u.nombre AS usuario_nombre,
            u.rol AS usuario_rol,
            l.accion,
            l.entidad,
            l.entidad_id,
            COALESCE(
                NULLIF(l.datos_despues ->> 'nombre', ''),
                NULLIF(l.datos_antes ->> 'nombre', '')
            ) AS entidad_nombre,
            l.datos_antes,
            l.datos_despues,
            l.ip,
            to_char(l.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM logs l
        LEFT JOIN users u ON u.id = l.usuario_id
        ORDER BY l.created_at DESC
        LIMIT $1
    "#;
    let rows = sqlx::query(query).bind(limit).fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| AuditEntry {
            id: row.get("id"),
            usuario_id: row.get("usuario_id"),
            usuario_nombre: row.get("usuario_nombre"),
            usuario_rol: row.get("usuario_rol"),
            accion: row.get("accion"),
            entidad: row.get("entidad"),
            entidad_id: row.get("entidad_id"),
            entidad_nombre: row.get("entidad_nombre"),
            datos_antes: row.get("datos_antes"),
            datos_despues: row.get("datos_despues"),
            ip: row.get("ip"),
            created_at: row.get("created_at"),
        })
        .collect())
}
