//! SQL storage for villas.

use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::types::VillaRecord;
use crate::api::error::{ApiError, is_foreign_key_violation, is_unique_violation};

pub(super) const MSG_NOMBRE_EN_USO: &str = "Ya existe una villa con ese nombre";
pub(super) const MSG_TIENE_REGISTROS: &str =
    "No se puede eliminar la villa porque tiene registros asociados (por ejemplo dirigentes o personas).";

/// All villas ordered by name; visible to any authenticated role.
pub(super) async fn fetch_all(pool: &PgPool) -> Result<Vec<VillaRecord>, sqlx::Error> {
    let rows = sqlx::query("SELECT id, nombre, cupo_maximo FROM villas ORDER BY nombre")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|row| record(&row)).collect())
}

/// One villa by id, or `None` for 404 handling.
pub(super) async fn fetch_villa(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<VillaRecord>, sqlx::Error> {
    let row = sqlx::query("SELECT id, nombre, cupo_maximo FROM villas WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| record(&row)))
}

pub(super) async fn insert_villa(
    pool: &PgPool,
    nombre: &str,
    cupo_maximo: i32,
) -> Result<VillaRecord, ApiError> {
    let inserted = sqlx::query(
        r"
        INSERT INTO villas (nombre, cupo_maximo)
        VALUES ($1, $2)
        RETURNING id, nombre, cupo_maximo
        ",
    )
    .bind(nombre)
    .bind(cupo_maximo)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(row) => Ok(record(&row)),
        Err(err) if is_unique_violation(&err) => Err(ApiError::Conflict(MSG_NOMBRE_EN_USO)),
        Err(err) => Err(ApiError::Database(err)),
    }
}

pub(super) async fn update_villa(
    pool: &PgPool,
    id: Uuid,
    nombre: &str,
    cupo_maximo: i32,
) -> Result<VillaRecord, ApiError> {
    let updated = sqlx::query(
        r"
        UPDATE villas
        SET nombre = $1,
            cupo_maximo = $2
        WHERE id = $3
        RETURNING id, nombre, cupo_maximo
        ",
    )
    .bind(nombre)
    .bind(cupo_maximo)
    .bind(id)
    .fetch_one(pool)
    .await;

    match updated {
        Ok(row) => Ok(record(&row)),
        Err(err) if is_unique_violation(&err) => Err(ApiError::Conflict(MSG_NOMBRE_EN_USO)),
        Err(err) => Err(ApiError::Database(err)),
    }
}

/// Delete a villa; referencing users or personas turn into a 409.
pub(super) async fn delete_villa(pool: &PgPool, id: Uuid) -> Result<u64, ApiError> {
    let result = sqlx::query("DELETE FROM villas WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await;

    match result {
        Ok(result) => Ok(result.rows_affected()),
        Err(err) if is_foreign_key_violation(&err) => Err(ApiError::Conflict(MSG_TIENE_REGISTROS)),
        Err(err) => Err(ApiError::Database(err)),
    }
}

fn record(row: &sqlx::postgres::PgRow) -> VillaRecord {
    VillaRecord {
        id: row.get("id"),
        nombre: row.get("nombre"),
        cupo_maximo: row.get("cupo_maximo"),
    }
}
