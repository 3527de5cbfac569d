//! SQL storage for personas, including villa capacity enforcement.
//!
//! Capacity is enforced inside a transaction that locks the villa row before
//! counting, so two concurrent inserts against a near-full villa serialize
//! instead of both passing the check.

use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::types::{PersonaFields, PersonaListItem, PersonaRecord};
use crate::api::error::{ApiError, is_unique_violation};

pub(super) const MSG_VILLA_NOT_FOUND: &str = "La villa especificada no existe";
pub(super) const MSG_CUPO_LLENO: &str =
    "Se alcanzó el cupo máximo de personas para esta villa. No se pueden agregar más registros.";
pub(super) const MSG_DUPLICADO: &str = "Ya existe una persona con ese RUT o correo";

const PERSONA_COLUMNS: &str = "id, nombre, rut, direccion, telefono, correo, villa_id";

/// All personas with their villa, ordered for the admin listing.
pub(super) async fn fetch_all(pool: &PgPool) -> Result<Vec<PersonaListItem>, sqlx::Error> {
    let query = r"
        SELECT
            p.id, p.nombre, p.rut, p.direccion, p.telefono, p.correo,
            p.villa_id,
            v.nombre AS villa_nombre
        FROM personas p
        JOIN villas v ON v.id = p.villa_id
        ORDER BY v.nombre, p.nombre
    ";
    let rows = sqlx::query(query).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|row| list_item(&row)).collect())
}

/// Personas of one villa, ordered by name, for the dirigente listing.
pub(super) async fn fetch_for_villa(
    pool: &PgPool,
    villa_id: Uuid,
) -> Result<Vec<PersonaListItem>, sqlx::Error> {
    let query = r"
        SELECT
            p.id, p.nombre, p.rut, p.direccion, p.telefono, p.correo,
            p.villa_id,
            v.nombre AS villa_nombre
        FROM personas p
        JOIN villas v ON v.id = p.villa_id
        WHERE p.villa_id = $1
        ORDER BY p.nombre
    ";
    let rows = sqlx::query(query).bind(villa_id).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|row| list_item(&row)).collect())
}

/// One persona by id, or `None` for 404 handling.
pub(super) async fn fetch_persona(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<PersonaRecord>, sqlx::Error> {
    let query = format!("SELECT {PERSONA_COLUMNS} FROM personas WHERE id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
    Ok(row.map(|row| record(&row)))
}

/// Insert a persona after an in-transaction capacity check on its villa.
pub(super) async fn insert_persona(
    pool: &PgPool,
    villa_id: Uuid,
    fields: &PersonaFields,
) -> Result<PersonaRecord, ApiError> {
    let mut tx = pool.begin().await?;
    ensure_capacity(&mut tx, villa_id).await?;

    let query = format!(
        "INSERT INTO personas (nombre, rut, direccion, telefono, correo, villa_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {PERSONA_COLUMNS}"
    );
    let inserted = sqlx::query(&query)
        .bind(&fields.nombre)
        .bind(&fields.rut)
        .bind(&fields.direccion)
        .bind(&fields.telefono)
        .bind(&fields.correo)
        .bind(villa_id)
        .fetch_one(&mut *tx)
        .await;

    let row = match inserted {
        Ok(row) => row,
        Err(err) if is_unique_violation(&err) => return Err(ApiError::Conflict(MSG_DUPLICADO)),
        Err(err) => return Err(ApiError::Database(err)),
    };

    tx.commit().await?;
    Ok(record(&row))
}

/// Update a persona; when it moves villa the target's capacity is re-checked
/// inside the same transaction.
pub(super) async fn update_persona(
    pool: &PgPool,
    id: Uuid,
    villa_id: Uuid,
    recheck_capacity: bool,
    fields: &PersonaFields,
) -> Result<PersonaRecord, ApiError> {
    let mut tx = pool.begin().await?;
    if recheck_capacity {
        ensure_capacity(&mut tx, villa_id).await?;
    }

    let query = format!(
        "UPDATE personas
         SET nombre = $1,
             rut = $2,
             direccion = $3,
             telefono = $4,
             correo = $5,
             villa_id = $6
         WHERE id = $7
         RETURNING {PERSONA_COLUMNS}"
    );
    let updated = sqlx::query(&query)
        .bind(&fields.nombre)
        .bind(&fields.rut)
        .bind(&fields.direccion)
        .bind(&fields.telefono)
        .bind(&fields.correo)
        .bind(villa_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await;

    let row = match updated {
        Ok(row) => row,
        Err(err) if is_unique_violation(&err) => return Err(ApiError::Conflict(MSG_DUPLICADO)),
        Err(err) => return Err(ApiError::Database(err)),
    };

    tx.commit().await?;
    Ok(record(&row))
}

/// Delete by id; returns the number of rows removed.
pub(super) async fn delete_persona(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM personas WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Lock the villa row, then compare the persona count against its cap.
/// `cupo_maximo = 0` means unlimited.
async fn ensure_capacity(
    tx: &mut Transaction<'_, Postgres>,
    villa_id: Uuid,
) -> Result<(), ApiError> {
    let villa = sqlx::query("SELECT cupo_maximo FROM villas WHERE id = $1 FOR UPDATE")
        .bind(villa_id)
        .fetch_optional(&mut **tx)
        .await?;
    let Some(villa) = villa else {
        return Err(ApiError::BadRequest(MSG_VILLA_NOT_FOUND));
    };

    let cupo: i32 = villa.get("cupo_maximo");
    if cupo > 0 {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM personas WHERE villa_id = $1")
            .bind(villa_id)
            .fetch_one(&mut **tx)
            .await?
            .get("total");
        if total >= i64::from(cupo) {
            return Err(ApiError::BadRequest(MSG_CUPO_LLENO));
        }
    }

    Ok(())
}

fn record(row: &sqlx::postgres::PgRow) -> PersonaRecord {
    PersonaRecord {
        id: row.get("id"),
        nombre: row.get("nombre"),
        rut: row.get("rut"),
        direccion: row.get("direccion"),
        telefono: row.get("telefono"),
        correo: row.get("correo"),
        villa_id: row.get("villa_id"),
    }
}

fn list_item(row: &sqlx::postgres::PgRow) -> PersonaListItem {
    PersonaListItem {
        id: row.get("id"),
        nombre: row.get("nombre"),
        rut: row.get("rut"),
        direccion: row.get("direccion"),
        telefono: row.get("telefono"),
        correo: row.get("correo"),
        villa_id: row.get("villa_id"),
        villa_nombre: row.get("villa_nombre"),
    }
}
