//! SQL storage for users. Deactivation is the only delete.

use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::types::{UserFields, UserListItem, UserRecord};
use crate::api::{
    error::{ApiError, is_unique_violation},
    handlers::auth::types::Rol,
};

pub(super) const MSG_EMAIL_EN_USO: &str = "Email ya está en uso";

const USER_COLUMNS: &str = "id, nombre, email, rol, villa_id, activo";

/// Active users with their villa, oldest first.
pub(super) async fn fetch_active(pool: &PgPool) -> Result<Vec<UserListItem>, sqlx::Error> {
    let query = r"
        SELECT
            u.id, u.nombre, u.email, u.rol, u.villa_id, u.activo,
            v.nombre AS villa_nombre
        FROM users u
        LEFT JOIN villas v ON v.id = u.villa_id
        WHERE u.activo = TRUE
        ORDER BY u.created_at
    ";
    let rows = sqlx::query(query).fetch_all(pool).await?;
    rows.into_iter()
        .map(|row| {
            Ok(UserListItem {
                id: row.get("id"),
                nombre: row.get("nombre"),
                email: row.get("email"),
                rol: decode_rol(&row)?,
                villa_id: row.get("villa_id"),
                activo: row.get("activo"),
                villa_nombre: row.get("villa_nombre"),
            })
        })
        .collect()
}

/// One user by id, active or not, or `None` for 404 handling.
pub(super) async fn fetch_user(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>, sqlx::Error> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
    row.map(|row| record(&row)).transpose()
}

pub(super) async fn insert_user(
    pool: &PgPool,
    fields: &UserFields,
    password_hash: &str,
) -> Result<UserRecord, ApiError> {
    let query = format!(
        "INSERT INTO users (nombre, email, password_hash, rol, villa_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {USER_COLUMNS}"
    );
    let inserted = sqlx::query(&query)
        .bind(&fields.nombre)
        .bind(&fields.email)
        .bind(password_hash)
        .bind(fields.rol.as_str())
        .bind(fields.villa_id)
        .fetch_one(pool)
        .await;

    match inserted {
        Ok(row) => Ok(record(&row)?),
        Err(err) if is_unique_violation(&err) => Err(ApiError::Conflict(MSG_EMAIL_EN_USO)),
        Err(err) => Err(ApiError::Database(err)),
    }
}

/// Update a user; a `None` password hash keeps the stored one (`COALESCE`).
pub(super) async fn update_user(
    pool: &PgPool,
    id: Uuid,
    fields: &UserFields,
    password_hash: Option<&str>,
) -> Result<UserRecord, ApiError> {
    let query = format!(
        "UPDATE users
         SET nombre = $1,
             email = $2,
             rol = $3,
             villa_id = $4,
             password_hash = COALESCE($5, password_hash)
         WHERE id = $6
         RETURNING {USER_COLUMNS}"
    );
    let updated = sqlx::query(&query)
        .bind(&fields.nombre)
        .bind(&fields.email)
        .bind(fields.rol.as_str())
        .bind(fields.villa_id)
        .bind(password_hash)
        .bind(id)
        .fetch_one(pool)
        .await;

    match updated {
        Ok(row) => Ok(record(&row)?),
        Err(err) if is_unique_violation(&err) => Err(ApiError::Conflict(MSG_EMAIL_EN_USO)),
        Err(err) => Err(ApiError::Database(err)),
    }
}

/// Soft delete: returns 0 rows when the user was already inactive, which the
/// handler turns into a conflict instead of a silent success.
pub(super) async fn deactivate_user(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET activo = FALSE WHERE id = $1 AND activo = TRUE")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

fn record(row: &sqlx::postgres::PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.get("id"),
        nombre: row.get("nombre"),
        email: row.get("email"),
        rol: decode_rol(row)?,
        villa_id: row.get("villa_id"),
        activo: row.get("activo"),
    })
}

// The CHECK constraint keeps this from ever firing; decoding still refuses
// to invent a role for an unknown string.
fn decode_rol(row: &sqlx::postgres::PgRow) -> Result<Rol, sqlx::Error> {
    let raw: String = row.get("rol");
    Rol::parse(&raw).ok_or_else(|| sqlx::Error::Decode(format!("unknown role: {raw}").into()))
}
