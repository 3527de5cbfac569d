//! Bootstrap action: create the initial ADMIN user.
//!
//! Idempotent: an existing email is left untouched, so the command is safe
//! to run on every deploy.

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::api::handlers::{auth::password::hash_password, normalize_email, valid_email};

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub email: String,
    pub password: String,
    pub nombre: String,
}

/// Execute the admin bootstrap action.
/// # Errors
/// Returns an error on invalid input or when the database is unreachable.
pub async fn execute(args: Args) -> Result<()> {
    let email = normalize_email(&args.email);
    if !valid_email(&email) {
        bail!("invalid admin email: {email}");
    }
    if args.password.chars().count() < 6 {
        bail!("admin password must be at least 6 characters");
    }
    if args.nombre.trim().is_empty() {
        bail!("admin name must not be empty");
    }

    let password_hash = hash_password(&args.password)?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let result = sqlx::query(
        r"
        INSERT INTO users (nombre, email, password_hash, rol, villa_id)
        VALUES ($1, $2, $3, 'ADMIN', NULL)
        ON CONFLICT (email) DO NOTHING
        ",
    )
    .bind(args.nombre.trim())
    .bind(&email)
    .bind(&password_hash)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        info!("Admin user {email} already exists, nothing to do");
    } else {
        info!("Admin user {email} created");
    }

    Ok(())
}
