//! Request/response types and validation for user management.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::{
    error::FieldError,
    handlers::{auth::types::Rol, normalize_email, valid_email},
};

/// Create/update payload. `password` is required on create and optional on
/// update (empty or absent keeps the stored hash).
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct UserPayload {
    pub nombre: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    pub rol: String,
    #[serde(default)]
    pub villa_id: Option<Uuid>,
}

/// One user row as returned by mutations and snapshotted in the audit log.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub nombre: String,
    pub email: String,
    pub rol: Rol,
    pub villa_id: Option<Uuid>,
    pub activo: bool,
}

/// Listing row: user plus the villa name, active users only.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserListItem {
    pub id: Uuid,
    pub nombre: String,
    pub email: String,
    pub rol: Rol,
    pub villa_id: Option<Uuid>,
    pub activo: bool,
    pub villa_nombre: Option<String>,
}

/// Validated, normalized field set. `villa_id` is already role-adjusted:
/// forced to `None` for admins.
#[derive(Debug, Clone)]
pub struct UserFields {
    pub nombre: String,
    pub email: String,
    pub password: Option<String>,
    pub rol: Rol,
    pub villa_id: Option<Uuid>,
}

impl UserPayload {
    /// Validate the payload. `require_password` distinguishes create from
    /// update.
    ///
    /// # Errors
    ///
    /// Returns per-field failures.
    pub fn validate(&self, require_password: bool) -> Result<UserFields, Vec<FieldError>> {
        let mut errors = Vec::new();

        let nombre = self.nombre.trim();
        if nombre.is_empty() {
            errors.push(FieldError::new("nombre", "El nombre es requerido"));
        } else if nombre.chars().count() < 3 {
            errors.push(FieldError::new(
                "nombre",
                "El nombre debe tener al menos 3 caracteres",
            ));
        }

        let email = normalize_email(&self.email);
        if email.is_empty() {
            errors.push(FieldError::new("email", "El email es requerido"));
        } else if !valid_email(&email) {
            errors.push(FieldError::new("email", "Email inválido"));
        }

        // Empty string counts as "not provided" on update.
        let password = self
            .password
            .as_deref()
            .filter(|value| !value.trim().is_empty());
        match password {
            None if require_password => {
                errors.push(FieldError::new("password", "La contraseña es requerida"));
            }
            Some(value) if value.chars().count() < 6 => {
                errors.push(FieldError::new(
                    "password",
                    "La contraseña debe tener al menos 6 caracteres",
                ));
            }
            _ => {}
        }

        let rol = Rol::parse(self.rol.trim());
        if rol.is_none() {
            errors.push(FieldError::new("rol", "Rol inválido"));
        }

        if errors.is_empty() {
            if let Some(rol) = rol {
                return Ok(UserFields {
                    nombre: nombre.to_string(),
                    email,
                    password: password.map(str::to_string),
                    rol,
                    // Admins are global and never reference a villa.
                    villa_id: match rol {
                        Rol::Admin => None,
                        Rol::Dirigente => self.villa_id,
                    },
                });
            }
        }
        Err(errors)
    }
}
