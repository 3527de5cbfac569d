//! Request/response types and field validation for persona endpoints.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::rut::valid_rut;
use crate::api::{
    error::FieldError,
    handlers::{normalize_email, valid_email},
};

static TELEFONO_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[0-9+\s-]{6,15}$").ok());

/// Create/update payload. `villa_id` is only honored for admins; a dirigente
/// is always scoped to their own villa.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct PersonaPayload {
    pub nombre: String,
    pub rut: String,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub correo: Option<String>,
    #[serde(default)]
    pub villa_id: Option<Uuid>,
}

/// One persona row, as returned by mutations and snapshotted in the audit
/// log.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct PersonaRecord {
    pub id: Uuid,
    pub nombre: String,
    pub rut: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub correo: Option<String>,
    pub villa_id: Uuid,
}

/// Listing row: persona plus its villa name.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PersonaListItem {
    pub id: Uuid,
    pub nombre: String,
    pub rut: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub correo: Option<String>,
    pub villa_id: Uuid,
    pub villa_nombre: String,
}

/// Validated, normalized field set ready for storage.
#[derive(Debug, Clone)]
pub struct PersonaFields {
    pub nombre: String,
    pub rut: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub correo: Option<String>,
}

impl PersonaPayload {
    /// Validate every field; empty optional strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns the full list of per-field failures.
    pub fn validate(&self) -> Result<PersonaFields, Vec<FieldError>> {
        let mut errors = Vec::new();

        let nombre = self.nombre.trim();
        if nombre.is_empty() {
            errors.push(FieldError::new("nombre", "El nombre es obligatorio"));
        } else if nombre.chars().count() < 3 {
            errors.push(FieldError::new(
                "nombre",
                "El nombre debe tener al menos 3 caracteres",
            ));
        }

        let rut = self.rut.trim();
        if rut.is_empty() {
            errors.push(FieldError::new("rut", "El RUT es obligatorio"));
        } else if !valid_rut(rut) {
            errors.push(FieldError::new("rut", "RUT inválido"));
        }

        let correo = non_empty(self.correo.as_deref()).map(normalize_email);
        if let Some(correo) = correo.as_deref()
            && !valid_email(correo)
        {
            errors.push(FieldError::new("correo", "Correo electrónico inválido"));
        }

        let telefono = non_empty(self.telefono.as_deref()).map(str::to_string);
        if let Some(telefono) = telefono.as_deref()
            && !TELEFONO_RE.as_ref().is_some_and(|re| re.is_match(telefono))
        {
            errors.push(FieldError::new("telefono", "Teléfono inválido"));
        }

        let direccion = non_empty(self.direccion.as_deref()).map(str::to_string);
        if let Some(direccion) = direccion.as_deref()
            && direccion.chars().count() > 255
        {
            errors.push(FieldError::new("direccion", "Dirección demasiado larga"));
        }

        if errors.is_empty() {
            Ok(PersonaFields {
                nombre: nombre.to_string(),
                rut: rut.to_string(),
                direccion,
                telefono,
                correo,
            })
        } else {
            Err(errors)
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_payload() -> PersonaPayload {
        PersonaPayload {
            nombre: "Juan Pérez".to_string(),
            rut: "12.345.678-5".to_string(),
            direccion: Some("Av. Costanera 123".to_string()),
            telefono: Some("+56 9 1234-5678".to_string()),
            correo: Some("juan@example.com".to_string()),
            villa_id: None,
        }
    }

    #[test]
    fn valid_payload_normalizes() {
        let fields = base_payload().validate();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            assert_eq!(fields.nombre, "Juan Pérez");
            assert_eq!(fields.correo.as_deref(), Some("juan@example.com"));
        }
    }

    #[test]
    fn empty_optionals_are_absent_not_invalid() {
        let payload = PersonaPayload {
            direccion: Some(String::new()),
            telefono: Some("  ".to_string()),
            correo: Some(String::new()),
            ..base_payload()
        };
        let fields = payload.validate();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            assert_eq!(fields.direccion, None);
            assert_eq!(fields.telefono, None);
            assert_eq!(fields.correo, None);
        }
    }

    #[test]
    fn short_name_and_bad_rut_are_both_reported() {
        let payload = PersonaPayload {
            nombre: "Jo".to_string(),
            rut: "12345678-6".to_string(),
            ..base_payload()
        };
        let errors = payload.validate().err().unwrap_or_default();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["nombre", "rut"]);
    }

    #[test]
    fn telefono_must_match_the_allowed_shape() {
        for bad in ["12345", "1234567890123456", "fono-123a"] {
            let payload = PersonaPayload {
                telefono: Some(bad.to_string()),
                ..base_payload()
            };
            let errors = payload.validate().err().unwrap_or_default();
            assert!(
                errors.iter().any(|e| e.field == "telefono"),
                "expected telefono error for {bad:?}"
            );
        }
    }

    #[test]
    fn correo_is_normalized_and_checked() {
        let payload = PersonaPayload {
            correo: Some(" Juan@Example.COM ".to_string()),
            ..base_payload()
        };
        let fields = payload.validate();
        assert!(matches!(
            fields,
            Ok(ref f) if f.correo.as_deref() == Some("juan@example.com")
        ));

        let payload = PersonaPayload {
            correo: Some("no-es-correo".to_string()),
            ..base_payload()
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn long_address_is_rejected() {
        let payload = PersonaPayload {
            direccion: Some("x".repeat(256)),
            ..base_payload()
        };
        let errors = payload.validate().err().unwrap_or_default();
        assert!(errors.iter().any(|e| e.field == "direccion"));
    }
}
