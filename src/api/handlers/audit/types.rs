//! Audit actions and the entries returned to administrators.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Every administrative mutation maps to exactly one action code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CreatePersona,
    UpdatePersona,
    DeletePersona,
    CreateUser,
    UpdateUser,
    DeactivateUser,
    CreateVilla,
    UpdateVilla,
    DeleteVilla,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatePersona => "CREATE_PERSONA",
            Self::UpdatePersona => "UPDATE_PERSONA",
            Self::DeletePersona => "DELETE_PERSONA",
            Self::CreateUser => "CREATE_USER",
            Self::UpdateUser => "UPDATE_USER",
            Self::DeactivateUser => "DEACTIVATE_USER",
            Self::CreateVilla => "CREATE_VILLA",
            Self::UpdateVilla => "UPDATE_VILLA",
            Self::DeleteVilla => "DELETE_VILLA",
        }
    }

    /// The entity column value this action applies to.
    #[must_use]
    pub const fn entity(self) -> &'static str {
        match self {
            Self::CreatePersona | Self::UpdatePersona | Self::DeletePersona => "PERSONA",
            Self::CreateUser | Self::UpdateUser | Self::DeactivateUser => "USER",
            Self::CreateVilla | Self::UpdateVilla | Self::DeleteVilla => "VILLA",
        }
    }
}

/// One audit row as listed for administrators, actor joined in.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuditEntry {
    pub id: Uuid,
    pub usuario_id: Option<Uuid>,
    pub usuario_nombre: Option<String>,
    pub usuario_rol: Option<String>,
    pub accion: String,
    pub entidad: String,
    pub entidad_id: Option<Uuid>,
    /// Name of the affected entity, extracted from the after-snapshot with a
    /// fallback to the before-snapshot.
    pub entidad_nombre: Option<String>,
    pub datos_antes: Option<serde_json::Value>,
    pub datos_despues: Option<serde_json::Value>,
    pub ip: Option<String>,
    pub created_at: String,
}

/// Human-readable rendering of an audit entry.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuditEntryHumano {
    pub fecha: String,
    pub mensaje: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_to_their_entity() {
        assert_eq!(AuditAction::CreatePersona.entity(), "PERSONA");
        assert_eq!(AuditAction::DeactivateUser.entity(), "USER");
        assert_eq!(AuditAction::DeleteVilla.entity(), "VILLA");
        assert_eq!(AuditAction::DeactivateUser.as_str(), "DEACTIVATE_USER");
    }
}
