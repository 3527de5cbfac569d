//! Request/response types for the auth endpoints, plus the role enum.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Closed set of roles. Authorization points match on this exhaustively;
/// an unknown role string in a token fails deserialization and the request
/// is rejected as unauthenticated.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rol {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "DIRIGENTE")]
    Dirigente,
}

impl Rol {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Dirigente => "DIRIGENTE",
        }
    }

    /// Parse the uppercase wire/database form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Self::Admin),
            "DIRIGENTE" => Some(Self::Dirigente),
            _ => None,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user, as embedded in the login response.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserPublic {
    pub id: Uuid,
    pub nombre: String,
    pub email: String,
    pub rol: Rol,
    pub villa_id: Option<Uuid>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserPublic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rol_round_trips_through_wire_form() {
        for rol in [Rol::Admin, Rol::Dirigente] {
            assert_eq!(Rol::parse(rol.as_str()), Some(rol));
        }
        assert_eq!(Rol::parse("SUPER_ADMIN"), None);
        assert_eq!(Rol::parse("admin"), None);
    }

    #[test]
    fn rol_serializes_uppercase() {
        assert_eq!(
            serde_json::to_value(Rol::Dirigente).ok(),
            Some(serde_json::json!("DIRIGENTE"))
        );
        let parsed: Result<Rol, _> = serde_json::from_str("\"VECINO\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn login_response_shape() {
        let response = LoginResponse {
            token: "abc".to_string(),
            user: UserPublic {
                id: Uuid::nil(),
                nombre: "Admin Municipal".to_string(),
                email: "admin@municipalidad.cl".to_string(),
                rol: Rol::Admin,
                villa_id: None,
            },
        };
        let value = serde_json::to_value(&response).ok();
        let user = value.as_ref().and_then(|v| v.get("user"));
        assert_eq!(
            user.and_then(|u| u.get("rol")),
            Some(&serde_json::json!("ADMIN"))
        );
        assert_eq!(
            user.and_then(|u| u.get("villa_id")),
            Some(&serde_json::Value::Null)
        );
    }
}
