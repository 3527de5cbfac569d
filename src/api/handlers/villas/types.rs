//! Request/response types for villa management.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Create/update payload. A missing `cupo_maximo` means unlimited (0).
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct VillaPayload {
    pub nombre: String,
    #[serde(default)]
    pub cupo_maximo: Option<i32>,
}

impl VillaPayload {
    /// Coerced capacity: absent means 0 (unlimited); negative is the
    /// caller's error, checked by the handler.
    #[must_use]
    pub fn cupo(&self) -> i32 {
        self.cupo_maximo.unwrap_or(0)
    }
}

/// One villa row, as returned by all villa endpoints and snapshotted in the
/// audit log.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct VillaRecord {
    pub id: Uuid,
    pub nombre: String,
    pub cupo_maximo: i32,
}
