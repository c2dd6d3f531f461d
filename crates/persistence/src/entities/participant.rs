//! Participant entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the participants table.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantEntity {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub qr_code: String,
    pub created_at: DateTime<Utc>,
}

impl From<ParticipantEntity> for domain::models::Participant {
    fn from(entity: ParticipantEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            email: entity.email,
            qr_code: entity.qr_code,
            created_at: entity.created_at,
        }
    }
}
