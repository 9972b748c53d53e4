//! Doctor directory models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::DbPool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub likes: i64,
    pub created_at: String,
}

impl Doctor {
    /// Directory listing, most-liked first. Ties break alphabetically so
    /// the ordering is stable.
    pub async fn list(pool: &DbPool) -> Result<Vec<Doctor>, sqlx::Error> {
        sqlx::query_as::<_, Doctor>("SELECT * FROM doctors ORDER BY likes DESC, name ASC")
            .fetch_all(pool)
            .await
    }
}
