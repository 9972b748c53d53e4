//! Review wall models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::DbPool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: String,
    pub reviewer: String,
    pub body: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub body: String,
}

impl Review {
    pub async fn create(
        pool: &DbPool,
        reviewer: &str,
        body: &str,
    ) -> Result<Review, sqlx::Error> {
        let review = Review {
            id: uuid::Uuid::new_v4().to_string(),
            reviewer: reviewer.to_string(),
            body: body.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        sqlx::query("INSERT INTO reviews (id, reviewer, body, created_at) VALUES (?, ?, ?, ?)")
            .bind(&review.id)
            .bind(&review.reviewer)
            .bind(&review.body)
            .bind(&review.created_at)
            .execute(pool)
            .await?;

        Ok(review)
    }

    /// Newest first.
    pub async fn list(pool: &DbPool) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }
}
