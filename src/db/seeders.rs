//! Database seeders for built-in data
//!
//! Seeds the doctor directory patients choose from. New entries are added
//! on every startup; existing rows are left alone so their like counts
//! survive upgrades.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Seed the doctor directory (runs on every startup to add new doctors)
pub async fn seed_doctors(pool: &SqlitePool) -> Result<()> {
    info!("Seeding doctor directory...");

    // Format: (id, name, specialty)
    let doctors: Vec<(&str, &str, &str)> = vec![
        ("dr-volkova", "Dr. Marina Volkova", "General practice"),
        ("dr-orlov", "Dr. Sergei Orlov", "Pulmonology"),
        ("dr-lebedeva", "Dr. Irina Lebedeva", "Otolaryngology"),
        ("dr-sokolov", "Dr. Andrei Sokolov", "Neurology"),
        ("dr-morozova", "Dr. Elena Morozova", "Gastroenterology"),
        ("dr-kuznetsov", "Dr. Dmitri Kuznetsov", "Allergology"),
    ];

    let doctor_count = doctors.len();
    for (id, name, specialty) in doctors {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO doctors (id, name, specialty, likes, created_at)
            VALUES (?, ?, ?, 0, datetime('now'))
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(specialty)
        .execute(pool)
        .await?;
    }

    info!("Seeded {} directory doctors", doctor_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_seeding_is_idempotent_and_keeps_likes() {
        // init_memory already ran the seeder once via migrations
        let pool = db::init_memory().await.unwrap();

        sqlx::query("UPDATE doctors SET likes = 7 WHERE id = 'dr-orlov'")
            .execute(&pool)
            .await
            .unwrap();

        seed_doctors(&pool).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM doctors")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 6);

        let (likes,): (i64,) = sqlx::query_as("SELECT likes FROM doctors WHERE id = 'dr-orlov'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(likes, 7);
    }
}
