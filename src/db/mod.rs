pub mod models;
mod seeders;

pub use models::*;
pub use seeders::seed_doctors;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("triagr.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // Run migrations
    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Initial schema (users, sessions)
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: Doctor directory
    let has_doctors_table: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name='doctors'")
            .fetch_optional(pool)
            .await?;
    if has_doctors_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/002_doctors.sql")).await?;
    }

    // Migration 003: Intake forms
    let has_forms_table: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name='forms'")
            .fetch_optional(pool)
            .await?;
    if has_forms_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/003_forms.sql")).await?;
    }

    // Migration 004: Review wall
    let has_reviews_table: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name='reviews'")
            .fetch_optional(pool)
            .await?;
    if has_reviews_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/004_reviews.sql")).await?;
    }

    // Seed the doctor directory (runs on every startup to add new doctors;
    // existing rows keep their like counts)
    seeders::seed_doctors(pool).await?;

    info!("Migrations completed");
    Ok(())
}

/// Single-connection in-memory database with the full schema applied.
/// SQLite gives every connection its own `:memory:` database, so the pool
/// is capped at one connection.
#[cfg(test)]
pub async fn init_memory() -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    run_migrations(&pool).await?;

    Ok(pool)
}
