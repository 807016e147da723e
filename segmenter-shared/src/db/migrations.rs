/// Schema bootstrap
///
/// The schema lives in sqlx migrations under the workspace `migrations/`
/// directory and is embedded into the binary at compile time. Running the
/// migrations is idempotent: already applied versions are skipped.
///
/// # Example
///
/// ```no_run
/// use segmenter_shared::db::pool::{create_pool, DatabaseConfig};
/// use segmenter_shared::db::migrations::{ensure_database_exists, run_migrations};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let url = std::env::var("DATABASE_URL")?;
/// ensure_database_exists(&url).await?;
///
/// let pool = create_pool(DatabaseConfig { url, ..Default::default() }).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Tables the store depends on
pub const SCHEMA_TABLES: [&str; 3] = ["users", "segments", "user_segments"];

/// Applied migration summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Number of successfully applied migrations
    pub applied_migrations: usize,

    /// Highest applied version, if any
    pub latest_version: Option<i64>,
}

/// Applies every pending migration
///
/// # Errors
///
/// Returns an error if a migration fails; sqlx rolls that migration back
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("../migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}

/// Reports which migrations have been applied
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_name = '_sqlx_migrations'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    Ok(MigrationStatus {
        applied_migrations: count as usize,
        latest_version,
    })
}

/// Returns the subset of [`SCHEMA_TABLES`] missing from the database
pub async fn missing_tables(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    let present: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT table_name::TEXT
        FROM information_schema.tables
        WHERE table_schema = current_schema()
        AND table_name::TEXT = ANY($1)
        "#,
    )
    .bind(&SCHEMA_TABLES[..])
    .fetch_all(pool)
    .await?;

    Ok(SCHEMA_TABLES
        .iter()
        .filter(|table| !present.iter().any(|p| p.as_str() == **table))
        .map(|table| table.to_string())
        .collect())
}

/// Creates the database named in `database_url` if it doesn't exist
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
    } else {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    }

    Ok(())
}

/// Drops the database named in `database_url`
///
/// For tests and local development only: every row is lost.
pub async fn drop_database(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        warn!("Dropping database");
        Postgres::drop_database(database_url).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_tables() {
        assert!(SCHEMA_TABLES.contains(&"user_segments"));
        assert_eq!(SCHEMA_TABLES.len(), 3);
    }

    #[test]
    fn test_embedded_migrations_present() {
        let migrator = sqlx::migrate!("../migrations");
        assert!(migrator.iter().count() > 0);
    }
}
