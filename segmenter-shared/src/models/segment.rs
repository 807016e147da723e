/// Segment model and database operations
///
/// A segment is a named group of users. The id is assigned by the database;
/// the name is unique and can be changed with [`Segment::rename`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE segments (
///     id BIGSERIAL PRIMARY KEY,
///     name TEXT NOT NULL UNIQUE
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use segmenter_shared::models::{segment::Segment, RowLock};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let mut tx = pool.begin().await?;
///
/// if let Some(segment) = Segment::find_by_name(&mut *tx, "MAIL_GPT", Some(RowLock::Update)).await? {
///     Segment::rename(&mut *tx, segment.id, "MAIL_GPT_V2").await?;
/// }
///
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use super::RowLock;

/// Segment model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Segment {
    /// Database-assigned id
    pub id: i64,

    /// Unique segment name
    pub name: String,
}

/// A segment together with the ids of its members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SegmentWithUsers {
    /// Segment id
    pub id: i64,

    /// Segment name
    pub name: String,

    /// Member user ids, ascending
    pub users: Vec<i64>,
}

impl Segment {
    /// Inserts a segment unless one with the same name already exists
    ///
    /// # Returns
    ///
    /// The new segment, or None if the name is already taken
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let segment = sqlx::query_as::<_, Segment>(
            r#"
            INSERT INTO segments (name)
            VALUES ($1)
            ON CONFLICT (name) DO NOTHING
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_optional(conn)
        .await?;

        Ok(segment)
    }

    /// Finds a segment by name, optionally locking the row
    ///
    /// Use `RowLock::Update` before renaming or deleting the segment and
    /// `RowLock::Share` before adding or removing members.
    pub async fn find_by_name(
        conn: &mut PgConnection,
        name: &str,
        lock: Option<RowLock>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = match lock {
            Some(lock) => format!("SELECT id, name FROM segments WHERE name = $1 {}", lock.as_sql()),
            None => "SELECT id, name FROM segments WHERE name = $1".to_string(),
        };

        let segment = sqlx::query_as::<_, Segment>(&query)
            .bind(name)
            .fetch_optional(conn)
            .await?;

        Ok(segment)
    }

    /// Renames a segment
    ///
    /// # Errors
    ///
    /// Returns a unique violation if `new_name` belongs to another segment
    pub async fn rename(
        conn: &mut PgConnection,
        id: i64,
        new_name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let segment = sqlx::query_as::<_, Segment>(
            r#"
            UPDATE segments
            SET name = $2
            WHERE id = $1
            RETURNING id, name
            "#,
        )
        .bind(id)
        .bind(new_name)
        .fetch_optional(conn)
        .await?;

        Ok(segment)
    }

    /// Deletes a segment and, via `ON DELETE CASCADE`, all of its memberships
    ///
    /// # Returns
    ///
    /// True if the segment was deleted, false if it didn't exist
    pub async fn delete(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM segments WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists every segment with its member ids
    pub async fn list_with_users(
        conn: &mut PgConnection,
    ) -> Result<Vec<SegmentWithUsers>, sqlx::Error> {
        let segments = sqlx::query_as::<_, SegmentWithUsers>(
            r#"
            SELECT s.id,
                   s.name,
                   COALESCE(
                       array_agg(us.user_id ORDER BY us.user_id) FILTER (WHERE us.user_id IS NOT NULL),
                       ARRAY[]::BIGINT[]
                   ) AS users
            FROM segments s
            LEFT JOIN user_segments us ON us.segment_id = s.id
            GROUP BY s.id, s.name
            ORDER BY s.id ASC
            "#,
        )
        .fetch_all(conn)
        .await?;

        Ok(segments)
    }
}
