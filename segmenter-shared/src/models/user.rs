/// User model and database operations
///
/// Users carry nothing but their identifier, which is supplied by the caller
/// (an id from some upstream account system) rather than generated here.
/// Segment membership lives in the `user_segments` table, see
/// [`super::membership`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGINT PRIMARY KEY
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use segmenter_shared::models::user::User;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let mut conn = pool.acquire().await?;
///
/// let inserted = User::insert_if_absent(&mut conn, 15230).await?;
/// let users = User::list_with_segments(&mut conn).await?;
/// println!("inserted: {}, total users: {}", inserted, users.len());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use super::RowLock;

/// User model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Externally supplied user id, immutable once created
    pub id: i64,
}

/// A user together with the names of the segments it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserWithSegments {
    /// User id
    pub id: i64,

    /// Segment names, sorted
    pub segments: Vec<String>,
}

impl User {
    /// Inserts a user unless one with the same id already exists
    ///
    /// # Returns
    ///
    /// True if the user was inserted, false if it already existed
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn insert_if_absent(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Finds a user by id
    ///
    /// With `lock` set, the row stays locked until the surrounding transaction
    /// ends, so the user cannot be deleted underneath a membership change.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: i64,
        lock: Option<RowLock>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = match lock {
            Some(lock) => format!("SELECT id FROM users WHERE id = $1 {}", lock.as_sql()),
            None => "SELECT id FROM users WHERE id = $1".to_string(),
        };

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(user)
    }

    /// Deletes a user
    ///
    /// Membership edges are removed by the `ON DELETE CASCADE` foreign key in
    /// the same statement.
    ///
    /// # Returns
    ///
    /// True if the user was deleted, false if it didn't exist
    pub async fn delete(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists every user id, ascending
    ///
    /// This is the population a distribution samples from.
    pub async fn list_ids(conn: &mut PgConnection) -> Result<Vec<i64>, sqlx::Error> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM users ORDER BY id ASC")
            .fetch_all(conn)
            .await?;

        Ok(ids)
    }

    /// Lists every user with its segment names
    pub async fn list_with_segments(
        conn: &mut PgConnection,
    ) -> Result<Vec<UserWithSegments>, sqlx::Error> {
        let users = sqlx::query_as::<_, UserWithSegments>(
            r#"
            SELECT u.id,
                   COALESCE(
                       array_agg(s.name ORDER BY s.name) FILTER (WHERE s.name IS NOT NULL),
                       ARRAY[]::TEXT[]
                   ) AS segments
            FROM users u
            LEFT JOIN user_segments us ON us.user_id = u.id
            LEFT JOIN segments s ON s.id = us.segment_id
            GROUP BY u.id
            ORDER BY u.id ASC
            "#,
        )
        .fetch_all(conn)
        .await?;

        Ok(users)
    }
}
