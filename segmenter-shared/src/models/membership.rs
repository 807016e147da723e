/// Membership model and database operations
///
/// A membership is an edge between one user and one segment. Edges have set
/// semantics: the composite primary key rejects duplicates and every insert
/// goes through `ON CONFLICT DO NOTHING`, so adding an existing edge is a
/// no-op rather than an error.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_segments (
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     segment_id BIGINT NOT NULL REFERENCES segments(id) ON DELETE CASCADE,
///     PRIMARY KEY (user_id, segment_id)
/// );
/// ```
///
/// Both foreign keys cascade, so deleting either endpoint removes its edges in
/// the same statement and no orphans can be observed.
///
/// # Example
///
/// ```no_run
/// use segmenter_shared::models::membership::Membership;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, segment_id: i64) -> Result<(), sqlx::Error> {
/// let mut conn = pool.acquire().await?;
///
/// let added = Membership::add(&mut conn, 15230, segment_id).await?;
/// let members = Membership::user_ids_for_segment(&mut conn, segment_id).await?;
/// println!("added: {}, members: {:?}", added, members);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

/// Membership edge between a user and a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// User ID
    pub user_id: i64,

    /// Segment ID
    pub segment_id: i64,
}

impl Membership {
    /// Adds a user to a segment
    ///
    /// # Returns
    ///
    /// True if a new edge was inserted, false if the user was already a member
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if either endpoint doesn't exist
    pub async fn add(
        conn: &mut PgConnection,
        user_id: i64,
        segment_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_segments (user_id, segment_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, segment_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(segment_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adds many users to one segment in a single statement
    ///
    /// Users that are already members are skipped.
    ///
    /// # Returns
    ///
    /// Number of edges actually inserted
    pub async fn add_many(
        conn: &mut PgConnection,
        user_ids: &[i64],
        segment_id: i64,
    ) -> Result<u64, sqlx::Error> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO user_segments (user_id, segment_id)
            SELECT user_id, $2 FROM UNNEST($1::BIGINT[]) AS t(user_id)
            ON CONFLICT (user_id, segment_id) DO NOTHING
            "#,
        )
        .bind(user_ids)
        .bind(segment_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes a user from a segment
    ///
    /// # Returns
    ///
    /// True if an edge was removed, false if the user wasn't a member
    pub async fn remove(
        conn: &mut PgConnection,
        user_id: i64,
        segment_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_segments WHERE user_id = $1 AND segment_id = $2")
            .bind(user_id)
            .bind(segment_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the names of the segments a user belongs to, sorted
    pub async fn segment_names_for_user(
        conn: &mut PgConnection,
        user_id: i64,
    ) -> Result<Vec<String>, sqlx::Error> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT s.name
            FROM user_segments us
            JOIN segments s ON s.id = us.segment_id
            WHERE us.user_id = $1
            ORDER BY s.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(names)
    }

    /// Lists the ids of a segment's members, ascending
    pub async fn user_ids_for_segment(
        conn: &mut PgConnection,
        segment_id: i64,
    ) -> Result<Vec<i64>, sqlx::Error> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM user_segments WHERE segment_id = $1 ORDER BY user_id ASC",
        )
        .bind(segment_id)
        .fetch_all(conn)
        .await?;

        Ok(ids)
    }
}
