/// Database models for Segmenter
///
/// This module contains the entity models and their row-level queries.
/// Every query takes a `&mut PgConnection` so callers can run several of them
/// inside one transaction (see [`crate::store::MembershipStore`]).
///
/// # Models
///
/// - `user`: Users, identified by an externally supplied integer id
/// - `segment`: Named groups of users
/// - `membership`: The user-segment association (many-to-many edge)
///
/// # Example
///
/// ```no_run
/// use segmenter_shared::models::{segment::Segment, user::User};
/// use segmenter_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let mut tx = pool.begin().await?;
///
/// User::insert_if_absent(&mut *tx, 15230).await?;
/// let segment = Segment::insert_if_absent(&mut *tx, "MAIL_GPT").await?;
///
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};

pub mod membership;
pub mod segment;
pub mod user;

/// Result of an idempotent create
///
/// Creating a record that already exists is not an error: the existing record
/// is returned with `created` set to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created<T> {
    /// The new or pre-existing record
    pub record: T,

    /// Whether this call inserted the record
    pub created: bool,
}

impl<T> Created<T> {
    /// Wraps a freshly inserted record
    pub fn new(record: T) -> Self {
        Self {
            record,
            created: true,
        }
    }

    /// Wraps a record that was already present
    pub fn existing(record: T) -> Self {
        Self {
            record,
            created: false,
        }
    }
}

/// Row lock taken when reading a record that is about to be mutated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    /// `FOR SHARE`: blocks concurrent updates and deletes of the row
    Share,

    /// `FOR UPDATE`: exclusive, for rows this transaction will modify
    Update,
}

impl RowLock {
    /// SQL locking clause
    pub fn as_sql(&self) -> &'static str {
        match self {
            RowLock::Share => "FOR SHARE",
            RowLock::Update => "FOR UPDATE",
        }
    }
}
