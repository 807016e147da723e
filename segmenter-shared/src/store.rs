/// Membership store
///
/// `MembershipStore` owns the user, segment and membership tables and exposes
/// the primitive operations on them. Each operation runs in its own database
/// transaction: existence checks and the mutation they guard commit together,
/// and any error drops the transaction, which rolls it back.
///
/// # Idempotency
///
/// - Creating a user or segment that already exists returns the existing
///   record with `created == false`
/// - Adding an existing membership or removing a missing one is a no-op
///
/// # Example
///
/// ```no_run
/// use segmenter_shared::store::MembershipStore;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = MembershipStore::new(pool);
///
/// store.create_user(15230).await?;
/// store.create_segment("MAIL_GPT").await?;
/// store.add_membership(15230, "MAIL_GPT").await?;
///
/// let segments = store.segments_of(15230).await?;
/// assert_eq!(segments, vec!["MAIL_GPT".to_string()]);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::models::membership::Membership;
use crate::models::segment::{Segment, SegmentWithUsers};
use crate::models::user::{User, UserWithSegments};
use crate::models::{Created, RowLock};

/// Transactional access to users, segments and their memberships
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct MembershipStore {
    pool: PgPool,
}

impl MembershipStore {
    /// Creates a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates a user if absent
    pub async fn create_user(&self, id: i64) -> StoreResult<Created<User>> {
        let mut tx = self.pool.begin().await?;
        let inserted = User::insert_if_absent(&mut *tx, id).await?;
        tx.commit().await?;

        if inserted {
            info!(user_id = id, "User created");
            Ok(Created::new(User { id }))
        } else {
            debug!(user_id = id, "User already exists");
            Ok(Created::existing(User { id }))
        }
    }

    /// Deletes a user together with all of its memberships
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the user doesn't exist
    pub async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        if !User::delete(&mut *tx, id).await? {
            return Err(StoreError::UserNotFound(id));
        }

        tx.commit().await?;
        info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Creates a segment if absent
    ///
    /// Under a concurrent create of the same name, exactly one caller sees
    /// `created == true`; the others get the winner's segment.
    pub async fn create_segment(&self, name: &str) -> StoreResult<Created<Segment>> {
        let mut tx = self.pool.begin().await?;

        if let Some(segment) = Segment::insert_if_absent(&mut *tx, name).await? {
            tx.commit().await?;
            info!(segment_id = segment.id, segment = %segment.name, "Segment created");
            return Ok(Created::new(segment));
        }

        let segment = Segment::find_by_name(&mut *tx, name, None)
            .await?
            .ok_or_else(|| StoreError::SegmentNotFound(name.to_string()))?;
        tx.commit().await?;

        debug!(segment_id = segment.id, segment = %segment.name, "Segment already exists");
        Ok(Created::existing(segment))
    }

    /// Renames a segment
    ///
    /// Renaming a segment to its current name succeeds without writing.
    ///
    /// # Errors
    ///
    /// - `SegmentNotFound` if `name` doesn't exist
    /// - `SegmentNameTaken` if `new_name` belongs to another segment
    pub async fn rename_segment(&self, name: &str, new_name: &str) -> StoreResult<Segment> {
        let mut tx = self.pool.begin().await?;

        let segment = Segment::find_by_name(&mut *tx, name, Some(RowLock::Update))
            .await?
            .ok_or_else(|| StoreError::SegmentNotFound(name.to_string()))?;

        if segment.name == new_name {
            debug!(segment = %name, "Rename to current name, nothing to do");
            return Ok(segment);
        }

        if Segment::find_by_name(&mut *tx, new_name, None).await?.is_some() {
            return Err(StoreError::SegmentNameTaken(new_name.to_string()));
        }

        // A concurrent create or rename can still claim the name first; the
        // unique constraint catches that at write time.
        let renamed = match Segment::rename(&mut *tx, segment.id, new_name).await {
            Ok(renamed) => renamed,
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::SegmentNameTaken(new_name.to_string()));
            }
            Err(err) => return Err(err.into()),
        }
        .ok_or_else(|| StoreError::SegmentNotFound(name.to_string()))?;

        tx.commit().await?;
        info!(segment_id = renamed.id, from = %name, to = %new_name, "Segment renamed");
        Ok(renamed)
    }

    /// Deletes a segment together with all of its memberships
    ///
    /// # Errors
    ///
    /// `SegmentNotFound` if the segment doesn't exist
    pub async fn delete_segment(&self, name: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let segment = Segment::find_by_name(&mut *tx, name, Some(RowLock::Update))
            .await?
            .ok_or_else(|| StoreError::SegmentNotFound(name.to_string()))?;

        Segment::delete(&mut *tx, segment.id).await?;
        tx.commit().await?;

        info!(segment_id = segment.id, segment = %name, "Segment deleted");
        Ok(())
    }

    /// Adds a user to a segment
    ///
    /// # Returns
    ///
    /// True if the membership is new, false if the user was already a member
    ///
    /// # Errors
    ///
    /// `UserNotFound` or `SegmentNotFound` if either endpoint doesn't exist
    pub async fn add_membership(&self, user_id: i64, segment_name: &str) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let segment = lock_endpoints(&mut tx, user_id, segment_name).await?;

        let added = Membership::add(&mut *tx, user_id, segment.id).await?;
        tx.commit().await?;

        if added {
            info!(user_id, segment = %segment_name, "User added to segment");
        } else {
            debug!(user_id, segment = %segment_name, "User already in segment");
        }
        Ok(added)
    }

    /// Removes a user from a segment
    ///
    /// # Returns
    ///
    /// True if a membership was removed, false if the user wasn't a member
    ///
    /// # Errors
    ///
    /// `UserNotFound` or `SegmentNotFound` if either endpoint doesn't exist
    pub async fn remove_membership(&self, user_id: i64, segment_name: &str) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let segment = lock_endpoints(&mut tx, user_id, segment_name).await?;

        let removed = Membership::remove(&mut *tx, user_id, segment.id).await?;
        tx.commit().await?;

        if removed {
            info!(user_id, segment = %segment_name, "User removed from segment");
        } else {
            debug!(user_id, segment = %segment_name, "User was not in segment");
        }
        Ok(removed)
    }

    /// Names of the segments a user belongs to
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the user doesn't exist
    pub async fn segments_of(&self, user_id: i64) -> StoreResult<Vec<String>> {
        let mut tx = self.pool.begin().await?;

        if User::find_by_id(&mut *tx, user_id, None).await?.is_none() {
            return Err(StoreError::UserNotFound(user_id));
        }

        let names = Membership::segment_names_for_user(&mut *tx, user_id).await?;
        tx.commit().await?;
        Ok(names)
    }

    /// Ids of the users in a segment
    ///
    /// # Errors
    ///
    /// `SegmentNotFound` if the segment doesn't exist
    pub async fn users_of(&self, segment_name: &str) -> StoreResult<Vec<i64>> {
        let mut tx = self.pool.begin().await?;

        let segment = Segment::find_by_name(&mut *tx, segment_name, None)
            .await?
            .ok_or_else(|| StoreError::SegmentNotFound(segment_name.to_string()))?;

        let ids = Membership::user_ids_for_segment(&mut *tx, segment.id).await?;
        tx.commit().await?;
        Ok(ids)
    }

    /// Snapshot of every user with its segments
    pub async fn all_users(&self) -> StoreResult<Vec<UserWithSegments>> {
        let mut conn = self.pool.acquire().await?;
        Ok(User::list_with_segments(&mut conn).await?)
    }

    /// Snapshot of every segment with its members
    pub async fn all_segments(&self) -> StoreResult<Vec<SegmentWithUsers>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Segment::list_with_users(&mut conn).await?)
    }
}

/// Checks that both ends of a membership exist and share-locks them until the
/// transaction ends, so neither can be deleted or renamed mid-change.
async fn lock_endpoints(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: i64,
    segment_name: &str,
) -> StoreResult<Segment> {
    if User::find_by_id(&mut **tx, user_id, Some(RowLock::Share))
        .await?
        .is_none()
    {
        return Err(StoreError::UserNotFound(user_id));
    }

    Segment::find_by_name(&mut **tx, segment_name, Some(RowLock::Share))
        .await?
        .ok_or_else(|| StoreError::SegmentNotFound(segment_name.to_string()))
}
