/// Percentage-based segment distribution
///
/// Distributing a segment to `percent`% of the population picks a uniformly
/// random subset of all users and adds each of them to the segment. Existing
/// members stay members; distribution never removes anything.
///
/// # Target Size
///
/// For a population of `N` users:
///
/// ```text
/// k = min(N, max(1, floor(N * percent / 100)))     (N > 0)
/// k = 0                                            (N = 0)
/// ```
///
/// so any positive percent reaches at least one user, and the sample never
/// exceeds the population.
///
/// # Atomicity
///
/// Reading the population, sampling and writing the memberships happen in one
/// transaction with the segment row locked `FOR UPDATE` before anything else
/// is read. Runs on the same segment queue behind that lock, and each
/// statement after it sees the data committed before the lock was granted.
/// The segment cannot be renamed or deleted mid-distribution, and concurrent
/// readers see either all of the new memberships or none of them.
///
/// # Randomness
///
/// The random source is passed in by the caller. Production code seeds a
/// fresh `StdRng` per call; tests pass `StdRng::seed_from_u64` and assert the
/// exact selection.
///
/// # Example
///
/// ```no_run
/// use rand::{rngs::StdRng, SeedableRng};
/// use segmenter_shared::distribution::distribute;
/// use segmenter_shared::store::MembershipStore;
///
/// # async fn example(store: MembershipStore) -> Result<(), Box<dyn std::error::Error>> {
/// let mut rng = StdRng::from_entropy();
/// let report = distribute(&store, "MAIL_GPT", 30.0, &mut rng).await?;
/// println!("Segment distributed to {} users", report.processed);
/// # Ok(())
/// # }
/// ```

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::membership::Membership;
use crate::models::segment::Segment;
use crate::models::user::User;
use crate::models::RowLock;
use crate::store::MembershipStore;

/// Outcome of a distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    /// Segment that was distributed
    pub segment: String,

    /// Requested percentage
    pub percent: f64,

    /// Number of users in the population when the snapshot was taken
    pub population: usize,

    /// Number of users selected and processed (the target size `k`)
    pub processed: usize,

    /// Number of memberships that did not exist before
    ///
    /// Smaller than `processed` when some selected users were already members.
    pub newly_added: usize,
}

/// Checks that `percent` lies in (0, 100]
///
/// NaN is rejected.
pub fn validate_percent(percent: f64) -> StoreResult<()> {
    if percent > 0.0 && percent <= 100.0 {
        Ok(())
    } else {
        Err(StoreError::InvalidPercent(percent))
    }
}

/// Number of users to select from a population of `population`
///
/// `percent` must already be validated.
pub fn target_count(population: usize, percent: f64) -> usize {
    if population == 0 {
        return 0;
    }

    let share = (population as f64 * percent / 100.0).floor() as usize;
    share.max(1).min(population)
}

/// Picks `target_count(population.len(), percent)` distinct users
///
/// Every subset of that size is equally likely.
pub fn sample_users<R>(population: &[i64], percent: f64, rng: &mut R) -> Vec<i64>
where
    R: Rng + ?Sized,
{
    let k = target_count(population.len(), percent);
    population.choose_multiple(rng, k).copied().collect()
}

/// Distributes a segment to `percent`% of all users
///
/// # Errors
///
/// - `InvalidPercent` if `percent` is outside (0, 100]; checked before any
///   database access
/// - `SegmentNotFound` if the segment doesn't exist
/// - `Database` if the transaction fails, in which case nothing is applied
pub async fn distribute<R>(
    store: &MembershipStore,
    segment_name: &str,
    percent: f64,
    rng: &mut R,
) -> StoreResult<DistributionReport>
where
    R: Rng + ?Sized,
{
    validate_percent(percent)?;

    let mut tx = store.pool().begin().await?;

    // Read committed: statements after the lock must see writes that
    // committed while it was held elsewhere
    let segment = Segment::find_by_name(&mut *tx, segment_name, Some(RowLock::Update))
        .await?
        .ok_or_else(|| StoreError::SegmentNotFound(segment_name.to_string()))?;

    let population = User::list_ids(&mut *tx).await?;
    let selected = sample_users(&population, percent, rng);

    debug!(
        segment = %segment_name,
        population = population.len(),
        selected = selected.len(),
        "Sampled users for distribution"
    );

    let newly_added = Membership::add_many(&mut *tx, &selected, segment.id).await? as usize;
    tx.commit().await?;

    info!(
        segment = %segment_name,
        percent,
        population = population.len(),
        processed = selected.len(),
        newly_added,
        "Segment distributed"
    );

    Ok(DistributionReport {
        segment: segment.name,
        percent,
        population: population.len(),
        processed: selected.len(),
        newly_added,
    })
}
