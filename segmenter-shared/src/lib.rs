//! # Segmenter Shared Library
//!
//! Membership and distribution engine for audience segments: named groups of
//! users, explicit membership changes, and random percentage-based
//! distribution of a segment across the user population.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and schema migrations
//! - `models`: User, segment and membership rows and their queries
//! - `store`: Transactional membership store
//! - `distribution`: Percentage-based random distribution
//! - `error`: Store error taxonomy

pub mod db;
pub mod distribution;
pub mod error;
pub mod models;
pub mod store;

pub use distribution::{distribute, DistributionReport};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use store::MembershipStore;

/// Current version of the Segmenter shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
