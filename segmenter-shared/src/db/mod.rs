/// Database layer for Segmenter
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Schema bootstrap from the embedded sqlx migrations
///
/// Entity queries are in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
