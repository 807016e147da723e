/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: User creation, listing and membership changes
/// - `segments`: Segment lifecycle and distribution

pub mod health;
pub mod segments;
pub mod users;
