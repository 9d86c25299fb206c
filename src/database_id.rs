//! Defines the integer type used for database row IDs.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseID = i64;
