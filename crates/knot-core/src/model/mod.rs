//! Value types supplied by the persistence layer.
//!
//! The analysis engine treats every value here as immutable for the duration
//! of one call. Enums are closed: text is validated once, at the parse or
//! deserialize boundary, and the engine never re-checks it.

pub mod connection;
pub mod item;
