//! Transform module
//!
//! Reshapes raw records into star-schema relations.
//!
//! # Overview
//!
//! - `catalog` - Song and artist dimensions from song-metadata records
//! - `activity` - Time, user and songplay relations from activity logs
//! - `time` - Calendar field derivation from epoch milliseconds
//!
//! Every function here is pure: the same input always yields the same
//! rows, so a partition or file can be re-transformed safely.

pub mod activity;
pub mod catalog;
pub mod time;

pub use activity::{Activity, ActivityOptions};
pub use catalog::{Catalog, CatalogIndex, CatalogMatch};
