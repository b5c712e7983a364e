//! Value types for datasets, their access entries and their tables.
//!
//! `Dataset` converts to and from the service's JSON resource; the other
//! types are plain values it hands out.

pub mod access_entry;
pub mod dataset;
pub mod patch;
pub mod reference;
pub mod table;
