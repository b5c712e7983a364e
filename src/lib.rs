//! Client-side model of a cloud dataset: its access list, its lifecycle
//! against the service, and paged listing of its tables.
//!
//! Requests go through a [`Connection`](client::Connection) supplied by the
//! caller; [`MemoryConnection`](services::memory::MemoryConnection) answers
//! them in-process.

pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod telemetry;

pub use client::{ApiRequest, Client, Connection, Method};
pub use config::{ClientArgs, ClientConfig};
pub use errors::{ApiError, DatasetError, DatasetResult};
pub use models::{
    access_entry::{AccessEntry, EntityType},
    dataset::Dataset,
    patch::DatasetPatch,
    reference::{DatasetReference, TableReference},
    table::{SchemaField, Table},
};
pub use services::{
    memory::MemoryConnection,
    pagination::{Page, TableIterator},
};
