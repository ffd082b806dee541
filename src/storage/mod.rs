//! Object store publisher module
//!
//! Uploads the local Parquet files to object storage and cleans up after.
//!
//! # Overview
//!
//! - [`CloudDestination`] wraps an `object_store` backend parsed from a URL
//! - [`ObjectStorePublisher::publish`] uploads a file under its relative path
//! - [`remove_local`] deletes the local file and its emptied directory

mod cleanup;
mod destination;
mod publisher;

pub use cleanup::remove_local;
pub use destination::CloudDestination;
pub use publisher::{object_key_for, ObjectStorePublisher, RemoteObject};
