//! Pipeline drivers
//!
//! - [`WebToStoreFlow`]: fetch the source, then publish each file as Parquet
//! - [`LoadParentFlow`]: load a list of partitions into the warehouse

mod load_parent;
mod web_to_store;

pub use load_parent::{default_file_keys, default_month_keys, LoadParentFlow, PartitionOutcome};
pub use web_to_store::{FailedFile, PublishedFile, WebToStoreFlow, WebToStoreReport};
