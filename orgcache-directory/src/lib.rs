//! orgcache directory - upstream seam
//!
//! The directory is consulted only on cache misses. This crate defines the
//! client trait the cache depends on, a typed search filter, the raw
//! attribute model and the normalizer that turns raw entries into
//! [`orgcache_core::PersonRecord`]s.

mod client;
mod filter;
mod memory;
mod normalize;
mod raw;

pub use client::{BlockingDirectory, DirectoryClient, SyncDirectoryClient};
pub use filter::{escape_value, SearchFilter};
pub use memory::InMemoryDirectory;
pub use normalize::{
    account_enabled, filetime_to_timestamp, last_logon, people_from_entries, person_from_entry,
    scalar, ACCOUNTDISABLE,
};
pub use raw::{attrs, RawEntry, RawValue};
