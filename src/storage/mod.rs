//! Durable local state: the resume key-value store and the continue-watching snapshot

pub mod continue_watching;
pub mod kv;

pub use continue_watching::{
    ContinueWatchingEntry, ContinueWatchingSnapshot, ContinueWatchingStore, DeepLink, DeepLinkError,
};
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore, StoreError, StoredValue};
