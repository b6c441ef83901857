// Implementations of the moderation storage port.

// Backs the core service tests; production always runs on SQLite.
#[cfg(test)]
pub mod in_memory;
pub mod sqlite_store;

#[cfg(test)]
pub use in_memory::InMemoryModerationStore;
pub use sqlite_store::SqliteModerationStore;
