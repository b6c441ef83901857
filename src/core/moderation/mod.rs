// Core moderation module - offensive-content detection and enforcement.
// Following the same layering as the rest of core: services own the logic,
// storage and chat access come in through traits.

pub mod admin_service;
pub mod authorization_gate;
pub mod bad_word_registry;
pub mod enforcement_engine;
pub mod group_policy_store;
pub mod message_classifier;
pub mod moderation_models;
pub mod moderation_store;
pub mod user_directory;

#[cfg(test)]
pub mod test_support;

pub use admin_service::*;
pub use authorization_gate::*;
pub use bad_word_registry::*;
pub use enforcement_engine::*;
pub use group_policy_store::*;
pub use message_classifier::*;
pub use moderation_models::*;
pub use moderation_store::*;
pub use user_directory::*;
