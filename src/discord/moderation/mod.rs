// Discord adapters for the moderation core.

pub mod message_handler;
pub mod replies;
pub mod transport;

pub use message_handler::{handle_message, invalidate_admins};
