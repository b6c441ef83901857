// Discord commands module.
// Slash commands live here; prefixed text commands are routed from the
// message handler to the same core service.

pub mod moderation;
