/// Adapters - concrete implementations of the port traits
///
/// `services` talks to the remote speech, language and model APIs;
/// `storage` persists analyzed conversations.
pub mod services;
pub mod storage;
