pub mod blob_store;
pub mod conversation_store;
pub mod delivery;
pub mod message_store;
