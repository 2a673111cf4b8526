//! # Infrastructure Adapters
//!
//! Shipped implementations of the platform collaborator traits.

pub mod asana_client_factory;
pub mod filesystem_store;
pub mod logging_event_handler;
pub mod logging_notification_sender;
pub mod memory_store;
pub mod stored_token_provider;

pub use asana_client_factory::AsanaClientFactory;
pub use filesystem_store::FilesystemUserStore;
pub use logging_event_handler::LoggingEventHandler;
pub use logging_notification_sender::LoggingNotificationSender;
pub use memory_store::InMemoryUserStore;
pub use stored_token_provider::StoredTokenProvider;
