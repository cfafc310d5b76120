//! Concrete implementations of the engine's ports

pub mod file_store;
pub mod memory_store;
pub mod notifier;
pub mod simulated;

#[cfg(test)]
pub mod tests;

pub use file_store::JsonFileStore;
pub use memory_store::{InMemoryStore, StoreState};
pub use notifier::{LoggingNotificationSink, WebhookNotificationSink};
pub use simulated::{simulate_engagement, SimulatedOracle, SimulatedSender, SimulatedSource};
