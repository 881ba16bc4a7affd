// Project Rookery - Dead Letter Queue for Market Data Delivery
// "Messages that failed to fly roost here until they are ready again"

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod message;
pub mod store;
pub mod time;

// Re-export commonly used types
pub use config::DlqConfig;
pub use error::{RookeryError, RookeryResult};
pub use logging::LoggingConfig;
pub use manager::{DlqManager, DlqStats, RedeliveryHandler, ReplayReport};
pub use message::DlqMessage;
pub use store::{FileMessageStore, MessageStore};
