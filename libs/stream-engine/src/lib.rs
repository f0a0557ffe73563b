pub mod activity;
pub mod broker;
pub mod error;
pub mod flush;
pub mod hub;
pub mod log;

pub use activity::ActivityTracker;
pub use broker::StreamBroker;
pub use error::BrokerError;
pub use flush::{FlushConfig, spawn_flush_scheduler};
pub use hub::{Broadcaster, Subscription};
pub use log::TopicLog;
