//! Configuration and dependency initialization.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::{
    ConnectionMode, ConsumerSettings, KafkaSettings, MongoSettings, OpenSearchSettings, Settings,
    SyncSettings,
};
