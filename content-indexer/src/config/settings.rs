//! Typed settings read from the environment.
//!
//! Every value has a default so the indexer starts against a local stack with
//! no configuration at all. Numeric values that fail to parse fall back to
//! their default with a warning; settings that would leave the indexer unable
//! to make progress are rejected.

use std::str::FromStr;
use std::time::Duration;

use content_indexer_repository::config::{
    SearchIndexServiceConfig, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_LISTED_IDS,
};
use rdkafka::config::ClientConfig;
use tracing::warn;

use crate::delivery::RetryPolicy;
use crate::IndexingError;

const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;
const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
const DEFAULT_MONGODB_DATABASE: &str = "simonrowe";
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";
const DEFAULT_KAFKA_GROUP_ID: &str = "search-indexer";
const DEFAULT_KAFKA_TOPIC: &str = "content-changes";
const DEFAULT_CONSUMER_WORKERS: usize = 4;
const DEFAULT_SYNC_CRON: &str = "0 0 */4 * * *";

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection every retry interval until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode. Unknown values default to `Retry`.
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            None | Some("retry") => Self::Retry,
            Some("fail-fast") | Some("failfast") | Some("fail_fast") => Self::FailFast,
            Some(other) => {
                warn!(value = %other, "Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenSearchSettings {
    pub url: String,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub index: SearchIndexServiceConfig,
}

#[derive(Debug, Clone)]
pub struct MongoSettings {
    pub uri: String,
    pub database: String,
}

/// Broker coordinates and credentials shared by the consumer and the
/// dead-letter producer.
#[derive(Clone)]
pub struct KafkaSettings {
    pub broker: String,
    pub group_id: String,
    pub topic: String,
    /// SASL username (enables SASL/SSL together with the password)
    pub username: Option<String>,
    pub password: Option<String>,
    /// Custom CA certificate in PEM format
    pub ssl_ca_pem: Option<String>,
}

impl std::fmt::Debug for KafkaSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaSettings")
            .field("broker", &self.broker)
            .field("group_id", &self.group_id)
            .field("topic", &self.topic)
            .field("sasl", &self.sasl_enabled())
            .finish()
    }
}

impl KafkaSettings {
    pub fn sasl_enabled(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Base client configuration for the broker.
    ///
    /// When SASL credentials are set the connection uses SASL/SSL (managed
    /// Kafka), otherwise plaintext (local development).
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.broker);

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanisms", "PLAIN")
                .set("sasl.username", username)
                .set("sasl.password", password);

            if let Some(ca_pem) = &self.ssl_ca_pem {
                config.set("ssl.ca.pem", ca_pem);
            }
        }

        config
    }
}

#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub workers: usize,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Six-field cron expression (with seconds).
    pub cron: String,
    pub on_startup: bool,
}

/// All settings for the indexer.
#[derive(Debug, Clone)]
pub struct Settings {
    pub opensearch: OpenSearchSettings,
    pub mongo: MongoSettings,
    pub kafka: KafkaSettings,
    pub consumer: ConsumerSettings,
    pub sync: SyncSettings,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL` (default: http://localhost:9200)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS` (default: 15)
    /// - `SEARCH_BULK_BATCH_SIZE` (default: 500)
    /// - `SEARCH_MAX_LISTED_IDS` (default: 10000)
    /// - `MONGODB_URI` (default: mongodb://localhost:27017)
    /// - `MONGODB_DATABASE` (default: simonrowe)
    /// - `KAFKA_BROKER` (default: localhost:9092)
    /// - `KAFKA_GROUP_ID` (default: search-indexer)
    /// - `KAFKA_TOPIC` (default: content-changes)
    /// - `KAFKA_USERNAME` / `KAFKA_PASSWORD` / `KAFKA_SSL_CA_PEM` (optional)
    /// - `CONSUMER_WORKERS` (default: 4)
    /// - `RETRY_MAX_ATTEMPTS` (default: 4)
    /// - `RETRY_INITIAL_BACKOFF_MS` (default: 1000)
    /// - `RETRY_MULTIPLIER` (default: 2)
    /// - `SEARCH_SYNC_CRON` (default: `0 0 */4 * * *`)
    /// - `SEARCH_SYNC_ON_STARTUP` (default: true)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the raw value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let opensearch = OpenSearchSettings {
            url: string("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            connection_mode: ConnectionMode::parse(lookup("OPENSEARCH_CONNECTION_MODE").as_deref()),
            retry_interval: Duration::from_secs(parse_or_default(
                &lookup,
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
            index: SearchIndexServiceConfig::with_max_batch_size(parse_or_default(
                &lookup,
                "SEARCH_BULK_BATCH_SIZE",
                DEFAULT_MAX_BATCH_SIZE,
            ))
            .max_listed_ids(parse_or_default(
                &lookup,
                "SEARCH_MAX_LISTED_IDS",
                DEFAULT_MAX_LISTED_IDS,
            )),
        };

        let mongo = MongoSettings {
            uri: string("MONGODB_URI", DEFAULT_MONGODB_URI),
            database: string("MONGODB_DATABASE", DEFAULT_MONGODB_DATABASE),
        };

        let kafka = KafkaSettings {
            broker: string("KAFKA_BROKER", DEFAULT_KAFKA_BROKER),
            group_id: string("KAFKA_GROUP_ID", DEFAULT_KAFKA_GROUP_ID),
            topic: string("KAFKA_TOPIC", DEFAULT_KAFKA_TOPIC),
            username: lookup("KAFKA_USERNAME"),
            password: lookup("KAFKA_PASSWORD"),
            ssl_ca_pem: lookup("KAFKA_SSL_CA_PEM"),
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or_default(&lookup, "RETRY_MAX_ATTEMPTS", defaults.max_attempts),
            initial_backoff: Duration::from_millis(parse_or_default(
                &lookup,
                "RETRY_INITIAL_BACKOFF_MS",
                defaults.initial_backoff.as_millis() as u64,
            )),
            multiplier: parse_or_default(&lookup, "RETRY_MULTIPLIER", defaults.multiplier),
        };

        let consumer = ConsumerSettings {
            workers: parse_or_default(&lookup, "CONSUMER_WORKERS", DEFAULT_CONSUMER_WORKERS),
            retry,
        };

        let sync = SyncSettings {
            cron: string("SEARCH_SYNC_CRON", DEFAULT_SYNC_CRON),
            on_startup: parse_or_default(&lookup, "SEARCH_SYNC_ON_STARTUP", true),
        };

        let settings = Self {
            opensearch,
            mongo,
            kafka,
            consumer,
            sync,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the indexer cannot run with. The cron expression is
    /// checked when the scheduler is built.
    fn validate(&self) -> Result<(), IndexingError> {
        if self.consumer.workers == 0 {
            return Err(IndexingError::config("CONSUMER_WORKERS must be at least 1"));
        }
        if self.consumer.retry.max_attempts == 0 {
            return Err(IndexingError::config("RETRY_MAX_ATTEMPTS must be at least 1"));
        }
        if self.consumer.retry.multiplier < 1 {
            return Err(IndexingError::config("RETRY_MULTIPLIER must be at least 1"));
        }
        if self.kafka.username.is_some() != self.kafka.password.is_some() {
            warn!("Only one of KAFKA_USERNAME and KAFKA_PASSWORD is set, using plaintext");
        }
        Ok(())
    }
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key = %key, value = %raw, default = ?default, "Unparseable setting, using default");
                default
            }
        },
    }
}
