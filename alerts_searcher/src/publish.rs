//! Forwarding of alert documents to a message queue topic.

use async_trait::async_trait;
use kafka::producer::{Producer, Record};
use tracing::debug;

use crate::config::KafkaConfig;
use crate::error::Result;

#[async_trait]
pub trait AlertSink: Send {
    /// Publishes one payload to `topic` with an empty key.
    async fn publish(&mut self, topic: &str, payload: &str) -> Result<()>;
}

/// Kafka producer held for the duration of one run.
///
/// The `kafka` client is blocking, so calls run under
/// [`tokio::task::block_in_place`], which needs the multi-threaded runtime.
pub struct KafkaSink {
    producer: Producer,
}

impl KafkaSink {
    pub async fn connect(config: &KafkaConfig) -> Result<Self> {
        let broker = config.broker();
        debug!(%broker, acks = ?config.required_acks, "opening kafka producer");

        let producer = tokio::task::block_in_place(|| {
            Producer::from_hosts(vec![broker])
                .with_ack_timeout(config.ack_timeout)
                .with_required_acks(config.required_acks.as_required_acks())
                .create()
        })?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl AlertSink for KafkaSink {
    async fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        let record = Record::from_key_value(topic, "", payload);
        tokio::task::block_in_place(|| self.producer.send(&record))?;
        Ok(())
    }
}
